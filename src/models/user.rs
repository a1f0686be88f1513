use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: Option<String>,
    pub mobile: Option<String>,
}

// The struct used for receiving user data for creating a user record as json
#[derive(Deserialize, Serialize, Debug)]
pub struct NewUser {
    pub name: Option<String>,
    pub mobile: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CreatedUser {
    pub id: UserId,
}
