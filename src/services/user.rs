use std::sync::Arc;

use log::info;

use crate::errors::CustomError;
use crate::models::user::{NewUser, User, UserId};
use crate::repository::Repository;

pub struct UserService {
    repo: Arc<dyn Repository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        UserService { repo }
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<UserId, CustomError> {
        let id = self.repo.insert_user(user).await?;
        info!("created user {}", id);
        Ok(id)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, CustomError> {
        self.repo.get_user(id).await
    }
}
