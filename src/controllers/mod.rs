pub mod game;
pub mod server;
pub mod socket;
pub mod user;
