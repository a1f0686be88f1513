pub mod board;
pub mod event;
pub mod game;
pub mod grid;
pub mod user;
