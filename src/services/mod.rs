pub mod arbiter;
pub mod game;
pub mod locks;
pub mod user;

pub use game::GameService;
pub use user::UserService;
