use async_trait::async_trait;

use crate::errors::CustomError;
use crate::models::event::GameEvent;
use crate::models::game::{Game, GameId};
use crate::models::user::{NewUser, User, UserId};

mod memory;
mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;

/// Storage for games, their event log and users.
///
/// Each call is assumed to be strongly consistent for a single record.
/// Callers serialize read-modify-write sequences per game themselves.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Stores a new game and returns the id it was given.
    async fn insert_game(&self, game: &Game) -> Result<GameId, CustomError>;
    async fn get_game(&self, id: GameId) -> Result<Game, CustomError>;
    async fn update_game(&self, game: &Game) -> Result<(), CustomError>;

    async fn insert_event(&self, event: &GameEvent) -> Result<u64, CustomError>;
    /// Events of a game, newest first, optionally restricted to one event type.
    async fn list_events(
        &self,
        game_id: GameId,
        event_type: Option<&str>,
    ) -> Result<Vec<GameEvent>, CustomError>;

    async fn get_user(&self, id: UserId) -> Result<User, CustomError>;
    async fn insert_user(&self, user: &NewUser) -> Result<UserId, CustomError>;
}
