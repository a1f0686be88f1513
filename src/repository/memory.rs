use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::CustomError;
use crate::models::event::GameEvent;
use crate::models::game::{Game, GameId};
use crate::models::user::{NewUser, User, UserId};
use crate::repository::Repository;

#[derive(Default)]
struct Store {
    last_id: u64,
    games: HashMap<GameId, Game>,
    events: Vec<GameEvent>,
    users: HashMap<UserId, User>,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

// Process local repository, used by the tests and when no database is configured
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert_game(&self, game: &Game) -> Result<GameId, CustomError> {
        let mut store = self.store.write().await;
        let id = GameId(store.next_id());
        let mut game = game.clone();
        game.id = id;
        store.games.insert(id, game);
        Ok(id)
    }

    async fn get_game(&self, id: GameId) -> Result<Game, CustomError> {
        self.store
            .read()
            .await
            .games
            .get(&id)
            .cloned()
            .ok_or_else(|| CustomError::NotFound("game".to_string()))
    }

    async fn update_game(&self, game: &Game) -> Result<(), CustomError> {
        let mut store = self.store.write().await;
        match store.games.get_mut(&game.id) {
            Some(stored) => {
                *stored = game.clone();
                Ok(())
            }
            None => Err(CustomError::NotFound("game".to_string())),
        }
    }

    async fn insert_event(&self, event: &GameEvent) -> Result<u64, CustomError> {
        let mut store = self.store.write().await;
        let id = store.next_id();
        let mut event = event.clone();
        event.id = id;
        store.events.push(event);
        Ok(id)
    }

    async fn list_events(
        &self,
        game_id: GameId,
        event_type: Option<&str>,
    ) -> Result<Vec<GameEvent>, CustomError> {
        let store = self.store.read().await;
        let mut events: Vec<GameEvent> = store
            .events
            .iter()
            .filter(|event| event.game_id == game_id)
            .filter(|event| event_type.map_or(true, |t| event.kind.event_type() == t))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.time.cmp(&a.time).then(b.id.cmp(&a.id)));
        Ok(events)
    }

    async fn get_user(&self, id: UserId) -> Result<User, CustomError> {
        self.store
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| CustomError::NotFound("user".to_string()))
    }

    async fn insert_user(&self, user: &NewUser) -> Result<UserId, CustomError> {
        let mut store = self.store.write().await;
        let id = UserId(store.next_id());
        store.users.insert(
            id,
            User {
                id,
                name: user.name.clone(),
                mobile: user.mobile.clone(),
            },
        );
        Ok(id)
    }
}
