use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::game::GameId;

/// One async mutex per game id.
///
/// Every fetch, validate, mutate and persist sequence on a game runs while holding its guard.
#[derive(Default)]
pub struct GameLocks {
    locks: DashMap<GameId, Arc<Mutex<()>>>,
}

impl GameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, id: GameId) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(id).or_default().clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_game_waits_other_games_do_not() {
        let locks = GameLocks::new();
        let guard = locks.lock(GameId(1)).await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock(GameId(2))).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock(GameId(1))).await;
        assert!(same.is_err());

        drop(guard);
        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock(GameId(1))).await;
        assert!(same.is_ok());
    }
}
