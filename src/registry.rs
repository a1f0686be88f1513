use dashmap::DashMap;
use log::{debug, info};
use tokio::sync::mpsc;

use crate::errors::CustomError;
use crate::models::game::{Game, GameId, Side};
use crate::models::user::UserId;

// What a socket writer task is told to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Frame(String),
    Close,
}

pub type Tx = mpsc::UnboundedSender<Outbound>;

struct Connection {
    user_id: UserId,
    tx: Tx,
}

#[derive(Default)]
struct RegistryEntry {
    side1: Option<Connection>,
    side2: Option<Connection>,
}

impl RegistryEntry {
    fn slot_mut(&mut self, side: Side) -> &mut Option<Connection> {
        match side {
            Side::One => &mut self.side1,
            Side::Two => &mut self.side2,
        }
    }

    fn find(&self, user: UserId) -> Option<&Connection> {
        [&self.side1, &self.side2]
            .into_iter()
            .flatten()
            .find(|connection| connection.user_id == user)
    }
}

/// Live outbound channels of the two players of every game this process has seen.
///
/// Entries are sharded by game id, so registering for one game never waits on another.
/// They are not torn down when a socket drops; the next connect for the slot replaces them.
#[derive(Default)]
pub struct ConnectionRegistry {
    games: DashMap<GameId, RegistryEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `tx` in the slot `user` plays in. An older channel in that slot is told to close.
    /// Returns true when a previous connection was evicted.
    pub fn register(&self, game: &Game, user: UserId, tx: Tx) -> Result<bool, CustomError> {
        let side = game.participant(user)?;
        let evicted = {
            let mut entry = self.games.entry(game.id).or_default();
            let slot = entry.slot_mut(side);
            // same socket announcing itself again
            if slot.as_ref().map_or(false, |current| current.tx.same_channel(&tx)) {
                debug!("user {} re-sent connect for game {} on the same socket", user, game.id);
                return Ok(false);
            }
            slot.replace(Connection { user_id: user, tx })
        };

        match evicted {
            Some(old) => {
                info!("user {} reconnected to game {}, closing the stale socket", user, game.id);
                let _ = old.tx.send(Outbound::Close);
                Ok(true)
            }
            None => {
                debug!("user {} connected to game {} as side {}", user, game.id, side.number());
                Ok(false)
            }
        }
    }

    /// Sends a frame to one player. Returns false when the player has no open channel.
    pub fn route_to(&self, game_id: GameId, user: UserId, frame: &str) -> bool {
        // clone the sender so the shard lock is released before sending
        let tx = self
            .games
            .get(&game_id)
            .and_then(|entry| entry.find(user).map(|connection| connection.tx.clone()));

        match tx {
            Some(tx) => tx.send(Outbound::Frame(frame.to_string())).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn game() -> Game {
        let mut game = Game::new(ALICE, 10, Side::One, Utc::now()).unwrap();
        game.id = GameId(11);
        game.join(BOB).unwrap();
        game
    }

    #[test]
    fn routes_to_the_right_player() {
        let registry = ConnectionRegistry::new();
        let game = game();
        let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        registry.register(&game, ALICE, alice_tx).unwrap();
        registry.register(&game, BOB, bob_tx).unwrap();

        assert!(registry.route_to(game.id, BOB, "hello bob"));
        assert_eq!(bob_rx.try_recv(), Ok(Outbound::Frame("hello bob".to_string())));
        assert!(alice_rx.try_recv().is_err());
    }

    #[test]
    fn strangers_are_rejected() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(
            registry.register(&game(), UserId(99), tx),
            Err(CustomError::Forbidden(_))
        ));
    }

    #[test]
    fn offline_players_are_skipped() {
        let registry = ConnectionRegistry::new();
        let game = game();
        assert!(!registry.route_to(game.id, BOB, "nobody home"));

        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(&game, BOB, tx).unwrap();
        drop(rx);
        assert!(!registry.route_to(game.id, BOB, "socket gone"));
    }

    #[test]
    fn reconnect_evicts_the_stale_channel() {
        let registry = ConnectionRegistry::new();
        let game = game();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        assert_eq!(registry.register(&game, ALICE, old_tx), Ok(false));
        assert_eq!(registry.register(&game, ALICE, new_tx), Ok(true));
        assert_eq!(old_rx.try_recv(), Ok(Outbound::Close));

        assert!(registry.route_to(game.id, ALICE, "fresh"));
        assert_eq!(new_rx.try_recv(), Ok(Outbound::Frame("fresh".to_string())));
        assert!(old_rx.try_recv().is_err());
    }

    #[test]
    fn repeated_connect_on_one_socket_keeps_it_open() {
        let registry = ConnectionRegistry::new();
        let game = game();
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert_eq!(registry.register(&game, ALICE, tx.clone()), Ok(false));
        assert_eq!(registry.register(&game, ALICE, tx.clone()), Ok(false));
        assert!(rx.try_recv().is_err());

        assert!(registry.route_to(game.id, ALICE, "still here"));
        assert_eq!(rx.try_recv(), Ok(Outbound::Frame("still here".to_string())));
    }
}
