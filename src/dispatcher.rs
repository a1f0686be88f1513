use std::sync::Arc;

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::models::game::{Game, GameId, GameView};
use crate::models::user::UserId;
use crate::registry::ConnectionRegistry;

// Frame delivered over the socket. The payload is the inner event, json encoded.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub event_type: String,
    pub payload: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectEvent {
    pub game_id: GameId,
    pub user_id: UserId,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GameStartEvent {
    pub game: GameView,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChangeTurnEvent {
    pub game_id: GameId,
    pub user_id: UserId,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShipMovedEvent {
    pub game_id: GameId,
    pub user_id: UserId,
    pub old_ship_index: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RevealEvent {
    pub game_id: GameId,
    pub user_id: UserId,
    pub slots: Vec<usize>,
    pub revealed_ships: Vec<usize>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExplosionEvent {
    pub game_id: GameId,
    pub user_id: UserId,
    pub index: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EndGameEvent {
    pub game_id: GameId,
    pub winner_user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingEvent {
    Connect(ConnectEvent),
    GameStart(GameStartEvent),
    ChangeTurn(ChangeTurnEvent),
    ShipMoved(ShipMovedEvent),
    Reveal(RevealEvent),
    Explosion(ExplosionEvent),
    EndGame(EndGameEvent),
}

impl OutgoingEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::GameStart(_) => "game_start",
            Self::ChangeTurn(_) => "change_turn",
            Self::ShipMoved(_) => "ship_moved",
            Self::Reveal(_) => "reveal",
            Self::Explosion(_) => "explosion",
            Self::EndGame(_) => "end_game",
        }
    }

    pub fn envelope(&self) -> serde_json::Result<Envelope> {
        let payload = match self {
            Self::Connect(inner) => serde_json::to_string(inner)?,
            Self::GameStart(inner) => serde_json::to_string(inner)?,
            Self::ChangeTurn(inner) => serde_json::to_string(inner)?,
            Self::ShipMoved(inner) => serde_json::to_string(inner)?,
            Self::Reveal(inner) => serde_json::to_string(inner)?,
            Self::Explosion(inner) => serde_json::to_string(inner)?,
            Self::EndGame(inner) => serde_json::to_string(inner)?,
        };
        Ok(Envelope {
            event_type: self.event_type().to_string(),
            payload,
        })
    }
}

/// Turns domain events into socket frames and hands them to the registry.
/// Delivery is best effort: by the time an event is sent the action is already stored.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Dispatcher { registry }
    }

    pub fn send(&self, game_id: GameId, recipient: UserId, event: &OutgoingEvent) -> bool {
        let frame = match event.envelope().and_then(|envelope| serde_json::to_string(&envelope)) {
            Ok(frame) => frame,
            Err(err) => {
                error!("cannot serialize {} event for game {}: {:?}", event.event_type(), game_id, err);
                return false;
            }
        };

        let delivered = self.registry.route_to(game_id, recipient, &frame);
        if !delivered {
            debug!(
                "{} event for game {} dropped, user {} is offline",
                event.event_type(),
                game_id,
                recipient
            );
        }
        delivered
    }

    // Sends to whichever sides are seated
    pub fn send_both(&self, game: &Game, event: &OutgoingEvent) {
        for user in [Some(game.side1), game.side2].into_iter().flatten() {
            self.send(game.id, user, event);
        }
    }
}
