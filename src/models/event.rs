use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game::GameId;
use crate::models::user::UserId;

// What happened, with the data that belongs to that kind of action
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventKind {
    JoinGame,
    InitialShipLocation { indexes: Vec<usize> },
    MoveShip { from: usize, to: usize },
    Explosion { index: usize },
    EmptyExplosion { index: usize },
    ChangeTurn,
    Reveal { slots: Vec<usize>, revealed_ships: Vec<usize> },
}

impl GameEventKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::JoinGame => "join_game",
            Self::InitialShipLocation { .. } => "initial_ship_location",
            Self::MoveShip { .. } => "move_ship",
            Self::Explosion { .. } => "explosion",
            Self::EmptyExplosion { .. } => "empty_explosion",
            Self::ChangeTurn => "change_turn",
            Self::Reveal { .. } => "reveal",
        }
    }
}

// Append only audit record, one per accepted action
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct GameEvent {
    pub id: u64,
    pub game_id: GameId,
    pub user_id: UserId,
    pub time: DateTime<Utc>,
    pub kind: GameEventKind,
}

impl GameEvent {
    pub fn new(game_id: GameId, user_id: UserId, kind: GameEventKind) -> Self {
        GameEvent {
            id: 0,
            game_id,
            user_id,
            time: Utc::now(),
            kind,
        }
    }
}
