use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::CustomError;
use crate::models::board::{Board, SHIPS_PER_SIDE};
use crate::models::grid::{self, validate_index};
use crate::models::user::UserId;

pub const MIN_MOVE_TIMEOUT_SECS: u8 = 5;
pub const MAX_MOVE_TIMEOUT_SECS: u8 = 30;

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Lifecycle: Init -> Joined -> Start -> Finished
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Init = 1,
    Joined = 2,
    Start = 3,
    Finished = 4,
}

impl TryFrom<u8> for GameStatus {
    type Error = CustomError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Init),
            2 => Ok(Self::Joined),
            3 => Ok(Self::Start),
            4 => Ok(Self::Finished),
            _ => Err(CustomError::Internal),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn number(self) -> u8 {
        match self {
            Side::One => 1,
            Side::Two => 2,
        }
    }

    pub fn from_number(number: u8) -> Option<Side> {
        match number {
            1 => Some(Side::One),
            2 => Some(Side::Two),
            _ => None,
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    pub fn random() -> Side {
        if rand::random::<bool>() {
            Side::One
        } else {
            Side::Two
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct GameState {
    pub side1: Board,
    pub side2: Board,
}

impl GameState {
    pub fn board(&self, side: Side) -> &Board {
        match side {
            Side::One => &self.side1,
            Side::Two => &self.side2,
        }
    }

    pub fn board_mut(&mut self, side: Side) -> &mut Board {
        match side {
            Side::One => &mut self.side1,
            Side::Two => &mut self.side2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    pub id: GameId,
    pub status: GameStatus,
    pub side1: UserId,
    pub side2: Option<UserId>,
    pub turn: Side,
    pub move_timeout_secs: u8,
    pub last_move_time: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub winner: Option<UserId>,
    pub state: GameState,
}

impl Game {
    /// A fresh game owned by its creator. The id is assigned by the repository on insert.
    pub fn new(
        creator: UserId,
        move_timeout_secs: u8,
        first_turn: Side,
        now: DateTime<Utc>,
    ) -> Result<Self, CustomError> {
        if !(MIN_MOVE_TIMEOUT_SECS..=MAX_MOVE_TIMEOUT_SECS).contains(&move_timeout_secs) {
            return Err(CustomError::Validation(format!(
                "move timeout must be between {} and {} seconds",
                MIN_MOVE_TIMEOUT_SECS, MAX_MOVE_TIMEOUT_SECS
            )));
        }
        Ok(Game {
            id: GameId(0),
            status: GameStatus::Init,
            side1: creator,
            side2: None,
            turn: first_turn,
            move_timeout_secs,
            last_move_time: now,
            created: now,
            winner: None,
            state: GameState::default(),
        })
    }

    pub fn side_of(&self, user: UserId) -> Option<Side> {
        if self.side1 == user {
            Some(Side::One)
        } else if self.side2 == Some(user) {
            Some(Side::Two)
        } else {
            None
        }
    }

    pub fn user_of(&self, side: Side) -> Option<UserId> {
        match side {
            Side::One => Some(self.side1),
            Side::Two => self.side2,
        }
    }

    pub fn participant(&self, user: UserId) -> Result<Side, CustomError> {
        self.side_of(user).ok_or_else(|| {
            CustomError::Forbidden("user does not belong to this game".to_string())
        })
    }

    pub fn flip_turn(&mut self) {
        self.turn = self.turn.other();
    }

    pub fn finish(&mut self, winner: UserId) {
        self.status = GameStatus::Finished;
        self.winner = Some(winner);
    }

    /// Seats `user` as side 2. Returns false when the user was already seated.
    pub fn join(&mut self, user: UserId) -> Result<bool, CustomError> {
        let seated = self.side_of(user).is_some();
        match self.status {
            GameStatus::Init if seated => Ok(false),
            GameStatus::Joined if seated => Ok(false),
            GameStatus::Init => {
                self.side2 = Some(user);
                self.status = GameStatus::Joined;
                Ok(true)
            }
            _ => Err(CustomError::InvalidGameStatus(
                "game status is not suitable for joining".to_string(),
            )),
        }
    }

    /// Places the ten ships of `user`. Starts the game once both sides are placed.
    pub fn submit_ships(
        &mut self,
        user: UserId,
        cells: &[i64],
        now: DateTime<Utc>,
    ) -> Result<(Side, Vec<usize>), CustomError> {
        if self.status != GameStatus::Joined {
            return Err(CustomError::InvalidGameStatus(
                "game is not waiting for ship locations".to_string(),
            ));
        }

        let mut unique = HashSet::new();
        for &cell in cells {
            unique.insert(validate_index(cell)?);
        }
        if unique.len() != SHIPS_PER_SIDE {
            return Err(CustomError::InvalidShipIndexValue(format!(
                "exactly {} distinct ship indexes are required",
                SHIPS_PER_SIDE
            )));
        }

        let side = self.participant(user)?;
        let board = self.state.board_mut(side);
        if board.ship_count() > 0 {
            return Err(CustomError::Duplicate(
                "ship locations were already submitted".to_string(),
            ));
        }
        let mut placed: Vec<usize> = unique.into_iter().collect();
        placed.sort_unstable();
        board.place_ships(&placed);

        if self.state.side1.ship_count() == SHIPS_PER_SIDE
            && self.state.side2.ship_count() == SHIPS_PER_SIDE
        {
            self.status = GameStatus::Start;
        }
        self.last_move_time = now;
        Ok((side, placed))
    }

    pub fn move_ship(&mut self, side: Side, from: i64, to: i64) -> Result<(usize, usize), CustomError> {
        let from = validate_index(from)?;
        let to = validate_index(to)?;
        let board = self.state.board_mut(side);
        if !board.has_ship(from) {
            debug!("game {}: no ship at {} to move", self.id, from);
            return Err(CustomError::ShipInvalidMoveAlreadyDestroyed);
        }
        if !board.is_hidden(to) || board.has_ship(to) {
            debug!("game {}: cell {} is not a valid destination", self.id, to);
            return Err(CustomError::ShipInvalidMoveRevealedLocation);
        }
        board.relocate_ship(from, to);
        Ok((from, to))
    }

    /// Uncovers the block anchored at `index` on the opponent's board.
    /// Returns the scanned cells and the ship cells found among them.
    pub fn reveal(&mut self, side: Side, index: i64) -> Result<(Vec<usize>, Vec<usize>), CustomError> {
        let index = validate_index(index)?;
        let slots = grid::neighbors(index);
        let board = self.state.board_mut(side.other());
        let revealed = slots
            .iter()
            .copied()
            .filter(|&cell| board.reveal(cell))
            .collect();
        Ok((slots.to_vec(), revealed))
    }

    /// Fires at `index` on the opponent's board. Sinking the last ship finishes the game.
    pub fn explode(&mut self, side: Side, index: i64) -> Result<bool, CustomError> {
        let index = validate_index(index)?;
        let target = self.state.board_mut(side.other());
        if !target.sink(index) {
            return Ok(false);
        }
        if target.ship_count() == 0 && self.status != GameStatus::Finished {
            if let Some(winner) = self.user_of(side) {
                self.finish(winner);
            }
        }
        Ok(true)
    }
}

// The struct used to respond with the game as seen by one of its players
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct GameView {
    pub id: GameId,
    pub status: GameStatus,
    pub user_id: UserId,
    pub your_turn: bool,
    pub other_side_joined: bool,
    pub move_timeout_sec: u8,
    pub create_date: DateTime<Utc>,
    pub winner_user: Option<UserId>,
    pub board: BoardView,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct BoardView {
    pub own_hidden: Vec<usize>,
    pub own_ships: Vec<usize>,
    pub own_revealed_ships: Vec<usize>,
    pub enemy_hidden: Vec<usize>,
    pub enemy_revealed_ships: Vec<usize>,
}

impl GameView {
    pub fn for_user(game: &Game, user: UserId) -> Result<Self, CustomError> {
        let side = game.participant(user)?;
        let own = game.state.board(side);
        let enemy = game.state.board(side.other());
        Ok(GameView {
            id: game.id,
            status: game.status,
            user_id: user,
            your_turn: game.turn == side,
            other_side_joined: game.user_of(side.other()).is_some(),
            move_timeout_sec: game.move_timeout_secs,
            create_date: game.created,
            winner_user: game.winner,
            board: BoardView {
                own_hidden: own.hidden_cells(),
                own_ships: own.ship_cells(),
                own_revealed_ships: own.revealed_cells(),
                enemy_hidden: enemy.hidden_cells(),
                enemy_revealed_ships: enemy.revealed_cells(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);
    const CAROL: UserId = UserId(3);

    fn fleet(offset: i64) -> Vec<i64> {
        (0..10).map(|i| offset + i).collect()
    }

    fn joined_game() -> Game {
        let mut game = Game::new(ALICE, 10, Side::One, Utc::now()).unwrap();
        game.join(BOB).unwrap();
        game
    }

    fn started_game() -> Game {
        let mut game = joined_game();
        game.submit_ships(ALICE, &fleet(0), Utc::now()).unwrap();
        game.submit_ships(BOB, &fleet(50), Utc::now()).unwrap();
        game
    }

    #[test]
    fn new_game_waits_for_an_opponent() {
        let game = Game::new(ALICE, 10, Side::random(), Utc::now()).unwrap();
        assert_eq!(game.status, GameStatus::Init);
        assert_eq!(game.side2, None);
        assert!(matches!(game.turn.number(), 1 | 2));
    }

    #[test]
    fn move_timeout_is_bounded() {
        assert!(Game::new(ALICE, 4, Side::One, Utc::now()).is_err());
        assert!(Game::new(ALICE, 31, Side::One, Utc::now()).is_err());
        assert!(Game::new(ALICE, 5, Side::One, Utc::now()).is_ok());
        assert!(Game::new(ALICE, 30, Side::One, Utc::now()).is_ok());
    }

    #[test]
    fn joining_is_idempotent_for_seated_players() {
        let mut game = Game::new(ALICE, 10, Side::One, Utc::now()).unwrap();
        assert_eq!(game.join(ALICE), Ok(false));
        assert_eq!(game.status, GameStatus::Init);
        assert_eq!(game.join(BOB), Ok(true));
        assert_eq!(game.join(BOB), Ok(false));
        assert_eq!(game.side2, Some(BOB));
        assert_eq!(game.status, GameStatus::Joined);
    }

    #[test]
    fn third_player_cannot_join() {
        let mut game = joined_game();
        assert!(matches!(game.join(CAROL), Err(CustomError::InvalidGameStatus(_))));
        assert_eq!(game.side2, Some(BOB));
    }

    #[test]
    fn ships_must_be_ten_distinct_cells_on_the_board() {
        let mut game = joined_game();
        let mut out_of_range = fleet(0);
        out_of_range[3] = 100;
        assert!(matches!(
            game.submit_ships(ALICE, &out_of_range, Utc::now()),
            Err(CustomError::InvalidShipIndexValue(_))
        ));

        let mut repeated = fleet(0);
        repeated[9] = 0;
        assert!(matches!(
            game.submit_ships(ALICE, &repeated, Utc::now()),
            Err(CustomError::InvalidShipIndexValue(_))
        ));

        assert!(matches!(
            game.submit_ships(ALICE, &fleet(0)[..9], Utc::now()),
            Err(CustomError::InvalidShipIndexValue(_))
        ));
    }

    #[test]
    fn game_starts_only_when_both_fleets_are_placed() {
        let mut game = joined_game();
        game.submit_ships(ALICE, &fleet(0), Utc::now()).unwrap();
        assert_eq!(game.status, GameStatus::Joined);
        assert!(matches!(
            game.submit_ships(ALICE, &fleet(20), Utc::now()),
            Err(CustomError::Duplicate(_))
        ));
        game.submit_ships(BOB, &fleet(50), Utc::now()).unwrap();
        assert_eq!(game.status, GameStatus::Start);
    }

    #[test]
    fn outsiders_cannot_place_ships() {
        let mut game = joined_game();
        assert!(matches!(
            game.submit_ships(CAROL, &fleet(0), Utc::now()),
            Err(CustomError::Forbidden(_))
        ));
    }

    #[test]
    fn moving_keeps_the_fleet_size() {
        let mut game = started_game();
        game.move_ship(Side::One, 3, 77).unwrap();
        assert_eq!(game.state.side1.ship_count(), 10);
        assert!(game.state.side1.has_ship(77));
        assert!(!game.state.side1.has_ship(3));
    }

    #[test]
    fn moving_rejects_missing_ships_and_bad_destinations() {
        let mut game = started_game();
        assert_eq!(
            game.move_ship(Side::One, 40, 41),
            Err(CustomError::ShipInvalidMoveAlreadyDestroyed)
        );
        assert_eq!(
            game.move_ship(Side::One, 0, 1),
            Err(CustomError::ShipInvalidMoveRevealedLocation)
        );
        game.reveal(Side::Two, 44).unwrap();
        assert_eq!(
            game.move_ship(Side::One, 0, 45),
            Err(CustomError::ShipInvalidMoveRevealedLocation)
        );
        assert_eq!(game.state.side1.ship_count(), 10);
    }

    #[test]
    fn reveal_reports_ships_in_the_block() {
        let mut game = started_game();
        // side 2 ships live on 50..60
        let (slots, ships) = game.reveal(Side::One, 49).unwrap();
        assert_eq!(slots, vec![49, 48, 59, 58]);
        assert_eq!(ships, vec![59, 58]);
        assert!(!game.state.side2.is_hidden(49));
        assert_eq!(game.state.side2.revealed_cells(), vec![58, 59]);
        assert_eq!(game.state.side2.ship_count(), 10);
    }

    #[test]
    fn missing_leaves_status_alone() {
        let mut game = started_game();
        assert_eq!(game.explode(Side::One, 0), Ok(false));
        assert_eq!(game.status, GameStatus::Start);
        assert_eq!(game.winner, None);
    }

    #[test]
    fn sinking_the_last_ship_finishes_once() {
        let mut game = started_game();
        for cell in 50..59 {
            assert_eq!(game.explode(Side::One, cell), Ok(true));
            assert_eq!(game.status, GameStatus::Start);
        }
        assert_eq!(game.explode(Side::One, 59), Ok(true));
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.winner, Some(ALICE));

        assert_eq!(game.explode(Side::One, 59), Ok(false));
        assert_eq!(game.winner, Some(ALICE));
    }

    #[test]
    fn view_hides_enemy_ships() {
        let mut game = started_game();
        game.reveal(Side::One, 49).unwrap();
        let view = GameView::for_user(&game, ALICE).unwrap();
        assert_eq!(view.board.own_ships, (0..10).collect::<Vec<_>>());
        assert_eq!(view.board.enemy_revealed_ships, vec![58, 59]);
        assert!(view.your_turn);
        assert!(view.other_side_joined);
        assert!(GameView::for_user(&game, CAROL).is_err());
    }
}
