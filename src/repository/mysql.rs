use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error};
use sqlx::{types::Json, MySqlPool};

use crate::errors::CustomError;
use crate::models::board::Board;
use crate::models::event::{GameEvent, GameEventKind};
use crate::models::game::{Game, GameId, GameState, GameStatus, Side};
use crate::models::user::{NewUser, User, UserId};
use crate::repository::Repository;

// Table layout lives in schema.sql
#[derive(sqlx::FromRow, Debug)]
struct GameRow {
    id: u64,
    status: u8,
    side1: u64,
    side2: Option<u64>,
    turn: u8,
    move_timeout_secs: u8,
    last_move_time: DateTime<Utc>,
    created: DateTime<Utc>,
    winner: Option<u64>,
    side1_ground: Vec<u8>,
    side1_ships: Vec<u8>,
    side1_revealed: Vec<u8>,
    side2_ground: Vec<u8>,
    side2_ships: Vec<u8>,
    side2_revealed: Vec<u8>,
}

impl TryFrom<GameRow> for Game {
    type Error = CustomError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let turn = Side::from_number(row.turn).ok_or_else(|| {
            error!("game {} has an invalid turn {}", row.id, row.turn);
            CustomError::Internal
        })?;
        Ok(Game {
            id: GameId(row.id),
            status: GameStatus::try_from(row.status)?,
            side1: UserId(row.side1),
            side2: row.side2.map(UserId),
            turn,
            move_timeout_secs: row.move_timeout_secs,
            last_move_time: row.last_move_time,
            created: row.created,
            winner: row.winner.map(UserId),
            state: GameState {
                side1: Board::from_bytes(&row.side1_ground, &row.side1_ships, &row.side1_revealed),
                side2: Board::from_bytes(&row.side2_ground, &row.side2_ships, &row.side2_revealed),
            },
        })
    }
}

#[derive(sqlx::FromRow, Debug)]
struct EventRow {
    id: u64,
    game_id: u64,
    user_id: u64,
    time: DateTime<Utc>,
    payload: Json<GameEventKind>,
}

impl From<EventRow> for GameEvent {
    fn from(row: EventRow) -> Self {
        GameEvent {
            id: row.id,
            game_id: GameId(row.game_id),
            user_id: UserId(row.user_id),
            time: row.time,
            kind: row.payload.0,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
struct UserRow {
    id: u64,
    name: Option<String>,
    mobile: Option<String>,
}

// The connection reports found rows, so zero means the game does not exist
fn updated(id: GameId, rows_affected: u64) -> Result<(), CustomError> {
    if rows_affected == 0 {
        debug!("update of game {} matched no rows", id);
        return Err(CustomError::NotFound("game".to_string()));
    }
    Ok(())
}

pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRepository { pool }
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn insert_game(&self, game: &Game) -> Result<GameId, CustomError> {
        let sql = "INSERT INTO game (status, side1, side2, turn, move_timeout_secs, last_move_time, created, winner, \
                   side1_ground, side1_ships, side1_revealed, side2_ground, side2_ships, side2_revealed) \
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
        let result = sqlx::query(sql)
            .bind(game.status as u8)
            .bind(game.side1.0)
            .bind(game.side2.map(|user| user.0))
            .bind(game.turn.number())
            .bind(game.move_timeout_secs)
            .bind(game.last_move_time)
            .bind(game.created)
            .bind(game.winner.map(|user| user.0))
            .bind(game.state.side1.ground.to_bytes())
            .bind(game.state.side1.ships.to_bytes())
            .bind(game.state.side1.revealed.to_bytes())
            .bind(game.state.side2.ground.to_bytes())
            .bind(game.state.side2.ships.to_bytes())
            .bind(game.state.side2.revealed.to_bytes())
            .execute(&self.pool)
            .await?;
        Ok(GameId(result.last_insert_id()))
    }

    async fn get_game(&self, id: GameId) -> Result<Game, CustomError> {
        let sql = "SELECT * FROM game WHERE id = ?";
        let row: GameRow = sqlx::query_as(sql)
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => CustomError::NotFound("game".to_string()),
                err => err.into(),
            })?;
        row.try_into()
    }

    async fn update_game(&self, game: &Game) -> Result<(), CustomError> {
        let sql = "UPDATE game SET status = ?, side2 = ?, turn = ?, last_move_time = ?, winner = ?, \
                   side1_ground = ?, side1_ships = ?, side1_revealed = ?, \
                   side2_ground = ?, side2_ships = ?, side2_revealed = ? WHERE id = ?";
        let result = sqlx::query(sql)
            .bind(game.status as u8)
            .bind(game.side2.map(|user| user.0))
            .bind(game.turn.number())
            .bind(game.last_move_time)
            .bind(game.winner.map(|user| user.0))
            .bind(game.state.side1.ground.to_bytes())
            .bind(game.state.side1.ships.to_bytes())
            .bind(game.state.side1.revealed.to_bytes())
            .bind(game.state.side2.ground.to_bytes())
            .bind(game.state.side2.ships.to_bytes())
            .bind(game.state.side2.revealed.to_bytes())
            .bind(game.id.0)
            .execute(&self.pool)
            .await?;
        updated(game.id, result.rows_affected())
    }

    async fn insert_event(&self, event: &GameEvent) -> Result<u64, CustomError> {
        let sql = "INSERT INTO game_event (game_id, user_id, type, time, payload) VALUES (?, ?, ?, ?, ?)";
        let result = sqlx::query(sql)
            .bind(event.game_id.0)
            .bind(event.user_id.0)
            .bind(event.kind.event_type())
            .bind(event.time)
            .bind(Json(&event.kind))
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_id())
    }

    async fn list_events(
        &self,
        game_id: GameId,
        event_type: Option<&str>,
    ) -> Result<Vec<GameEvent>, CustomError> {
        let rows: Vec<EventRow> = match event_type {
            Some(event_type) => {
                let sql = "SELECT id, game_id, user_id, time, payload FROM game_event \
                           WHERE game_id = ? AND type = ? ORDER BY time DESC, id DESC";
                sqlx::query_as(sql)
                    .bind(game_id.0)
                    .bind(event_type)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = "SELECT id, game_id, user_id, time, payload FROM game_event \
                           WHERE game_id = ? ORDER BY time DESC, id DESC";
                sqlx::query_as(sql)
                    .bind(game_id.0)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.into_iter().map(GameEvent::from).collect())
    }

    async fn get_user(&self, id: UserId) -> Result<User, CustomError> {
        let sql = "SELECT id, name, mobile FROM user WHERE id = ?";
        let row: UserRow = sqlx::query_as(sql)
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => CustomError::NotFound("user".to_string()),
                err => err.into(),
            })?;
        Ok(User {
            id: UserId(row.id),
            name: row.name,
            mobile: row.mobile,
        })
    }

    async fn insert_user(&self, user: &NewUser) -> Result<UserId, CustomError> {
        let sql = "INSERT INTO user (name, mobile) VALUES (?, ?)";
        let result = sqlx::query(sql)
            .bind(&user.name)
            .bind(&user.mobile)
            .execute(&self.pool)
            .await?;
        Ok(UserId(result.last_insert_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updating_a_missing_game_is_not_found() {
        assert_eq!(
            updated(GameId(7), 0),
            Err(CustomError::NotFound("game".to_string()))
        );
        assert_eq!(updated(GameId(7), 1), Ok(()));
    }

    #[test]
    fn stored_rows_become_games() {
        let now = Utc::now();
        let empty = Board::new();
        let row = GameRow {
            id: 4,
            status: 2,
            side1: 1,
            side2: Some(2),
            turn: 2,
            move_timeout_secs: 10,
            last_move_time: now,
            created: now,
            winner: None,
            side1_ground: empty.ground.to_bytes(),
            side1_ships: empty.ships.to_bytes(),
            side1_revealed: empty.revealed.to_bytes(),
            side2_ground: empty.ground.to_bytes(),
            side2_ships: empty.ships.to_bytes(),
            side2_revealed: empty.revealed.to_bytes(),
        };
        let game = Game::try_from(row).unwrap();
        assert_eq!(game.status, GameStatus::Joined);
        assert_eq!(game.turn, Side::Two);
        assert_eq!(game.side2, Some(UserId(2)));
        assert_eq!(game.state.side1, empty);
    }
}
