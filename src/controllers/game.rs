use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::CustomError;
use crate::models::board::SHIPS_PER_SIDE;
use crate::models::game::{GameId, MAX_MOVE_TIMEOUT_SECS, MIN_MOVE_TIMEOUT_SECS};
use crate::models::user::UserId;
use crate::AppState;

// The struct used for a new game
#[derive(Deserialize, Serialize, Debug)]
pub struct NewGame {
    pub user_id: u64,
    pub move_timeout: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GameQuery {
    pub user_id: u64,
}

// Body of the actions that only name the game and the acting user
#[derive(Deserialize, Serialize, Debug)]
pub struct GameAction {
    pub user_id: u64,
    pub game_id: u64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubmitShips {
    pub user_id: u64,
    pub game_id: u64,
    pub ships_indexes: Vec<i64>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct MoveShip {
    pub user_id: u64,
    pub game_id: u64,
    pub old_ship_index: i64,
    pub new_ship_index: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CellAction {
    pub user_id: u64,
    pub game_id: u64,
    pub index: i64,
}

fn user_id(raw: u64) -> Result<UserId, CustomError> {
    if raw == 0 {
        return Err(CustomError::Validation("user_id is required".to_string()));
    }
    Ok(UserId(raw))
}

fn ids(raw_user: u64, raw_game: u64) -> Result<(UserId, GameId), CustomError> {
    let user = user_id(raw_user)?;
    if raw_game == 0 {
        return Err(CustomError::Validation("game_id is required".to_string()));
    }
    Ok((user, GameId(raw_game)))
}

//handler for creating a new game. The creator is seated on side one
pub async fn create_game(
    State(state): State<AppState>,
    Json(new_game): Json<NewGame>,
) -> Result<impl IntoResponse, CustomError> {
    info!("new game request by user {}", new_game.user_id);

    let user = user_id(new_game.user_id)?;
    let range = i64::from(MIN_MOVE_TIMEOUT_SECS)..=i64::from(MAX_MOVE_TIMEOUT_SECS);
    if !range.contains(&new_game.move_timeout) {
        warn!("Illegal move timeout: {}", new_game.move_timeout);
        return Err(CustomError::Validation(format!(
            "move_timeout must be between {} and {} seconds",
            MIN_MOVE_TIMEOUT_SECS, MAX_MOVE_TIMEOUT_SECS
        )));
    }

    // range checked above
    let game = state.games.create_game(user, new_game.move_timeout as u8).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<u64>,
    Query(query): Query<GameQuery>,
) -> Result<impl IntoResponse, CustomError> {
    info!("get game {} request by user {}", game_id, query.user_id);

    let (user, game_id) = ids(query.user_id, game_id)?;
    let game = state.games.get_game(game_id, user).await?;
    Ok((StatusCode::OK, Json(game)))
}

pub async fn join_game(
    State(state): State<AppState>,
    Json(join): Json<GameAction>,
) -> Result<impl IntoResponse, CustomError> {
    info!("join game {} request by user {}", join.game_id, join.user_id);

    let (user, game_id) = ids(join.user_id, join.game_id)?;
    let game = state.games.join_game(game_id, user).await?;
    Ok((StatusCode::OK, Json(game)))
}

pub async fn submit_ships(
    State(state): State<AppState>,
    Json(submit): Json<SubmitShips>,
) -> Result<impl IntoResponse, CustomError> {
    info!("submit ships for game {} by user {}", submit.game_id, submit.user_id);

    let (user, game_id) = ids(submit.user_id, submit.game_id)?;
    if submit.ships_indexes.len() != SHIPS_PER_SIDE {
        return Err(CustomError::Validation(format!(
            "exactly {} ship indexes are required",
            SHIPS_PER_SIDE
        )));
    }

    let result = state.games.submit_ships(game_id, user, &submit.ships_indexes).await?;
    Ok((StatusCode::OK, Json(result)))
}

pub async fn move_ship(
    State(state): State<AppState>,
    Json(movement): Json<MoveShip>,
) -> Result<impl IntoResponse, CustomError> {
    info!(
        "move ship {} -> {} in game {} by user {}",
        movement.old_ship_index, movement.new_ship_index, movement.game_id, movement.user_id
    );

    let (user, game_id) = ids(movement.user_id, movement.game_id)?;
    state
        .games
        .move_ship(game_id, user, movement.old_ship_index, movement.new_ship_index)
        .await?;
    Ok((StatusCode::OK, Json(json!({"status": "ok"}))))
}

pub async fn change_turn(
    State(state): State<AppState>,
    Json(action): Json<GameAction>,
) -> Result<impl IntoResponse, CustomError> {
    info!("change turn in game {} by user {}", action.game_id, action.user_id);

    let (user, game_id) = ids(action.user_id, action.game_id)?;
    state.games.change_turn(game_id, user).await?;
    Ok((StatusCode::OK, Json(json!({"status": "ok"}))))
}

pub async fn reveal(
    State(state): State<AppState>,
    Json(action): Json<CellAction>,
) -> Result<impl IntoResponse, CustomError> {
    info!("reveal {} in game {} by user {}", action.index, action.game_id, action.user_id);

    let (user, game_id) = ids(action.user_id, action.game_id)?;
    let revealed_ships = state.games.reveal_slot(game_id, user, action.index).await?;
    Ok((StatusCode::OK, Json(json!({"revealed_ships": revealed_ships}))))
}

pub async fn explode(
    State(state): State<AppState>,
    Json(action): Json<CellAction>,
) -> Result<impl IntoResponse, CustomError> {
    info!("explode {} in game {} by user {}", action.index, action.game_id, action.user_id);

    let (user, game_id) = ids(action.user_id, action.game_id)?;
    let has_ship = state.games.explode(game_id, user, action.index).await?;
    Ok((StatusCode::OK, Json(json!({"has_ship": has_ship}))))
}
