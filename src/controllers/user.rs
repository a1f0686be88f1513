use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use log::info;

use crate::errors::CustomError;
use crate::models::user::{CreatedUser, NewUser, UserId};
use crate::AppState;

//handler for registering a user. Name and mobile are both optional
pub async fn create_user(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<impl IntoResponse, CustomError> {
    info!("new user request");

    if new_user.name.as_deref().map_or(false, |name| name.trim().is_empty()) {
        return Err(CustomError::Validation("name must not be empty".to_string()));
    }

    let id = state.users.create_user(&new_user).await?;
    Ok((StatusCode::CREATED, Json(CreatedUser { id })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<impl IntoResponse, CustomError> {
    info!("get user request for {}", user_id);

    let user = state.users.get_user(UserId(user_id)).await?;
    Ok((StatusCode::OK, Json(user)))
}
