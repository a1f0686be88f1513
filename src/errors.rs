use axum::{http::StatusCode, response::IntoResponse, Json};
use log::error;
use serde_json::json;

// Errors raised by the game engine and surfaced by the handlers.
// The Display text is the user facing message, `code()` is the machine readable part.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CustomError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    InvalidGameStatus(String),
    #[error("{0}")]
    InvalidShipIndexValue(String),
    #[error("cannot move ship that is already destroyed")]
    ShipInvalidMoveAlreadyDestroyed,
    #[error("cannot move ship to revealed location")]
    ShipInvalidMoveRevealedLocation,
    #[error("it is not your turn")]
    NotUserTurn,
    #[error("game is finished")]
    GameIsFinished,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("Internal Server Error")]
    Internal,
}

impl CustomError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidGameStatus(_) => "invalid_game_status",
            Self::InvalidShipIndexValue(_) => "invalid_ship_index_value",
            Self::ShipInvalidMoveAlreadyDestroyed => "ship_invalid_move_already_destroyed",
            Self::ShipInvalidMoveRevealedLocation => "ship_invalid_move_revealed_location",
            Self::NotUserTurn => "not_user_turn",
            Self::GameIsFinished => "game_is_finished",
            Self::Forbidden(_) => "forbidden",
            Self::Duplicate(_) => "duplicate",
            Self::Internal => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Duplicate(_) => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    // Body shared by the http responses and the socket error frames
    pub fn body(&self) -> serde_json::Value {
        json!({"error": self.to_string(), "code": self.code()})
    }
}

// Storage errors stay opaque unless the driver tells us the row is missing
impl From<sqlx::Error> for CustomError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("record".to_string()),
            err => {
                error!("Storage error: {:?}", err);
                Self::Internal
            }
        }
    }
}

impl From<serde_json::Error> for CustomError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("malformed payload: {}", err))
    }
}

impl IntoResponse for CustomError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_becomes_not_found() {
        let err: CustomError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_storage_errors_are_opaque() {
        let err: CustomError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err, CustomError::Internal);
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn body_carries_message_and_code() {
        let body = CustomError::NotUserTurn.body();
        assert_eq!(body["code"], "not_user_turn");
        assert_eq!(body["error"], "it is not your turn");
    }
}
