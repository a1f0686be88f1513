use axum::{http::StatusCode, response::IntoResponse, Json};
use log::debug;
use serde_json::json;

// Liveness probe, no state involved
pub async fn check_health() -> impl IntoResponse {
    debug!("health check");
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
