use axum::{Json, http::StatusCode, response::IntoResponse};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn ping() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "pong" }))
}
