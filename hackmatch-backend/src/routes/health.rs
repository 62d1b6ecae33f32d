use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "OK",
        "message": "HackMatch API is running",
        "timestamp": Utc::now(),
    }))
}
