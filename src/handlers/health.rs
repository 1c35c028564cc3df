use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use super::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let nodes: Vec<&String> = state.nodes.keys().collect();
    (StatusCode::OK,
        Json(json!({
        "status": "im ready",
        "nodes": nodes,
        "UTC_time": chrono::Utc::now().to_rfc2822(),
    })))
}
