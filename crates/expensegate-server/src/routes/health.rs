//! Liveness probe

use axum::Json;
use serde_json::{Value, json};

/// `GET /actuator/health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}
