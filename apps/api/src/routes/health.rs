use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME")
    }))
}

/// GET /api/v1/metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "eventSubscribers": state.events.subscriber_count(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
