use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and medium.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let medium = if state.config.redis_url.is_some() {
        "redis"
    } else {
        "memory"
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "drafts-api",
        "namespace": state.config.drafts_namespace,
        "medium": medium
    }))
}
