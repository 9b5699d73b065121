use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler.
/// Returns JSON with status and config summary. The API key itself is never
/// included, only whether one is configured.
pub fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "talkgpt-relay is running",
        "config": {
            "upstream_base_url": config.upstream.base_url,
            "model": config.upstream.model,
            "api_key_configured": config.upstream.api_key.is_some(),
            "log_level": config.features.log_level,
            "usage_sink": config.features.usage_sink.to_string(),
        }
    }))
}
