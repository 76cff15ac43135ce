use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version, catalog size and whether embeddings are wired.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "opmatch-api",
        "catalog_size": state.catalog.len(),
        "embedding_backend": state.embedder.name()
    }))
}
