pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers as matching;
use crate::profile::handlers as profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Profile API
        .route("/api/v1/profile/extract", post(profile::handle_extract_profile))
        .route("/api/v1/profile/upload", post(profile::handle_upload_profile))
        // Catalog API
        .route("/api/v1/opportunities", get(matching::handle_list_opportunities))
        .route(
            "/api/v1/opportunities/featurize",
            post(matching::handle_featurize),
        )
        // Matching API
        .route("/api/v1/match", post(matching::handle_match))
        .route("/api/v1/match/upload", post(matching::handle_match_upload))
        .with_state(state)
}
