use std::sync::Arc;

use crate::matching::config::MatchConfig;
use crate::matching::embedding::EmbeddingProvider;
use crate::matching::ranker::MatchRanker;
use crate::models::opportunity::Opportunity;

/// Shared application state injected into all route handlers via Axum extractors.
/// Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Catalog snapshot loaded at startup.
    pub catalog: Arc<Vec<Opportunity>>,
    pub match_config: Arc<MatchConfig>,
    /// Pluggable embedding backend. `NoEmbeddings` unless EMBEDDING_API_URL is set.
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl AppState {
    pub fn ranker(&self) -> MatchRanker {
        MatchRanker::new(self.match_config.clone(), self.embedder.clone())
    }
}
