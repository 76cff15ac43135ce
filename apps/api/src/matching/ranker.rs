use std::cmp::Ordering;
use std::iter;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::matching::config::MatchConfig;
use crate::matching::embedding::EmbeddingProvider;
use crate::matching::featurizer::OpportunityFeaturizer;
use crate::matching::relevance::is_relevant;
use crate::matching::similarity::SimilarityEngine;
use crate::matching::tfidf::CorpusIndex;
use crate::models::match_result::{round_score, MatchResult, RankingRun, RunMetadata, SemanticStatus};
use crate::models::opportunity::Opportunity;
use crate::models::profile::StudentProfile;

/// Orchestrates one ranking run: filter, featurize, index, embed, score, sort.
#[derive(Clone)]
pub struct MatchRanker {
    config: Arc<MatchConfig>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl MatchRanker {
    pub fn new(config: Arc<MatchConfig>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { config, embedder }
    }

    /// Ranks `opportunities` against `profile`. `top_k` overrides the configured limit.
    ///
    /// Never fails: an embedding failure degrades the run to lexical-only and
    /// is reported in `metadata.semantic`.
    pub async fn rank(
        &self,
        profile: &StudentProfile,
        opportunities: &[Opportunity],
        top_k: Option<usize>,
    ) -> RankingRun {
        let run_id = Uuid::new_v4();
        let config = self.config.as_ref();

        let relevant: Vec<&Opportunity> = opportunities.iter().filter(|o| is_relevant(o)).collect();
        let featurizer = OpportunityFeaturizer::new(&config.field_vocabulary);
        let featurized: Vec<_> = relevant.iter().map(|o| featurizer.featurize(o)).collect();
        let texts: Vec<String> = relevant.iter().map(|o| o.analysis_text()).collect();

        // Lexical index over every candidate plus the profile, built before any pair is scored.
        let profile_terms = profile.lexical_terms();
        let index = CorpusIndex::fit(
            texts
                .iter()
                .map(String::as_str)
                .chain(iter::once(profile_terms.as_str())),
        );
        debug!(
            %run_id,
            documents = index.documents(),
            terms = index.vocabulary_size(),
            "Lexical index built"
        );

        let (semantic, embeddings) = self.embed(profile, &texts).await;
        // Weights follow the reported status, even when there was nothing to embed.
        let semantic_active = matches!(semantic, SemanticStatus::Active);
        let engine = SimilarityEngine::new(config, &index, profile, semantic_active);

        let mut results: Vec<MatchResult> = featurized
            .iter()
            .zip(&texts)
            .enumerate()
            .map(|(i, (f, text))| {
                let pair = embeddings
                    .as_ref()
                    .map(|(p, opps)| (p.as_slice(), opps[i].as_slice()));
                let scored = engine.score(profile, f, text, pair);
                debug!(
                    opportunity = %f.opportunity_id,
                    score = scored.score,
                    breakdown = ?scored.breakdown,
                    "Scored pair"
                );
                MatchResult {
                    opportunity_id: f.opportunity_id.clone(),
                    score: round_score(scored.score),
                    explanation: scored.explanation,
                }
            })
            .collect();

        // Stable: equal scores keep catalog order.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        if let Some(k) = top_k.or(config.top_k) {
            results.truncate(k);
        }

        let metadata = RunMetadata {
            catalog_size: opportunities.len(),
            relevant_count: relevant.len(),
            filtered_out: opportunities.len() - relevant.len(),
            untagged_count: featurized.iter().filter(|f| f.is_untagged()).count(),
            semantic,
            effective_weights: engine.weights(),
        };

        info!(
            %run_id,
            catalog = metadata.catalog_size,
            relevant = metadata.relevant_count,
            returned = results.len(),
            semantic = ?metadata.semantic,
            "Ranking run complete"
        );

        RankingRun {
            run_id,
            generated_at: Utc::now(),
            results,
            metadata,
        }
    }

    /// Profile summary and candidate embeddings, or the reason there are none.
    async fn embed(
        &self,
        profile: &StudentProfile,
        texts: &[String],
    ) -> (SemanticStatus, Option<(Vec<f32>, Vec<Vec<f32>>)>) {
        if !self.config.enable_semantic {
            return (SemanticStatus::Disabled, None);
        }
        if !self.embedder.is_available() {
            return (
                SemanticStatus::Unavailable {
                    reason: "no embedding backend configured".to_string(),
                },
                None,
            );
        }
        if texts.is_empty() {
            return (SemanticStatus::Active, None);
        }

        let inputs: Vec<String> = iter::once(profile.summary()).chain(texts.iter().cloned()).collect();
        match self.embedder.embed(&inputs).await {
            Ok(mut vectors) if vectors.len() == inputs.len() => {
                if let Some(reason) = malformed_vectors(&vectors) {
                    let reason = format!("{} backend {reason}", self.embedder.name());
                    warn!("{reason}; falling back to lexical-only scoring");
                    return (SemanticStatus::Unavailable { reason }, None);
                }
                let profile_vector = vectors.remove(0);
                (SemanticStatus::Active, Some((profile_vector, vectors)))
            }
            Ok(vectors) => {
                let reason = format!(
                    "{} backend returned {} vectors for {} inputs",
                    self.embedder.name(),
                    vectors.len(),
                    inputs.len()
                );
                warn!("{reason}; falling back to lexical-only scoring");
                (SemanticStatus::Unavailable { reason }, None)
            }
            Err(e) => {
                warn!(backend = self.embedder.name(), "Embedding failed, falling back to lexical-only scoring: {e}");
                (SemanticStatus::Unavailable { reason: e.to_string() }, None)
            }
        }
    }
}

/// Why a batch of embeddings cannot be compared pairwise, if it cannot.
fn malformed_vectors(vectors: &[Vec<f32>]) -> Option<String> {
    let dimension = vectors.first().map_or(0, Vec::len);
    if dimension == 0 {
        return Some("returned empty vectors".to_string());
    }
    if let Some(v) = vectors.iter().find(|v| v.len() != dimension) {
        return Some(format!("returned mixed dimensions ({dimension} and {})", v.len()));
    }
    if vectors.iter().any(|v| v.iter().all(|x| *x == 0.0) || v.iter().any(|x| !x.is_finite())) {
        return Some("returned a zero or non-finite vector".to_string());
    }
    None
}
