use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::featurizer::OpportunityFeaturizer;
use crate::matching::relevance::is_relevant;
use crate::models::match_result::RankingRun;
use crate::models::opportunity::{FeaturizedOpportunity, Opportunity};
use crate::models::profile::StudentProfile;
use crate::profile::extractor::ProfileExtractor;
use crate::profile::handlers::{read_cv_upload, require_cv_text};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OpportunityListQuery {
    #[serde(default)]
    pub relevant_only: bool,
}

#[derive(Serialize)]
pub struct OpportunitySummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub relevant: bool,
}

/// Exactly one of `cv_text` / `profile` must be present.
#[derive(Deserialize)]
pub struct MatchRequest {
    pub cv_text: Option<String>,
    pub profile: Option<StudentProfile>,
    /// Ranks these instead of the loaded catalog.
    pub opportunities: Option<Vec<Opportunity>>,
    pub top_k: Option<usize>,
}

fn validate_top_k(top_k: Option<usize>) -> Result<Option<usize>, AppError> {
    match top_k {
        Some(0) => Err(AppError::Validation("top_k must be at least 1".to_string())),
        other => Ok(other),
    }
}

/// GET /api/v1/opportunities
pub async fn handle_list_opportunities(
    State(state): State<AppState>,
    Query(params): Query<OpportunityListQuery>,
) -> Json<Vec<OpportunitySummary>> {
    let summaries = state
        .catalog
        .iter()
        .map(|o| OpportunitySummary {
            id: o.effective_id(),
            title: o.title.clone(),
            url: o.url.clone(),
            relevant: is_relevant(o),
        })
        .filter(|s| s.relevant || !params.relevant_only)
        .collect();
    Json(summaries)
}

/// POST /api/v1/opportunities/featurize
pub async fn handle_featurize(
    State(state): State<AppState>,
    Json(opportunity): Json<Opportunity>,
) -> Json<FeaturizedOpportunity> {
    let featurizer = OpportunityFeaturizer::new(&state.match_config.field_vocabulary);
    Json(featurizer.featurize(&opportunity))
}

/// POST /api/v1/match
pub async fn handle_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<RankingRun>, AppError> {
    let top_k = validate_top_k(req.top_k)?;
    let profile = match (req.cv_text, req.profile) {
        (Some(cv_text), None) => {
            let cv_text = require_cv_text(&cv_text)?;
            ProfileExtractor::new(&state.match_config.field_vocabulary).extract(cv_text)
        }
        (None, Some(profile)) => profile.normalized(),
        _ => {
            return Err(AppError::Validation(
                "Provide exactly one of 'cv_text' or 'profile'".to_string(),
            ))
        }
    };

    let ranker = state.ranker();
    let run = match &req.opportunities {
        Some(opportunities) => ranker.rank(&profile, opportunities, top_k).await,
        None => ranker.rank(&profile, &state.catalog, top_k).await,
    };
    Ok(Json(run))
}

/// POST /api/v1/match/upload
pub async fn handle_match_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RankingRun>, AppError> {
    let upload = read_cv_upload(multipart).await?;
    let top_k = validate_top_k(upload.top_k)?;
    let profile =
        ProfileExtractor::new(&state.match_config.field_vocabulary).extract(&upload.extracted.text);
    let run = state.ranker().rank(&profile, &state.catalog, top_k).await;
    Ok(Json(run))
}
