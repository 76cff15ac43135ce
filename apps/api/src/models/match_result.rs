use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Decimal places kept in reported scores.
pub const SCORE_PRECISION: i32 = 4;

/// Rounds a score to the reported precision.
pub fn round_score(score: f64) -> f64 {
    let factor = 10_f64.powi(SCORE_PRECISION);
    (score * factor).round() / factor
}

fn serialize_score<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_score(*score))
}

/// One scored (profile, opportunity) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub opportunity_id: String,
    #[serde(serialize_with = "serialize_score")]
    pub score: f64,
    pub explanation: Vec<String>,
}

/// Whether the semantic signal took part in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SemanticStatus {
    Active,
    Disabled,
    Unavailable { reason: String },
}

/// Weights actually applied after redistribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveWeights {
    pub level: f64,
    pub field: f64,
    pub lexical: f64,
    pub semantic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub catalog_size: usize,
    pub relevant_count: usize,
    pub filtered_out: usize,
    pub untagged_count: usize,
    pub semantic: SemanticStatus,
    pub effective_weights: EffectiveWeights,
}

/// Output envelope of one ranking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRun {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<MatchResult>,
    pub metadata: RunMetadata,
}
