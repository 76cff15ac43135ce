//! Hybrid similarity between one profile and one featurized opportunity.
//!
//! Four sub-scores in [0, 1] (level, field, lexical, semantic) combined with
//! the run's effective weights. Explanations are generated from the
//! sub-score values only.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::matching::config::MatchConfig;
use crate::matching::embedding::cosine_similarity;
use crate::matching::tfidf::{cosine, top_shared_terms, CorpusIndex, TermVector};
use crate::models::match_result::EffectiveWeights;
use crate::models::opportunity::{FeaturizedOpportunity, OpportunityLevel};
use crate::models::profile::{EducationLevel, StudentProfile};

const SHARED_TERMS_SHOWN: usize = 3;
const MATCHING_SKILLS_SHOWN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubScores {
    pub level: f64,
    pub field: f64,
    pub lexical: f64,
    /// `None` when the run is lexical-only.
    pub semantic: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    pub score: f64,
    pub explanation: Vec<String>,
    pub breakdown: SubScores,
}

/// Level sub-score. `Any` always matches; an unknown level on either side
/// earns the configured partial credit.
pub fn level_score(profile: EducationLevel, target: OpportunityLevel, config: &MatchConfig) -> f64 {
    match (profile, target.as_education_level()) {
        _ if target == OpportunityLevel::Any => 1.0,
        (EducationLevel::Unknown, _) | (_, None) => config.unknown_level_credit,
        (profile, Some(target)) if profile == target => 1.0,
        (profile, Some(target)) => config.level_adjacency.credit(profile, target),
    }
}

/// |A ∩ B| / |A ∪ B|, 0 when either set is empty.
pub fn field_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.union(b).count();
    shared as f64 / union as f64
}

/// Scores pairs for one ranking run. Holds the run's lexical index and the
/// profile's vector so each pair only vectorizes the opportunity side.
pub struct SimilarityEngine<'a> {
    config: &'a MatchConfig,
    index: &'a CorpusIndex,
    profile_vector: TermVector,
    weights: EffectiveWeights,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(
        config: &'a MatchConfig,
        index: &'a CorpusIndex,
        profile: &StudentProfile,
        semantic_active: bool,
    ) -> Self {
        Self {
            config,
            index,
            profile_vector: index.vectorize(&profile.lexical_terms()),
            weights: config.weights.effective(semantic_active),
        }
    }

    pub fn weights(&self) -> EffectiveWeights {
        self.weights
    }

    /// Scores one pair. `embeddings` is the (profile, opportunity) vector pair
    /// when the semantic signal is active for this run.
    pub fn score(
        &self,
        profile: &StudentProfile,
        featurized: &FeaturizedOpportunity,
        raw_text: &str,
        embeddings: Option<(&[f32], &[f32])>,
    ) -> PairScore {
        let opportunity_vector = self.index.vectorize(raw_text);
        let semantic = embeddings.map(|(p, o)| {
            cosine_similarity(p, o)
                .map(|c| c.clamp(0.0, 1.0))
                .unwrap_or(0.0)
        });
        let breakdown = SubScores {
            level: level_score(profile.education_level, featurized.level, self.config),
            field: field_overlap(&profile.fields_of_study, &featurized.fields),
            lexical: cosine(&self.profile_vector, &opportunity_vector),
            semantic,
        };

        let w = &self.weights;
        let total = w.level * breakdown.level
            + w.field * breakdown.field
            + w.lexical * breakdown.lexical
            + w.semantic * breakdown.semantic.unwrap_or(0.0);

        PairScore {
            score: total.clamp(0.0, 1.0),
            explanation: self.explain(profile, featurized, raw_text, &breakdown, &opportunity_vector),
            breakdown,
        }
    }

    fn explain(
        &self,
        profile: &StudentProfile,
        featurized: &FeaturizedOpportunity,
        raw_text: &str,
        s: &SubScores,
        opportunity_vector: &TermVector,
    ) -> Vec<String> {
        let threshold = self.config.explanation_threshold;
        let w = &self.weights;

        // (weighted contribution, signal order, text)
        let mut reasons: Vec<(f64, usize, String)> = Vec::new();

        if s.level >= threshold {
            reasons.push((w.level * s.level, 0, level_reason(profile.education_level, featurized.level, s.level)));
        }
        if s.field >= threshold {
            let shared: Vec<String> = profile
                .fields_of_study
                .intersection(&featurized.fields)
                .map(|f| title_case(f))
                .collect();
            reasons.push((w.field * s.field, 1, format!("field match: {}", shared.join(", "))));
        }
        if s.lexical >= threshold {
            let terms = top_shared_terms(&self.profile_vector, opportunity_vector, SHARED_TERMS_SHOWN);
            reasons.push((
                w.lexical * s.lexical,
                2,
                format!("keyword overlap {:.2}: {}", s.lexical, terms.join(", ")),
            ));
        }
        if let Some(semantic) = s.semantic.filter(|v| *v >= threshold) {
            reasons.push((w.semantic * semantic, 3, format!("semantic similarity {semantic:.2}")));
        }

        reasons.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        let mut explanation: Vec<String> = reasons.into_iter().map(|(_, _, text)| text).collect();

        let haystack = raw_text.to_lowercase();
        let skills: Vec<&str> = profile
            .skills
            .iter()
            .filter(|skill| contains_term(&haystack, skill))
            .take(MATCHING_SKILLS_SHOWN)
            .map(String::as_str)
            .collect();
        if !skills.is_empty() {
            explanation.push(format!("matching skills: {}", skills.join(", ")));
        }
        if featurized.is_untagged() {
            explanation.push("untagged: no field of study listed".to_string());
        }
        if featurized.level == OpportunityLevel::Unknown {
            explanation.push("level not specified".to_string());
        }
        explanation
    }
}

fn level_reason(profile: EducationLevel, target: OpportunityLevel, score: f64) -> String {
    match target.as_education_level() {
        _ if target == OpportunityLevel::Any => "open to all levels".to_string(),
        Some(level) if level == profile => format!("level match: {level}"),
        Some(level) if profile != EducationLevel::Unknown => {
            format!("adjacent level: {profile} vs {level} ({score:.2})")
        }
        _ => format!("level unverified ({score:.2})"),
    }
}

/// Whole-word (or whole-phrase) containment in lower-cased text.
fn contains_term(haystack: &str, term: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric();
    haystack.match_indices(term).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.map_or(false, is_word) && !after.map_or(false, is_word)
    })
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
