//! Matching engine: relevance gate, featurization, hybrid similarity and ranking.
//!
//! Flow for one run: `relevance` → `featurizer` → `tfidf` index over the
//! survivors → optional `embedding` → `similarity` per pair → `ranker`.

pub mod config;
pub mod embedding;
pub mod featurizer;
pub mod handlers;
pub mod ranker;
pub mod relevance;
pub mod similarity;
pub mod tfidf;
