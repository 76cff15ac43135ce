//! Per-run TF-IDF index over unigrams and bigrams.
//!
//! Sparse vectors are `BTreeMap`s so iteration order, and therefore every
//! floating-point sum, is the same from run to run.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::rules::tables::is_stop_word;

pub type TermVector = BTreeMap<String, f64>;

/// Lower-cased word tokens with stop words and single characters removed.
/// `+` and `#` stay inside tokens so `c++` and `c#` survive.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= 2 && !is_stop_word(t))
        .collect()
}

/// Unigrams followed by bigrams of adjacent surviving tokens.
pub fn terms(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let bigrams: Vec<String> = tokens
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect();
    let mut all = tokens;
    all.extend(bigrams);
    all
}

fn term_counts(text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for term in terms(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

/// Smoothed inverse document frequencies for one corpus.
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    idf: BTreeMap<String, f64>,
    documents: usize,
}

impl CorpusIndex {
    /// `idf(t) = ln((1 + n) / (1 + df(t))) + 1`.
    pub fn fit<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        let mut n = 0usize;
        for doc in documents {
            n += 1;
            for term in term_counts(doc).into_keys() {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let idf = df
            .into_iter()
            .map(|(term, df)| {
                let idf = ((1.0 + n as f64) / (1.0 + df as f64)).ln() + 1.0;
                (term, idf)
            })
            .collect();
        Self { idf, documents: n }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    /// L2-normalized TF-IDF vector. Terms outside the fitted vocabulary are dropped.
    pub fn vectorize(&self, text: &str) -> TermVector {
        let mut vector: TermVector = term_counts(text)
            .into_iter()
            .filter_map(|(term, tf)| {
                let idf = *self.idf.get(&term)?;
                Some((term, tf as f64 * idf))
            })
            .collect();

        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for weight in vector.values_mut() {
                *weight /= norm;
            }
        }
        vector
    }
}

/// Cosine of two normalized vectors, clamped to [0, 1].
pub fn cosine(a: &TermVector, b: &TermVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|v| w * v))
        .sum();
    dot.clamp(0.0, 1.0)
}

/// Shared terms with the largest contribution to the cosine, highest first.
pub fn top_shared_terms(a: &TermVector, b: &TermVector, limit: usize) -> Vec<String> {
    let mut shared: Vec<(&String, f64)> = a
        .iter()
        .filter_map(|(term, w)| b.get(term).map(|v| (term, w * v)))
        .collect();
    shared.sort_by(|x, y| {
        y.1.partial_cmp(&x.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| x.0.cmp(y.0))
    });
    shared
        .into_iter()
        .take(limit)
        .map(|(term, _)| term.clone())
        .collect()
}
