use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use super::tables::FIELDS_OF_STUDY;
use super::{ExtractionRule, RuleField, RuleSet, Transform};

/// Field-of-study vocabulary: the built-in table plus configured extensions.
///
/// Built once at configuration load and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct FieldVocabulary {
    rules: RuleSet,
}

impl Default for FieldVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FieldVocabulary {
    pub fn builtin() -> Self {
        Self {
            rules: FIELDS_OF_STUDY.clone(),
        }
    }

    /// Adds `canonical → synonyms` entries. Synonyms are literal terms matched
    /// case-insensitively; the canonical name always matches itself.
    pub fn with_extensions(
        extensions: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, VocabularyError> {
        let mut vocabulary = Self::builtin();
        let field = vocabulary.rules.field().unwrap_or(RuleField::FieldOfStudy);
        for (name, synonyms) in extensions {
            let canonical = name.trim().to_lowercase();
            if canonical.is_empty() {
                return Err(VocabularyError::EmptyTerm(name.clone()));
            }

            let mut terms: BTreeSet<String> = BTreeSet::new();
            terms.insert(canonical.clone());
            for synonym in synonyms {
                let term = synonym.trim().to_lowercase();
                if term.is_empty() {
                    return Err(VocabularyError::EmptyTerm(name.clone()));
                }
                terms.insert(term);
            }

            let alternation = terms
                .iter()
                .map(|t| bounded_literal(t))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = Regex::new(&format!("(?i)(?:{alternation})")).map_err(|e| {
                VocabularyError::Pattern {
                    field: canonical.clone(),
                    message: e.to_string(),
                }
            })?;

            vocabulary.rules.push(ExtractionRule {
                pattern,
                field,
                transform: Transform::Canonical(canonical),
            });
        }
        Ok(vocabulary)
    }

    /// Canonical field names found in the text.
    pub fn fields_in(&self, text: &str) -> BTreeSet<String> {
        self.rules.text_values(text)
    }
}

/// Escaped literal with word boundaries on whichever ends are word characters.
fn bounded_literal(term: &str) -> String {
    let is_word = |c: Option<char>| c.map_or(false, |c| c.is_alphanumeric() || c == '_');
    let lead = if is_word(term.chars().next()) { r"\b" } else { "" };
    let trail = if is_word(term.chars().last()) { r"\b" } else { "" };
    format!("{lead}{}{trail}", regex::escape(term))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VocabularyError {
    #[error("field vocabulary entry '{0}' contains an empty term")]
    EmptyTerm(String),

    #[error("field vocabulary entry '{field}' does not compile: {message}")]
    Pattern { field: String, message: String },
}
