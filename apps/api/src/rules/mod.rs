//! Table-driven extraction rules.
//!
//! Every keyword or pattern heuristic used by the profile extractor and the
//! opportunity featurizer is an ordered list of `ExtractionRule`s
//! (`pattern → field → transform`). Tables live in [`tables`] and are compiled
//! once per process; adding a synonym never touches control flow.

pub mod tables;
pub mod vocabulary;

use std::collections::BTreeSet;

use regex::Regex;

use crate::models::profile::EducationLevel;

/// What a rule extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    SectionHeading,
    EducationLevel,
    FieldOfStudy,
    Language,
    Skill,
    JobTitle,
    Duration,
}

/// How a match is turned into a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Emit a fixed canonical name regardless of the matched spelling.
    Canonical(String),
    /// Emit a degree level.
    Level(EducationLevel),
    /// Emit the matched text, trimmed.
    Verbatim,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Text(String),
    Level(EducationLevel),
}

#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub pattern: Regex,
    pub field: RuleField,
    pub transform: Transform,
}

/// One rule firing on a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHit {
    pub value: RuleValue,
    pub start: usize,
    pub end: usize,
}

impl RuleHit {
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            RuleValue::Text(s) => Some(s),
            RuleValue::Level(_) => None,
        }
    }

    pub fn level(&self) -> Option<EducationLevel> {
        match self.value {
            RuleValue::Level(level) => Some(level),
            RuleValue::Text(_) => None,
        }
    }
}

/// An ordered list of rules applied together.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ExtractionRule>,
}

impl RuleSet {
    /// Compiles `(pattern, transform)` pairs into case-insensitive rules for one field.
    pub fn compile(field: RuleField, specs: &[(&str, Transform)]) -> Result<Self, regex::Error> {
        let rules = specs
            .iter()
            .map(|(pattern, transform)| {
                Ok(ExtractionRule {
                    pattern: Regex::new(&format!("(?i){pattern}"))?,
                    field,
                    transform: transform.clone(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// What the rules of this set extract; `None` for an empty set.
    pub fn field(&self) -> Option<RuleField> {
        self.rules.first().map(|rule| rule.field)
    }

    pub fn push(&mut self, rule: ExtractionRule) {
        self.rules.push(rule);
    }

    /// Every match of every rule, in text order (rule order breaks ties).
    pub fn hits(&self, text: &str) -> Vec<RuleHit> {
        let mut hits: Vec<RuleHit> = self
            .rules
            .iter()
            .flat_map(|rule| {
                rule.pattern.find_iter(text).map(move |m| RuleHit {
                    value: apply_transform(&rule.transform, m.as_str()),
                    start: m.start(),
                    end: m.end(),
                })
            })
            .collect();
        // sort_by_key is stable: equal positions keep rule order
        hits.sort_by_key(|h| h.start);
        hits
    }

    /// First rule (in table order) that matches anywhere in the text.
    pub fn first_match(&self, text: &str) -> Option<RuleHit> {
        self.rules.iter().find_map(|rule| {
            rule.pattern.find(text).map(|m| RuleHit {
                value: apply_transform(&rule.transform, m.as_str()),
                start: m.start(),
                end: m.end(),
            })
        })
    }

    /// Distinct text values produced over the whole text.
    pub fn text_values(&self, text: &str) -> BTreeSet<String> {
        self.hits(text)
            .into_iter()
            .filter_map(|hit| match hit.value {
                RuleValue::Text(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Distinct levels produced over the whole text.
    pub fn levels(&self, text: &str) -> BTreeSet<EducationLevel> {
        self.hits(text).iter().filter_map(RuleHit::level).collect()
    }
}

fn apply_transform(transform: &Transform, matched: &str) -> RuleValue {
    match transform {
        Transform::Canonical(name) => RuleValue::Text(name.clone()),
        Transform::Level(level) => RuleValue::Level(*level),
        Transform::Verbatim => RuleValue::Text(matched.trim().to_string()),
    }
}
