use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::profile::EducationLevel;

/// A document linked from a listing, with its text already extracted by the scraper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub extracted_text: String,
}

/// One scraped listing. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Opportunity {
    /// The explicit id, else the URL, else a slug of the title.
    pub fn effective_id(&self) -> String {
        if !self.id.trim().is_empty() {
            return self.id.trim().to_string();
        }
        if !self.url.trim().is_empty() {
            return self.url.trim().to_string();
        }
        format!("title:{}", slugify(&self.title))
    }

    /// Title, subtitle, description and attachment texts, newline-joined.
    pub fn analysis_text(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.title, &self.subtitle, &self.description];
        parts.extend(self.attachments.iter().map(|a| a.extracted_text.as_str()));
        parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Academic level an opportunity is aimed at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpportunityLevel {
    Bachelor,
    Master,
    PhD,
    Any,
    #[default]
    Unknown,
}

impl OpportunityLevel {
    /// The matching profile level, for the three concrete degrees.
    pub fn as_education_level(self) -> Option<EducationLevel> {
        match self {
            OpportunityLevel::Bachelor => Some(EducationLevel::Bachelor),
            OpportunityLevel::Master => Some(EducationLevel::Master),
            OpportunityLevel::PhD => Some(EducationLevel::PhD),
            OpportunityLevel::Any | OpportunityLevel::Unknown => None,
        }
    }
}

impl From<EducationLevel> for OpportunityLevel {
    fn from(level: EducationLevel) -> Self {
        match level {
            EducationLevel::Bachelor => OpportunityLevel::Bachelor,
            EducationLevel::Master => OpportunityLevel::Master,
            EducationLevel::PhD => OpportunityLevel::PhD,
            EducationLevel::Unknown => OpportunityLevel::Unknown,
        }
    }
}

impl fmt::Display for OpportunityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_education_level() {
            Some(level) => level.fmt(f),
            None if *self == OpportunityLevel::Any => f.write_str("Any"),
            None => f.write_str("Unknown"),
        }
    }
}

/// Application period. At least one bound is set when the window exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Attributes derived from one `Opportunity`. Recomputed, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturizedOpportunity {
    pub opportunity_id: String,
    pub level: OpportunityLevel,
    pub fields: BTreeSet<String>,
    pub duration: Option<String>,
    pub application_window: Option<ApplicationWindow>,
    pub eligibility_keywords: BTreeSet<String>,
}

impl FeaturizedOpportunity {
    /// No field-of-study tag matched. Distinct from a profile with no field.
    pub fn is_untagged(&self) -> bool {
        self.fields.is_empty()
    }
}
