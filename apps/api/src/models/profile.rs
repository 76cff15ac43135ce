use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest degree a student holds or is pursuing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EducationLevel {
    Bachelor,
    Master,
    PhD,
    #[default]
    Unknown,
}

impl EducationLevel {
    /// Rank used when several degrees are found: higher wins.
    pub fn rank(self) -> u8 {
        match self {
            EducationLevel::Unknown => 0,
            EducationLevel::Bachelor => 1,
            EducationLevel::Master => 2,
            EducationLevel::PhD => 3,
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EducationLevel::Bachelor => "Bachelor",
            EducationLevel::Master => "Master",
            EducationLevel::PhD => "PhD",
            EducationLevel::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub duration: Option<String>,
}

/// Structured view of a CV. Every string set is lower-cased; `BTreeSet`
/// keeps serialization order stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub education_level: EducationLevel,
    #[serde(default)]
    pub fields_of_study: BTreeSet<String>,
    #[serde(default)]
    pub languages: BTreeSet<String>,
    #[serde(default)]
    pub experience_entries: Vec<ExperienceEntry>,
}

impl StudentProfile {
    /// Bag of terms fed to the lexical matcher: skills, fields and experience titles.
    pub fn lexical_terms(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        parts.extend(self.skills.iter().map(String::as_str));
        parts.extend(self.fields_of_study.iter().map(String::as_str));
        parts.extend(self.experience_entries.iter().map(|e| e.title.as_str()));
        parts.join(" ")
    }

    /// Short natural-language summary submitted to the embedding backend.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        if self.education_level != EducationLevel::Unknown {
            lines.push(format!("{} student", self.education_level));
        }
        if !self.fields_of_study.is_empty() {
            lines.push(format!("Fields: {}", join_set(&self.fields_of_study)));
        }
        if !self.skills.is_empty() {
            lines.push(format!("Skills: {}", join_set(&self.skills)));
        }
        if !self.experience_entries.is_empty() {
            let titles: Vec<&str> = self
                .experience_entries
                .iter()
                .map(|e| e.title.as_str())
                .collect();
            lines.push(format!("Experience: {}", titles.join("; ")));
        }
        if !self.languages.is_empty() {
            lines.push(format!("Languages: {}", join_set(&self.languages)));
        }
        lines.join("\n")
    }

    /// Restores the lower-case invariant on a profile supplied by a client.
    pub fn normalized(self) -> Self {
        Self {
            skills: lower_set(self.skills),
            fields_of_study: lower_set(self.fields_of_study),
            languages: lower_set(self.languages),
            ..self
        }
    }
}

fn lower_set(set: BTreeSet<String>) -> BTreeSet<String> {
    set.into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
