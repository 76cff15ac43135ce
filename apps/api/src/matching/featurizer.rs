use std::collections::BTreeSet;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::models::opportunity::{
    ApplicationWindow, FeaturizedOpportunity, Opportunity, OpportunityLevel,
};
use crate::models::profile::EducationLevel;
use crate::rules::tables::{
    is_stop_word, month_number, ALL_LEVELS, DEGREE_LEVELS, DURATIONS, ELIGIBILITY_CLAUSE,
    LEVEL_SEPARATOR, MONTH_PATTERN, OPEN_AUDIENCE,
};
use crate::rules::vocabulary::FieldVocabulary;
use crate::rules::RuleHit;

// ────────────────────────────────────────────────────────────────────────────
// Date patterns
// ────────────────────────────────────────────────────────────────────────────

/// One calendar date: ISO, day-first numeric, or textual with an explicit day.
static DATE: Lazy<String> = Lazy::new(|| {
    format!(
        r"\b(?:\d{{4}}-\d{{2}}-\d{{2}}|\d{{1,2}}[/.]\d{{1,2}}[/.]\d{{4}}|{m}\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}|\d{{1,2}}(?:er|st|nd|rd|th)?\s+{m}\.?\s+\d{{4}})\b",
        m = MONTH_PATTERN
    )
});

static DATE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)({date})\s*(?:to|until|through|till|au|à|-|–|—)\s*({date})",
        date = DATE.as_str()
    ))
    .expect("date range pattern must compile")
});

static DEADLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:deadline|date limite|closing date|apply by|apply before|submit by|avant le|jusqu'au)[^\d\n]{{0,30}}?({date})",
        date = DATE.as_str()
    ))
    .expect("deadline pattern must compile")
});

static TEXTUAL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:({m})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})|(\d{{1,2}})(?:er|st|nd|rd|th)?\s+({m})\.?\s+(\d{{4}}))$",
        m = MONTH_PATTERN
    ))
    .expect("textual date pattern must compile")
});

/// Parses one date as matched by [`DATE`]. Impossible dates yield `None`.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    let numeric: Vec<&str> = raw.split(['/', '.']).collect();
    if numeric.len() == 3 && numeric.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        let day = numeric[0].parse().ok()?;
        let month = numeric[1].parse().ok()?;
        let year = numeric[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let caps = TEXTUAL_DATE.captures(raw)?;
    let group = |i: usize| caps.get(i).map(|m| m.as_str());
    let (month, day, year) = match (group(1), group(2), group(3)) {
        (Some(m), Some(d), Some(y)) => (m, d, y),
        _ => (group(5)?, group(4)?, group(6)?),
    };
    NaiveDate::from_ymd_opt(year.parse().ok()?, month_number(month)?, day.parse().ok()?)
}

fn captured_date(caps: &Captures<'_>, index: usize) -> Option<NaiveDate> {
    caps.get(index).and_then(|m| parse_date(m.as_str()))
}

// ────────────────────────────────────────────────────────────────────────────
// Feature extraction
// ────────────────────────────────────────────────────────────────────────────

/// Derives matching attributes from raw listings.
pub struct OpportunityFeaturizer<'a> {
    vocabulary: &'a FieldVocabulary,
}

impl<'a> OpportunityFeaturizer<'a> {
    pub fn new(vocabulary: &'a FieldVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn featurize(&self, opportunity: &Opportunity) -> FeaturizedOpportunity {
        let text = opportunity.analysis_text();
        let featurized = FeaturizedOpportunity {
            opportunity_id: opportunity.effective_id(),
            level: detect_level(&text),
            fields: self.vocabulary.fields_in(&text),
            duration: extract_duration(&text),
            application_window: extract_application_window(&text),
            eligibility_keywords: extract_eligibility_keywords(&text),
        };
        debug!(
            id = %featurized.opportunity_id,
            level = %featurized.level,
            fields = featurized.fields.len(),
            "Featurized opportunity"
        );
        featurized
    }
}

/// Target level of a listing.
///
/// Explicit "all levels" wording or an enumeration of distinct degrees
/// ("Licence ou Master") gives `Any`; otherwise the most specific degree
/// mentioned wins. Audience wording like "all students" gives `Any` only
/// when no degree is named.
pub fn detect_level(text: &str) -> OpportunityLevel {
    if ALL_LEVELS.is_match(text) {
        return OpportunityLevel::Any;
    }

    let mut hits: Vec<RuleHit> = Vec::new();
    for hit in DEGREE_LEVELS.hits(text) {
        if hits.last().map_or(true, |prev| hit.start >= prev.end) {
            hits.push(hit);
        }
    }

    let levels: BTreeSet<EducationLevel> = hits.iter().filter_map(RuleHit::level).collect();
    let Some(highest) = levels.iter().copied().max_by_key(|l| l.rank()) else {
        return if OPEN_AUDIENCE.is_match(text) {
            OpportunityLevel::Any
        } else {
            OpportunityLevel::Unknown
        };
    };
    if levels.len() == 1 {
        return highest.into();
    }

    let enumerated = hits.windows(2).any(|pair| {
        pair[0].level() != pair[1].level()
            && LEVEL_SEPARATOR.is_match(&text[pair[0].end..pair[1].start])
    });
    if enumerated {
        OpportunityLevel::Any
    } else {
        highest.into()
    }
}

/// First duration mention, most explicit pattern first.
pub fn extract_duration(text: &str) -> Option<String> {
    DURATIONS
        .first_match(text)
        .and_then(|hit| hit.text().map(str::to_string))
}

/// Application period: the first well-ordered date range, else a deadline.
pub fn extract_application_window(text: &str) -> Option<ApplicationWindow> {
    for caps in DATE_RANGE.captures_iter(text) {
        let (Some(start), Some(end)) = (captured_date(&caps, 1), captured_date(&caps, 2)) else {
            continue;
        };
        if start <= end {
            return Some(ApplicationWindow {
                start: Some(start),
                end: Some(end),
            });
        }
        debug!(%start, %end, "Skipping inverted date range");
    }

    DEADLINE
        .captures_iter(text)
        .find_map(|caps| captured_date(&caps, 1))
        .map(|end| ApplicationWindow {
            start: None,
            end: Some(end),
        })
}

/// Content words of every clause introduced by an eligibility phrase.
pub fn extract_eligibility_keywords(text: &str) -> BTreeSet<String> {
    ELIGIBILITY_CLAUSE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .flat_map(|clause| {
            clause
                .as_str()
                .split(|c: char| !c.is_alphabetic())
                .map(str::to_lowercase)
                .filter(|w| w.chars().count() >= 3 && !is_stop_word(w))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LISTING: &str = "Summer Research Internship\n\
        Open to bachelor, master and PhD students in Computer Science or Mathematics.\n\
        Duration: 3 months.\n\
        Applications accepted from March 1, 2025 to April 30, 2025.\n\
        Candidates must have strong Python skills.";

    fn make_opportunity(title: &str, description: &str) -> Opportunity {
        Opportunity {
            title: title.to_string(),
            description: description.to_string(),
            url: "https://example.org/listing".to_string(),
            ..Opportunity::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_featurize_sample_listing() {
        let vocab = FieldVocabulary::builtin();
        let opp = make_opportunity("Summer Research Internship", SAMPLE_LISTING);
        let f = OpportunityFeaturizer::new(&vocab).featurize(&opp);

        assert_eq!(f.opportunity_id, "https://example.org/listing");
        assert_eq!(f.level, OpportunityLevel::Any);
        assert!(f.fields.contains("computer science"));
        assert!(f.fields.contains("mathematics"));
        assert_eq!(f.duration.as_deref(), Some("Duration: 3 months"));
        assert_eq!(
            f.application_window,
            Some(ApplicationWindow {
                start: date(2025, 3, 1),
                end: date(2025, 4, 30),
            })
        );
        assert!(f.eligibility_keywords.contains("python"));
        assert!(f.eligibility_keywords.contains("strong"));
    }

    #[test]
    fn test_featurize_is_idempotent() {
        let vocab = FieldVocabulary::builtin();
        let featurizer = OpportunityFeaturizer::new(&vocab);
        let opp = make_opportunity("Bourse de Master", "Date limite : 15/03/2025. Droit et économie.");
        assert_eq!(featurizer.featurize(&opp), featurizer.featurize(&opp));
    }

    #[test]
    fn test_level_unknown_without_degree_words() {
        assert_eq!(detect_level("Summer school on climate policy"), OpportunityLevel::Unknown);
    }

    #[test]
    fn test_level_single_mention() {
        assert_eq!(detect_level("Fully funded PhD position"), OpportunityLevel::PhD);
        assert_eq!(detect_level("Bourse pour étudiants en Licence"), OpportunityLevel::Bachelor);
    }

    #[test]
    fn test_level_all_levels_phrase() {
        assert_eq!(detect_level("Ouvert à tous niveaux"), OpportunityLevel::Any);
        assert_eq!(detect_level("Open to all students"), OpportunityLevel::Any);
    }

    #[test]
    fn test_level_audience_wording_keeps_named_degree() {
        assert_eq!(
            detect_level("Scholarship open to all Master students in computer science."),
            OpportunityLevel::Master
        );
        assert_eq!(
            detect_level("Fellowship for all students enrolled in a PhD programme."),
            OpportunityLevel::PhD
        );
    }

    #[test]
    fn test_level_enumeration_is_any() {
        assert_eq!(detect_level("Candidats en Licence ou Master"), OpportunityLevel::Any);
        assert_eq!(detect_level("for bachelor/master students"), OpportunityLevel::Any);
    }

    #[test]
    fn test_level_scattered_mentions_pick_most_specific() {
        let text = "Doctoral fellowship in biology. Applicants must hold a Master degree.";
        assert_eq!(detect_level(text), OpportunityLevel::PhD);
    }

    #[test]
    fn test_duration_patterns() {
        assert_eq!(extract_duration("A 6 month internship").as_deref(), Some("6 month"));
        assert_eq!(extract_duration("Stage de 12 semaines").as_deref(), Some("12 semaines"));
        assert_eq!(extract_duration("Programme of 2 years, 4 weeks of holidays").as_deref(), Some("4 weeks"));
        assert_eq!(extract_duration("No length given"), None);
    }

    #[test]
    fn test_window_iso_range() {
        let w = extract_application_window("Applications: 2024-09-01 to 2024-12-31").unwrap();
        assert_eq!(w.start, date(2024, 9, 1));
        assert_eq!(w.end, date(2024, 12, 31));
    }

    #[test]
    fn test_window_french_textual_range() {
        let w = extract_application_window("Candidatures du 1er mars 2025 au 30 avril 2025").unwrap();
        assert_eq!(w.start, date(2025, 3, 1));
        assert_eq!(w.end, date(2025, 4, 30));
    }

    #[test]
    fn test_window_deadline_is_end_only() {
        let w = extract_application_window("Deadline: 15/03/2025").unwrap();
        assert_eq!(w.start, None);
        assert_eq!(w.end, date(2025, 3, 15));
    }

    #[test]
    fn test_window_impossible_date_not_invented() {
        assert_eq!(extract_application_window("Deadline: 31/02/2025"), None);
    }

    #[test]
    fn test_window_inverted_range_skipped() {
        assert_eq!(
            extract_application_window("Open 2025-05-01 to 2025-01-01"),
            None
        );
    }

    #[test]
    fn test_window_absent() {
        assert_eq!(extract_application_window("Apply whenever you like."), None);
    }

    #[test]
    fn test_eligibility_keywords() {
        let text = "Candidates must be enrolled in a Master programme; eligibility: GPA 3.5 minimum";
        let kws = extract_eligibility_keywords(text);
        for expected in ["enrolled", "master", "programme", "gpa"] {
            assert!(kws.contains(expected), "missing {expected} in {kws:?}");
        }
        assert!(!kws.contains("in"));
        assert!(!kws.contains("a"));
    }

    #[test]
    fn test_eligibility_french_phrase() {
        let kws = extract_eligibility_keywords("Le candidat doit avoir la nationalité marocaine.");
        assert!(kws.contains("nationalité"));
        assert!(kws.contains("marocaine"));
        assert!(!kws.contains("la"));
    }
}
