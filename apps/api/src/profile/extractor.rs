use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::profile::{EducationLevel, ExperienceEntry, StudentProfile};
use crate::rules::tables::{
    DEGREE_LEVELS, DURATIONS, JOB_TITLES, KNOWN_SKILLS, LANGUAGES, MONTH_PATTERN,
    SECTION_HEADINGS,
};
use crate::rules::vocabulary::FieldVocabulary;

const MAX_HEADING_WORDS: usize = 5;
const MAX_EXPERIENCE_ENTRIES: usize = 10;
const MAX_SKILL_CHARS: usize = 40;
const MIN_SKILL_CHARS: usize = 2;
const MAX_SKILL_WORDS: usize = 4;

const BULLETS: &[char] = &['•', '-', '*', '·', '▪', '◦', '‣', '►'];
const SKILL_SEPARATORS: &[char] = &[',', ';', '|', '•', '·', '▪', '\n'];
const TITLE_TRIM: &[char] = &[',', ';', '|', '-', '–', '—', ':', '(', ')', '[', ']'];

/// Employment period on a CV line: `2021 - 2023`, `Jan 2022 – Present`, `09/2021 - 06/2022`.
static CV_DATE_RANGE: Lazy<Regex> = Lazy::new(|| {
    let point = format!(r"(?:{MONTH_PATTERN}\.?\s+\d{{4}}|\d{{1,2}}/\d{{4}}|\d{{4}})");
    Regex::new(&format!(
        r"(?i)\b{point}\s*(?:-|–|—|to|à|au)\s*(?:{point}|present|current|now|today|présent|aujourd'hui|ce jour|en cours)\b"
    ))
    .expect("CV date range pattern must compile")
});

/// Builds a `StudentProfile` from raw CV text.
pub struct ProfileExtractor<'a> {
    vocabulary: &'a FieldVocabulary,
}

impl<'a> ProfileExtractor<'a> {
    pub fn new(vocabulary: &'a FieldVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Never fails: absent signals leave `Unknown` or empty fields.
    pub fn extract(&self, cv_text: &str) -> StudentProfile {
        let sections = segment_sections(cv_text);
        let education = sections.get("education").map(String::as_str).unwrap_or(cv_text);
        let languages = sections.get("languages").map(String::as_str).unwrap_or(cv_text);

        let profile = StudentProfile {
            skills: extract_skills(sections.get("skills").map(String::as_str), cv_text),
            education_level: highest_level(education),
            fields_of_study: self.vocabulary.fields_in(education),
            languages: LANGUAGES.text_values(languages),
            experience_entries: extract_experience(
                sections.get("experience").map(String::as_str),
                &preamble(cv_text),
            ),
        };

        debug!(
            sections = ?sections.keys().collect::<Vec<_>>(),
            level = %profile.education_level,
            skills = profile.skills.len(),
            fields = profile.fields_of_study.len(),
            experience = profile.experience_entries.len(),
            "Extracted profile"
        );
        profile
    }
}

/// Splits CV text into canonical sections. Lines before the first heading
/// belong to no section.
fn segment_sections(text: &str) -> BTreeMap<String, String> {
    let mut sections: BTreeMap<String, String> = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        if let Some((name, rest)) = parse_heading(line) {
            let body = sections.entry(name.clone()).or_default();
            if !rest.is_empty() {
                body.push_str(rest);
                body.push('\n');
            }
            current = Some(name);
            continue;
        }
        if let Some(name) = &current {
            let body = sections.entry(name.clone()).or_default();
            body.push_str(line);
            body.push('\n');
        }
    }
    sections
}

/// Lines before the first heading: the only text outside every detected section.
fn preamble(text: &str) -> String {
    text.lines()
        .take_while(|line| parse_heading(line).is_none())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `Some((section, text after the colon))` when the line is a heading.
fn parse_heading(line: &str) -> Option<(String, &str)> {
    let (head, rest) = match line.split_once(':') {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let words = head.split_whitespace().count();
    if words == 0 || words > MAX_HEADING_WORDS {
        return None;
    }
    let hit = SECTION_HEADINGS.first_match(head)?;
    hit.text().map(|name| (name.to_string(), rest))
}

fn highest_level(text: &str) -> EducationLevel {
    DEGREE_LEVELS
        .levels(text)
        .into_iter()
        .max_by_key(|level| level.rank())
        .unwrap_or_default()
}

fn is_bullet(line: &str) -> bool {
    line.trim_start().starts_with(BULLETS)
}

fn extract_skills(section: Option<&str>, whole_text: &str) -> BTreeSet<String> {
    let mut skills = KNOWN_SKILLS.text_values(whole_text);
    let Some(section) = section else {
        return skills;
    };

    for line in section.lines() {
        let line = line.trim_start().trim_start_matches(BULLETS);
        // "Programming: Python, SQL" → "Python, SQL"
        let items = line.split_once(':').map_or(line, |(_, rest)| rest);
        for token in items.split(SKILL_SEPARATORS) {
            let token = token.trim().trim_end_matches('.').trim().to_lowercase();
            let chars = token.chars().count();
            if (MIN_SKILL_CHARS..=MAX_SKILL_CHARS).contains(&chars)
                && token.split_whitespace().count() <= MAX_SKILL_WORDS
            {
                skills.insert(token);
            }
        }
    }
    skills
}

/// Dated or job-title lines of the experience section. Without one, only
/// job-title lines outside every other section are kept.
fn extract_experience(section: Option<&str>, unsectioned: &str) -> Vec<ExperienceEntry> {
    let titles_only = section.is_none();
    let mut entries: Vec<ExperienceEntry> = Vec::new();

    for line in section.unwrap_or(unsectioned).lines() {
        if entries.len() >= MAX_EXPERIENCE_ENTRIES {
            break;
        }
        let line = line.trim();
        if line.is_empty() || is_bullet(line) {
            continue;
        }
        let is_job_title = JOB_TITLES.first_match(line).is_some();
        if titles_only && !is_job_title {
            continue;
        }

        let period = CV_DATE_RANGE
            .find(line)
            .map(|m| (m.start(), m.end()))
            .or_else(|| DURATIONS.first_match(line).map(|hit| (hit.start, hit.end)));

        match period {
            Some((start, end)) => {
                let duration = line[start..end].trim().to_string();
                let title = format!("{} {}", &line[..start], &line[end..]);
                let title = title.trim_matches(|c: char| c.is_whitespace() || TITLE_TRIM.contains(&c));

                if !title.is_empty() {
                    entries.push(ExperienceEntry {
                        title: title.to_string(),
                        duration: Some(duration),
                    });
                } else if let Some(last) = entries.last_mut().filter(|e| e.duration.is_none()) {
                    // a bare date line completes the title line above it
                    last.duration = Some(duration);
                }
            }
            None if is_job_title => {
                entries.push(ExperienceEntry {
                    title: line.trim_matches(TITLE_TRIM).trim().to_string(),
                    duration: None,
                });
            }
            None => {}
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGLISH_CV: &str = "Jane Doe
jane@example.com

EDUCATION
Master of Science in Computer Science, Université de Lyon (2022 - 2024)
Bachelor in Mathematics

EXPERIENCE
Data Science Intern, Acme Corp | Jan 2023 – Present
- Built ML pipelines in Python
Software Developer
2020 - 2022

SKILLS
Programming: Python, SQL, Rust
Tools: Docker | Git
Machine learning; data visualisation

LANGUAGES
English (fluent), Français (natif)
";

    const FRENCH_CV: &str = "FORMATION
Licence en Informatique - Université Mohammed V
COMPÉTENCES : Java, Spring, MySQL
LANGUES
Arabe, Français, Anglais
STAGES
Stagiaire développeur web, 3 mois
";

    fn extract(text: &str) -> StudentProfile {
        let vocab = FieldVocabulary::builtin();
        ProfileExtractor::new(&vocab).extract(text)
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_english_cv_education() {
        let p = extract(ENGLISH_CV);
        assert_eq!(p.education_level, EducationLevel::Master);
        assert_eq!(p.fields_of_study, set(&["computer science", "mathematics"]));
    }

    #[test]
    fn test_english_cv_skills() {
        let p = extract(ENGLISH_CV);
        for skill in ["python", "sql", "rust", "docker", "git", "machine learning", "data visualisation"] {
            assert!(p.skills.contains(skill), "missing {skill} in {:?}", p.skills);
        }
        assert!(!p.skills.contains("programming: python"));
        assert!(p.skills.iter().all(|s| s == &s.to_lowercase()));
    }

    #[test]
    fn test_english_cv_experience() {
        let p = extract(ENGLISH_CV);
        assert_eq!(
            p.experience_entries,
            vec![
                ExperienceEntry {
                    title: "Data Science Intern, Acme Corp".to_string(),
                    duration: Some("Jan 2023 – Present".to_string()),
                },
                ExperienceEntry {
                    title: "Software Developer".to_string(),
                    duration: Some("2020 - 2022".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_english_cv_languages() {
        let p = extract(ENGLISH_CV);
        assert_eq!(p.languages, set(&["english", "french"]));
    }

    #[test]
    fn test_french_cv() {
        let p = extract(FRENCH_CV);
        assert_eq!(p.education_level, EducationLevel::Bachelor);
        assert!(p.fields_of_study.contains("computer science"));
        assert!(p.skills.is_superset(&set(&["java", "spring", "mysql"])));
        assert_eq!(p.languages, set(&["arabic", "english", "french"]));
        assert_eq!(p.experience_entries.len(), 1);
        assert_eq!(p.experience_entries[0].title, "Stagiaire développeur web");
        assert_eq!(p.experience_entries[0].duration.as_deref(), Some("3 mois"));
    }

    #[test]
    fn test_language_skills_heading_is_not_skills() {
        let cv = "COMPÉTENCES TECHNIQUES\nPython, Django\nCOMPÉTENCES LINGUISTIQUES\nAnglais (courant), Arabe (natif)";
        let p = extract(cv);
        assert_eq!(p.languages, set(&["arabic", "english"]));
        assert!(p.skills.contains("python"));
        assert!(!p.skills.contains("anglais (courant)"), "got {:?}", p.skills);
        assert!(!p.skills.contains("arabe (natif)"));
        assert_eq!(parse_heading("Language skills").map(|(name, _)| name).as_deref(), Some("languages"));
    }

    #[test]
    fn test_without_sections_whole_text_is_scanned() {
        let p = extract("I am a PhD candidate in physics and speak German.\nResearch Assistant at CERN");
        assert_eq!(p.education_level, EducationLevel::PhD);
        assert_eq!(p.fields_of_study, set(&["physics"]));
        assert_eq!(p.languages, set(&["german"]));
        assert_eq!(p.experience_entries.len(), 1);
        assert_eq!(p.experience_entries[0].title, "Research Assistant at CERN");
        assert_eq!(p.experience_entries[0].duration, None);
    }

    #[test]
    fn test_dated_education_lines_are_not_experience() {
        let cv = "EDUCATION\nMaster in Computer Science (2022 - 2024)\nBachelor in Mathematics, 2019 - 2022\nSKILLS\nPython";
        let p = extract(cv);
        assert_eq!(p.education_level, EducationLevel::Master);
        assert!(p.experience_entries.is_empty(), "got {:?}", p.experience_entries);
    }

    #[test]
    fn test_job_title_fallback_keeps_same_line_period() {
        let cv = "Research Assistant, 2021 - 2023\nEDUCATION\nSoftware Engineer degree, 2018 - 2021";
        let p = extract(cv);
        assert_eq!(
            p.experience_entries,
            vec![ExperienceEntry {
                title: "Research Assistant".to_string(),
                duration: Some("2021 - 2023".to_string()),
            }]
        );
    }

    #[test]
    fn test_education_section_limits_level_scan() {
        // the PhD mention outside the education section must not raise the level
        let cv = "EDUCATION\nBachelor of Arts\n\nEXPERIENCE\nAssistant to PhD researchers";
        assert_eq!(extract(cv).education_level, EducationLevel::Bachelor);
    }

    #[test]
    fn test_empty_cv_gives_empty_profile() {
        assert_eq!(extract(""), StudentProfile::default());
        let p = extract("Nothing useful here.");
        assert_eq!(p.education_level, EducationLevel::Unknown);
        assert!(p.skills.is_empty());
        assert!(p.experience_entries.is_empty());
    }

    #[test]
    fn test_skill_tokens_filtered_by_length_and_words() {
        let cv = "Skills\nC, Python, a very long description of many things I can do, ".to_string()
            + &"x".repeat(41);
        let p = extract(&cv);
        assert!(p.skills.contains("python"));
        assert!(!p.skills.contains("c"));
        assert!(p.skills.iter().all(|s| s.chars().count() <= 40));
        assert!(p.skills.iter().all(|s| s.split_whitespace().count() <= 4));
    }

    #[test]
    fn test_experience_capped() {
        let mut cv = String::from("Experience\n");
        for i in 0..15 {
            cv.push_str(&format!("Analyst {i}, 2010 - 2011\n"));
        }
        assert_eq!(extract(&cv).experience_entries.len(), MAX_EXPERIENCE_ENTRIES);
    }

    #[test]
    fn test_heading_with_inline_content() {
        let sections = segment_sections("Skills: Python, SQL\nLanguages: English");
        assert_eq!(sections.get("skills").map(String::as_str), Some("Python, SQL\n"));
        assert_eq!(sections.get("languages").map(String::as_str), Some("English\n"));
    }

    #[test]
    fn test_long_line_is_not_a_heading() {
        assert!(parse_heading("Experience with distributed systems and cloud platforms").is_none());
        assert!(parse_heading("Work Experience").is_some());
    }
}
