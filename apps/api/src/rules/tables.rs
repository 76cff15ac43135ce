//! Built-in lookup tables. Compiled once, immutable for the life of the process.
//!
//! English and French spellings sit side by side: the catalog is scraped from
//! francophone university sites while CVs come in either language.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{RuleField, RuleSet, Transform};
use crate::models::profile::EducationLevel;

fn compile(field: RuleField, specs: &[(&str, Transform)]) -> RuleSet {
    RuleSet::compile(field, specs).expect("built-in rule table must compile")
}

fn canonical(name: &str) -> Transform {
    Transform::Canonical(name.to_string())
}

/// CV section headings. Anchored at line start; the extractor checks line length.
pub static SECTION_HEADINGS: Lazy<RuleSet> = Lazy::new(|| {
    compile(
        RuleField::SectionHeading,
        &[
            (
                r"^\s*(?:education|academic background|academic history|formation|études|etudes|diplômes|diplomes|parcours académique)\b",
                canonical("education"),
            ),
            (
                r"^\s*(?:(?:professional |work )?experiences?|expériences?(?: professionnelles?)?|work history|employment|internships|stages)\b",
                canonical("experience"),
            ),
            // before skills: "Compétences linguistiques" is a languages heading
            (
                r"^\s*(?:languages|langues|spoken languages|language skills|compétences linguistiques|competences linguistiques)\b",
                canonical("languages"),
            ),
            (
                r"^\s*(?:(?:technical |core |key )?skills|compétences(?: techniques)?|competences|technologies)\b",
                canonical("skills"),
            ),
            (
                r"^\s*(?:projects|projets|certifications?|publications|awards|interests|centres d'intérêt|hobbies|references|références)\b",
                canonical("other"),
            ),
        ],
    )
});

/// Degree keywords. Shared by the CV extractor and the opportunity featurizer.
pub static DEGREE_LEVELS: Lazy<RuleSet> = Lazy::new(|| {
    compile(
        RuleField::EducationLevel,
        &[
            (
                r"\b(?:ph\.?\s?d|doctorat|doctorate|doctoral|bac\s?\+\s?8|third cycle)\b",
                Transform::Level(EducationLevel::PhD),
            ),
            (
                r"\b(?:master(?:'s)?|mastère|msc|m\.sc|mba|postgraduate|graduate|m1|m2|bac\s?\+\s?5|diplôme d'ingénieur|cycle ingénieur|engineering degree)\b",
                Transform::Level(EducationLevel::Master),
            ),
            (
                r"\b(?:bachelor(?:'s)?|licence|bsc|b\.sc|undergraduate|first degree|l3|bac\s?\+\s?3)\b",
                Transform::Level(EducationLevel::Bachelor),
            ),
        ],
    )
});

/// Phrases that open an opportunity to every academic level.
pub static ALL_LEVELS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:all levels|any level|all academic levels|all degree levels|tous (?:les )?niveaux)\b")
        .expect("built-in all-levels pattern must compile")
});

/// Audience wording ("all students") that only means every level when no degree is named.
pub static OPEN_AUDIENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:all students|open to all|tous les étudiants)\b")
        .expect("built-in open-audience pattern must compile")
});

/// Text allowed between two degree names for them to count as one enumeration.
pub static LEVEL_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:,|/|&|\+|and|or|et|ou|,\s*(?:and|or|et|ou))\s*(?:(?:a|an|the|en)\s+)?$")
        .expect("built-in separator pattern must compile")
});

/// Built-in field-of-study vocabulary: `(canonical name, pattern)`.
pub const FIELD_VOCABULARY: &[(&str, &str)] = &[
    ("engineering", r"\b(?:engineering|ingénierie|génie)\b"),
    ("computer science", r"\b(?:computer science|informatique|computing)\b"),
    ("medicine", r"\b(?:medicine|médecine|medical school)\b"),
    ("business", r"\b(?:business|commerce)\b"),
    ("management", r"\b(?:management|gestion)\b"),
    ("economics", r"\b(?:economics|économie|economie)\b"),
    ("law", r"\b(?:law|droit|legal studies)\b"),
    ("mathematics", r"\b(?:mathematics|mathématiques|mathematiques|maths?)\b"),
    ("physics", r"\b(?:physics|physique)\b"),
    ("chemistry", r"\b(?:chemistry|chimie)\b"),
    ("biology", r"\b(?:biology|biologie|life sciences)\b"),
    ("architecture", r"\b(?:architecture)\b"),
    ("arts", r"\b(?:fine arts|beaux-arts|arts)\b"),
    ("humanities", r"\b(?:humanities|sciences humaines|lettres)\b"),
    ("social sciences", r"\b(?:social sciences|sciences sociales)\b"),
    ("psychology", r"\b(?:psychology|psychologie)\b"),
    ("education", r"\b(?:education sciences|sciences de l'éducation|pedagogy|pédagogie|teacher training)\b"),
    ("environmental science", r"\b(?:environmental|environnement|environment)\b"),
    ("agriculture", r"\b(?:agriculture|agronomy|agronomie)\b"),
    ("data science", r"\b(?:data science|science des données)\b"),
    ("artificial intelligence", r"\b(?:artificial intelligence|intelligence artificielle)\b"),
    ("cybersecurity", r"\b(?:cyber\s?security|cybersécurité|information security)\b"),
    ("finance", r"\b(?:finance)\b"),
    ("accounting", r"\b(?:accounting|comptabilité)\b"),
    ("marketing", r"\b(?:marketing)\b"),
    ("communication", r"\b(?:communications?)\b"),
    ("journalism", r"\b(?:journalism|journalisme)\b"),
    ("nursing", r"\b(?:nursing|soins infirmiers)\b"),
    ("pharmacy", r"\b(?:pharmacy|pharmacie)\b"),
];

pub static FIELDS_OF_STUDY: Lazy<RuleSet> = Lazy::new(|| {
    let specs: Vec<(&str, Transform)> = FIELD_VOCABULARY
        .iter()
        .map(|(name, pattern)| (*pattern, canonical(name)))
        .collect();
    compile(RuleField::FieldOfStudy, &specs)
});

pub static LANGUAGES: Lazy<RuleSet> = Lazy::new(|| {
    compile(
        RuleField::Language,
        &[
            (r"\b(?:english|anglais|inglés)\b", canonical("english")),
            (r"\b(?:french|français|francais)\b", canonical("french")),
            (r"\b(?:spanish|espagnol|español)\b", canonical("spanish")),
            (r"\b(?:german|allemand|deutsch)\b", canonical("german")),
            (r"\b(?:arabic|arabe)\b", canonical("arabic")),
            (r"\b(?:italian|italien|italiano)\b", canonical("italian")),
            (r"\b(?:chinese|mandarin|chinois)\b", canonical("chinese")),
            (r"\b(?:portuguese|portugais|português)\b", canonical("portuguese")),
            (r"\b(?:japanese|japonais)\b", canonical("japanese")),
            (r"\b(?:russian|russe)\b", canonical("russian")),
            (r"\b(?:turkish|turc)\b", canonical("turkish")),
            (r"\b(?:dutch|néerlandais)\b", canonical("dutch")),
        ],
    )
});

/// Known technologies, recognised anywhere in a CV.
pub static KNOWN_SKILLS: Lazy<RuleSet> = Lazy::new(|| {
    compile(
        RuleField::Skill,
        &[
            (r"\bpython\b", canonical("python")),
            (r"\bjava\b", canonical("java")),
            (r"\bc\+\+", canonical("c++")),
            (r"\bjavascript\b", canonical("javascript")),
            (r"\btypescript\b", canonical("typescript")),
            (r"\brust\b", canonical("rust")),
            (r"\breact\b", canonical("react")),
            (r"\bnode\.?js\b", canonical("node.js")),
            (r"\bdjango\b", canonical("django")),
            (r"\bflask\b", canonical("flask")),
            (r"\bmachine learning\b", canonical("machine learning")),
            (r"\bdeep learning\b", canonical("deep learning")),
            (r"\bdata science\b", canonical("data science")),
            (r"\bbig data\b", canonical("big data")),
            (r"\bsql\b", canonical("sql")),
            (r"\bmongodb\b", canonical("mongodb")),
            (r"\bpostgre(?:s|sql)\b", canonical("postgresql")),
            (r"\bmysql\b", canonical("mysql")),
            (r"\bnosql\b", canonical("nosql")),
            (r"\baws\b", canonical("aws")),
            (r"\bazure\b", canonical("azure")),
            (r"\bgcp\b", canonical("gcp")),
            (r"\bdocker\b", canonical("docker")),
            (r"\bkubernetes\b", canonical("kubernetes")),
            (r"\bgit\b", canonical("git")),
            (r"\btensorflow\b", canonical("tensorflow")),
            (r"\bpytorch\b", canonical("pytorch")),
            (r"\bscikit-learn\b", canonical("scikit-learn")),
            (r"\bpandas\b", canonical("pandas")),
            (r"\bnumpy\b", canonical("numpy")),
            (r"\bmatlab\b", canonical("matlab")),
            (r"\bhtml\b", canonical("html")),
            (r"\bcss\b", canonical("css")),
            (r"\brest (?:api|apis)\b", canonical("rest api")),
            (r"\bgraphql\b", canonical("graphql")),
            (r"\bmicroservices\b", canonical("microservices")),
        ],
    )
});

/// Role nouns that mark a line as an experience entry.
pub static JOB_TITLES: Lazy<RuleSet> = Lazy::new(|| {
    compile(
        RuleField::JobTitle,
        &[
            (
                r"\b(?:developer|développeur|engineer|ingénieur|scientist|analyst|manager|consultant|researcher|assistant)\b",
                Transform::Verbatim,
            ),
            (r"\b(?:intern|internship|stage|stagiaire|trainee)\b", Transform::Verbatim),
        ],
    )
});

/// Length-of-programme patterns, most explicit first.
pub static DURATIONS: Lazy<RuleSet> = Lazy::new(|| {
    compile(
        RuleField::Duration,
        &[
            (r"\b(?:duration|durée)\s*:\s*[^\n.;]{1,100}", Transform::Verbatim),
            (r"\b\d+\s*(?:months?|mois)\b", Transform::Verbatim),
            (r"\b\d+\s*(?:weeks?|semaines?)\b", Transform::Verbatim),
            (r"\b\d+\s*(?:years?|ans?)\b", Transform::Verbatim),
        ],
    )
});

/// Month names, longest spelling first so alternation never stops early.
pub const MONTH_PATTERN: &str = r"(?:january|janvier|february|février|fevrier|march|mars|april|avril|may|mai|june|juin|july|juillet|august|août|aout|september|septembre|october|octobre|november|novembre|december|décembre|decembre|jan|feb|févr|mar|apr|avr|jun|jul|juil|aug|sept|sep|oct|nov|dec|déc)";

/// Month number for an English or French month name or abbreviation.
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.trim_end_matches('.').to_lowercase();
    const PREFIXES: &[(&str, u32)] = &[
        ("jan", 1),
        ("feb", 2),
        ("fév", 2),
        ("fev", 2),
        ("mar", 3),
        ("apr", 4),
        ("avr", 4),
        ("mai", 5),
        ("may", 5),
        ("juin", 6),
        ("jun", 6),
        ("juil", 7),
        ("jul", 7),
        ("aug", 8),
        ("aoû", 8),
        ("aou", 8),
        ("sep", 9),
        ("oct", 10),
        ("nov", 11),
        ("dec", 12),
        ("déc", 12),
    ];
    PREFIXES
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map(|(_, month)| *month)
}

/// Words that mark a listing as aimed at students. Substring match, lower-case.
pub const STUDENT_KEYWORDS: &[&str] = &[
    "student",
    "étudiant",
    "étudiante",
    "undergraduate",
    "graduate",
    "master",
    "doctorat",
    "phd",
    "licence",
    "bachelor",
    "élève",
    "academic",
    "université",
    "university",
    "scholarship",
    "bourse",
    "mobility",
    "mobilité",
    "exchange",
    "échange",
    "formation",
    "training",
    "internship",
    "stage",
];

/// Phrases introducing eligibility conditions; the clause after them is captured.
pub static ELIGIBILITY_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:must have|must be|requires?|required|open to|eligible|eligibility|doit avoir|doit être|ouverte? aux?)\b\s*:?\s*([^\n.;]{1,200})",
    )
    .expect("built-in eligibility pattern must compile")
});

/// English and French function words ignored by lexical matching and keyword capture.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "au", "aux",
    "avec", "be", "been", "but", "by", "can", "ce", "ces", "dans", "de", "des", "du", "elle",
    "en", "est", "et", "for", "from", "has", "have", "il", "in", "into", "is", "it", "its", "la",
    "le", "les", "leur", "mais", "more", "must", "not", "of", "on", "or", "ou", "our", "par",
    "pas", "pour", "que", "qui", "sa", "se", "ses", "should", "son", "sont", "such", "sur",
    "than", "that", "the", "their", "them", "there", "these", "they", "this", "those", "to", "un",
    "une", "vous", "was", "were", "who", "will", "with", "within", "you", "your",
];

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}
