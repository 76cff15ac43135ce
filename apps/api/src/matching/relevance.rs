use crate::models::opportunity::Opportunity;
use crate::rules::tables::STUDENT_KEYWORDS;

/// Keyword gate: does the listing address students at all?
///
/// Case-insensitive substring match over title, subtitle and description.
/// Attachments are not consulted.
pub fn is_relevant(opportunity: &Opportunity) -> bool {
    let haystack = format!(
        "{} {} {}",
        opportunity.title, opportunity.subtitle, opportunity.description
    )
    .to_lowercase();
    STUDENT_KEYWORDS.iter().any(|kw| haystack.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_opportunity(title: &str, description: &str) -> Opportunity {
        Opportunity {
            title: title.to_string(),
            description: description.to_string(),
            ..Opportunity::default()
        }
    }

    #[test]
    fn test_student_listing_is_relevant() {
        let opp = make_opportunity("Summer Internship in Data Science", "");
        assert!(is_relevant(&opp));
    }

    #[test]
    fn test_french_keywords_match() {
        let opp = make_opportunity("Appel à candidatures", "Programme de mobilité pour les ÉTUDIANTS");
        assert!(is_relevant(&opp));
    }

    #[test]
    fn test_subtitle_is_consulted() {
        let opp = Opportunity {
            title: "Call for applications".to_string(),
            subtitle: "Erasmus exchange programme".to_string(),
            ..Opportunity::default()
        };
        assert!(is_relevant(&opp));
    }

    #[test]
    fn test_unrelated_listing_rejected() {
        let opp = make_opportunity("Staff parking update", "New badges are available at reception.");
        assert!(!is_relevant(&opp));
    }

    #[test]
    fn test_attachment_text_is_ignored() {
        let mut opp = make_opportunity("Notice", "See attached.");
        opp.attachments.push(crate::models::opportunity::Attachment {
            extracted_text: "scholarship for students".to_string(),
            ..Default::default()
        });
        assert!(!is_relevant(&opp));
    }
}
