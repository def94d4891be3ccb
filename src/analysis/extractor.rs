use std::sync::Arc;
use tracing::debug;
use crate::analysis::patterns::{LABELED_LINE, LANGUAGE, QUESTION, QUESTION_LABEL, SESSION, SUBJECT, TITLE};
use crate::analysis::text::{has_word_content, normalize_whitespace, title_case};
use crate::core::error::{Error, ErrorKind, MissingField, Result};
use crate::core::types::{Session, TimePeriod};
use crate::taxonomy::category::Category;
use crate::taxonomy::registry::ReferenceRegistry;

/// Group assigned to languages discovered on a cover page
pub const LANGUAGE_GROUP: u8 = 1;

/// Structured fields read off a cover page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: String,
    pub category: Category,
    pub question: String,
    pub period: TimePeriod,
}

/// Heuristic cover-page reader. Only the first page is consulted.
pub struct DocumentExtractor {
    registry: Arc<ReferenceRegistry>,
}

impl DocumentExtractor {
    pub fn new(registry: Arc<ReferenceRegistry>) -> Self {
        DocumentExtractor { registry }
    }

    pub fn registry(&self) -> &Arc<ReferenceRegistry> {
        &self.registry
    }

    /// Read title, category, research question and exam session from the
    /// cover page. Unknown language subjects are registered as a side effect.
    pub fn extract<S: AsRef<str>>(&self, pages: &[S]) -> Result<ExtractedFields> {
        let cover = pages
            .first()
            .map(|page| page.as_ref())
            .ok_or_else(|| Error::missing(MissingField::Category))?;

        let raw_category = find_category(cover).ok_or_else(|| Error::missing(MissingField::Category))?;
        let title = find_title(cover).ok_or_else(|| Error::missing(MissingField::Title))?;
        let question = find_question(cover).ok_or_else(|| Error::missing(MissingField::Question))?;
        let category = self.resolve_category(&raw_category)?;
        let period = find_period(cover);

        Ok(ExtractedFields {
            title,
            category,
            question,
            period,
        })
    }

    fn resolve_category(&self, raw: &str) -> Result<Category> {
        if let Some(captures) = LANGUAGE.captures(raw) {
            let language = title_case(&captures[1].to_lowercase());
            return self.registry.get_or_register(&language, || {
                Category::new(LANGUAGE_GROUP, &language, true, [""; 0])
            });
        }
        self.registry.lookup_by_name(raw).ok_or_else(|| {
            Error::new(ErrorKind::UnknownCategory, format!("Invalid subject: {}", raw))
        })
    }
}

fn clean_field(raw: &str) -> Option<String> {
    let cleaned = normalize_whitespace(raw.trim().trim_end_matches('.'));
    has_word_content(&cleaned).then_some(cleaned)
}

fn find_category(cover: &str) -> Option<String> {
    SUBJECT
        .captures_iter(cover)
        .find_map(|captures| clean_field(&captures[1]))
}

fn find_title(cover: &str) -> Option<String> {
    TITLE
        .captures_iter(cover)
        .find_map(|captures| clean_field(&captures[1]))
        .or_else(|| fallback_title(cover))
}

/// Longest unlabeled line that does not end in a question mark
fn fallback_title(cover: &str) -> Option<String> {
    let mut best: Option<&str> = None;
    for line in cover.lines().map(str::trim) {
        if line.is_empty() || line.ends_with('?') || LABELED_LINE.is_match(line) || !has_word_content(line) {
            continue;
        }
        if best.is_none_or(|current| line.chars().count() > current.chars().count()) {
            best = Some(line);
        }
    }
    best.and_then(clean_field)
}

fn find_question(cover: &str) -> Option<String> {
    QUESTION.find_iter(cover).find_map(|found| {
        let stripped = QUESTION_LABEL.replace_all(found.as_str(), "");
        let question = normalize_whitespace(&stripped);
        let body = question.trim_end_matches('?');
        has_word_content(body).then_some(question)
    })
}

/// Missing or implausible sessions fall back to the unknown sentinel
fn find_period(cover: &str) -> TimePeriod {
    let Some(captures) = SESSION.captures(cover) else {
        return TimePeriod::UNKNOWN;
    };
    let Some(session) = Session::from_token(&captures[1]) else {
        return TimePeriod::UNKNOWN;
    };
    let year = match captures[2].parse::<i32>() {
        Ok(year) => year,
        Err(err) => {
            debug!(raw = &captures[2], error = %err, "unparseable exam year");
            return TimePeriod::UNKNOWN;
        }
    };
    TimePeriod::new(year, session).unwrap_or_else(|err| {
        debug!(year, error = %err, "exam session out of range");
        TimePeriod::UNKNOWN
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> DocumentExtractor {
        DocumentExtractor::new(Arc::new(ReferenceRegistry::with_default_taxonomy()))
    }

    #[test]
    fn reads_a_well_formed_cover_page() {
        let cover = "Extended Essay\n\
                     Subject: History\n\
                     Title: The Role of X\n\
                     Research Question: Did X cause Y?\n\
                     November 2021\n";
        let fields = extractor().extract(&[cover]).unwrap();
        assert_eq!(fields.category.display_name(), "History");
        assert_eq!(fields.title, "The Role of X");
        assert_eq!(fields.question, "Did X cause Y?");
        assert_eq!(fields.period.display_name(), "N21");
    }

    #[test]
    fn only_the_cover_page_is_read() {
        let pages = ["Subject: Physics\nTopic: Pendulums\nHow long is a swing?", "Subject: History\nMay 2019"];
        let fields = extractor().extract(&pages).unwrap();
        assert_eq!(fields.category.display_name(), "Physics");
        assert_eq!(fields.title, "Pendulums");
        assert!(fields.period.is_unknown());
    }

    #[test]
    fn missing_subject_fails() {
        let err = extractor().extract(&["Title: Something\nWhy?"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Extraction(MissingField::Category));
        let err = extractor().extract::<&str>(&[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Extraction(MissingField::Category));
    }

    #[test]
    fn missing_question_fails() {
        let err = extractor().extract(&["Subject: History\nTitle: Statements only."]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Extraction(MissingField::Question));
    }

    #[test]
    fn questions_with_decimals_and_abbreviations_stay_whole() {
        let cover = "Subject: Chemistry\n\
                     Title: Reaction Rates\n\
                     Research Question: How does 0.1 M HCl affect the rate?\n\
                     May 2019\n";
        let fields = extractor().extract(&[cover]).unwrap();
        assert_eq!(fields.question, "How does 0.1 M HCl affect the rate?");

        let cover = "Subject: History\nTitle: Cuba\nResearch Question: Did the U.S. provoke the crisis?";
        let fields = extractor().extract(&[cover]).unwrap();
        assert_eq!(fields.question, "Did the U.S. provoke the crisis?");
    }

    #[test]
    fn title_falls_back_to_longest_line() {
        let cover = "Subject: Economics\n\
                     Price Controls and Rental Markets in Berlin\n\
                     Short line\n\
                     Research Question: Did the cap lower rents?\n";
        let fields = extractor().extract(&[cover]).unwrap();
        assert_eq!(fields.title, "Price Controls and Rental Markets in Berlin");
        assert_eq!(fields.category.display_name(), "Economics");
    }

    #[test]
    fn no_title_at_all_fails() {
        let err = extractor().extract(&["Subject: History\nWhy?"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Extraction(MissingField::Title));
    }

    #[test]
    fn languages_are_registered_on_first_sighting() {
        let registry = Arc::new(ReferenceRegistry::with_default_taxonomy());
        let extractor = DocumentExtractor::new(Arc::clone(&registry));
        let cover = "Subject: ENGLISH A\nTitle: Voice in Woolf\nHow does Woolf shape voice?";

        let fields = extractor.extract(&[cover]).unwrap();
        assert_eq!(fields.category.display_name(), "English");
        assert_eq!(fields.category.group(), LANGUAGE_GROUP);
        assert_eq!(registry.list_by_group(1).unwrap().len(), 1);

        // Second sighting reuses the registered entry
        let again = extractor.extract(&[cover]).unwrap();
        assert_eq!(again.category, fields.category);
        assert_eq!(registry.list_by_group(1).unwrap().len(), 1);
    }

    #[test]
    fn unknown_subject_fails() {
        let err = extractor()
            .extract(&["Subject: Astrology\nTitle: Stars\nDo stars decide?"])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownCategory);
    }

    #[test]
    fn alias_subjects_resolve() {
        let fields = extractor()
            .extract(&["Subject: CS\nTitle: Sorting\nIs quicksort quick?"])
            .unwrap();
        assert_eq!(fields.category.display_name(), "Computer Science");
    }

    #[test]
    fn implausible_sessions_become_unknown() {
        let cover = "Subject: History\nTitle: Old\nWhen?\nMay 1900";
        assert!(extractor().extract(&[cover]).unwrap().period.is_unknown());

        let cover = "Subject: History\nTitle: Future\nWhen?\nNovember 9999";
        assert!(extractor().extract(&[cover]).unwrap().period.is_unknown());

        let cover = "Subject: History\nTitle: Spring\nWhen?\nmay2019";
        assert_eq!(extractor().extract(&[cover]).unwrap().period.display_name(), "M19");
    }
}
