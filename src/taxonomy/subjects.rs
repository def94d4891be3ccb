use crate::taxonomy::category::Category;

// Group 1 (Language) and Group 2 (Language Acquisition) are registered on first
// sighting by the extractor.
const SUBJECTS: &[(u8, &str, &[&str])] = &[
    // Group 3 (Individuals & Societies)
    (3, "History", &[]),
    (3, "Economics", &["Econ"]),
    (3, "Business Management", &["BM"]),
    (3, "ITGS", &["Information Technology in Global Societies"]),
    (3, "Geography", &["Geo"]),
    (3, "Philosophy", &[]),
    (3, "Global Politics", &["Politics"]),
    (3, "Psychology", &["Psych"]),
    (3, "Anthropology", &["Social and Cultural Anthropology"]),
    (3, "World Religion", &["Religion"]),
    // Group 4 (Sciences)
    (4, "Physics", &[]),
    (4, "Chemistry", &[]),
    (4, "Biology", &[]),
    (4, "Computer Science", &["CS"]),
    (4, "Sport, Exercise and Health Science", &["SEHS"]),
    (4, "Design Technology", &["DT", "Design Tech"]),
    // Group 5 (Mathematics)
    (5, "Mathematics", &["Math", "Maths"]),
    (5, "Mathematics: Analysis and Approaches", &["Math AA"]),
    (5, "Mathematics: Applications and Interpretation", &["Math AI"]),
    (5, "Math Studies", &["Mathematical Studies"]),
    // Group 6 (Arts)
    (6, "Film", &[]),
    (6, "Music", &[]),
    (6, "Dance", &[]),
    (6, "Theatre", &["Theater"]),
    (6, "Visual Arts", &["VA"]),
];

pub fn default_subjects() -> Vec<Category> {
    SUBJECTS
        .iter()
        .map(|(group, name, aliases)| Category::unchecked(*group, name, true, aliases.iter()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use crate::taxonomy::category::validate_group;

    #[test]
    fn built_in_subjects_are_valid_and_distinct() {
        let subjects = default_subjects();
        let mut names = HashSet::new();
        for subject in &subjects {
            assert!(validate_group(subject.group()).is_ok());
            assert!(names.insert(subject.display_name().to_lowercase()));
        }
        assert_eq!(subjects.len(), SUBJECTS.len());
    }
}
