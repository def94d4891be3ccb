use unicode_segmentation::UnicodeSegmentation;

/// Capitalize the first letter of every word: "old norse" -> "Old Norse"
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in text.split_word_bounds() {
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) if first.is_alphabetic() => {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
            _ => out.push_str(segment),
        }
    }
    out
}

/// Collapse runs of whitespace into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn has_word_content(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}
