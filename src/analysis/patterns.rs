use std::sync::LazyLock;
use regex::Regex;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in cover page pattern must compile")
}

/// "Subject: History"
pub static SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\bsubject\s*:[ \t]*([^\r\n]*)"));

/// "Title: ..." or "Topic: ..." up to the end of the line
pub static TITLE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(?:title|topic)\s*:[ \t]*([^\r\n]*)"));

/// A line up to its last question mark; the label, if any, is stripped later
pub static QUESTION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"[^\r\n]*\?"));

pub static QUESTION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)research\s+question\s*:"));

/// "May 2019", "november2021"
pub static SESSION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(may|november)\s?([0-9]{4})\b"));

/// Language subjects are written "<Language> A" or "<Language> B", optionally
/// followed by a course name: "English A: Literature", "French B".
pub static LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^(\p{L}+)\s+[ab]\b"));

/// Lines carrying a field label; never taken as a fallback title
pub static LABELED_LINE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^\s*(?:subject|title|topic|research\s+question)\s*:"));
