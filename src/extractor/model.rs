use regex::Regex;
use std::sync::LazyLock;

static SPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());
static NEWLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());

/// Output of the primary structured extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryContent {
    pub title: Option<String>,
    pub publish_date: Option<String>,
    pub lead_image: Option<String>,
    pub source_domain: Option<String>,
    pub text: String,
}

pub fn normalize_whitespace(text: &str) -> String {
    let text = text.trim();

    // Collapse runs of spaces/tabs
    let spaced = SPACE_REGEX.replace_all(text, " ");

    // Keep paragraph breaks as a single blank line
    NEWLINE_REGEX.replace_all(&spaced, "\n\n").to_string()
}
