//! Heading detection from paragraph style names.

use regex::Regex;
use std::sync::OnceLock;

use crate::model::HeadingLevel;

/// Localized names Word gives its built-in heading styles, tried in order.
const HEADING_PREFIXES: &[&str] = &[
    "heading",
    "标题",
    "標題",
    "titre",
    "überschrift",
    "título",
    "titolo",
    "заголовок",
    "見出し",
    "제목",
    "kop",
    "nagłówek",
];

fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        HEADING_PREFIXES
            .iter()
            .filter_map(|prefix| {
                // Optional space, one digit 1-9, then no further digit
                Regex::new(&format!(r"(?i)^{}\s?([1-9])(?:\D|$)", regex::escape(prefix))).ok()
            })
            .collect()
    })
}

/// Map a style label to a heading level.
///
/// Matching is case-insensitive, allows an optional space before the digit
/// and accepts a trailing suffix (`"Heading 1 Char"`). `"Heading 10"` and
/// `"Heading 0"` are not headings.
pub fn classify_style(label: &str) -> Option<HeadingLevel> {
    let label = label.trim();
    patterns().iter().find_map(|re| {
        let caps = re.captures(label)?;
        let digit: u8 = caps[1].parse().ok()?;
        HeadingLevel::new(digit)
    })
}
