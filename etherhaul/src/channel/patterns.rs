//! Pattern helpers for prompt, pager and error-signature matching.

use regex::bytes::Regex;

/// Combine several patterns into one alternation.
///
/// Each pattern is wrapped in a non-capturing group so anchors and flags
/// stay local to their alternative.
pub fn combine_patterns<'a>(
    patterns: impl IntoIterator<Item = &'a Regex>,
) -> Result<Regex, regex::Error> {
    let combined: Vec<String> = patterns
        .into_iter()
        .map(|p| format!("(?:{})", p.as_str()))
        .collect();
    Regex::new(&combined.join("|"))
}

/// Return the first line of `text` matched by any of `patterns`, trimmed.
///
/// Used to turn a device error signature hit into a readable message.
pub fn first_matching_line(patterns: &[Regex], text: &str) -> Option<String> {
    text.lines()
        .find(|line| patterns.iter().any(|p| p.is_match(line.as_bytes())))
        .map(|line| line.trim().to_string())
}
