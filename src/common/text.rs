//! Token scanning and text helpers shared by the two mention resolvers.

use fancy_regex::Regex;

/// Collect the first capture group of every match, deduplicated,
/// in order of first appearance.
pub fn collect_tokens(pattern: &Regex, text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in pattern.captures_iter(text).flatten() {
        if let Some(m) = caps.get(1) {
            if !seen.iter().any(|s| s == m.as_str()) {
                seen.push(m.as_str().to_string());
            }
        }
    }
    seen
}

/// Replace every match of `pattern` left-to-right, substituting the result
/// of `lookup` applied to the first capture group. A `None` from the lookup
/// leaves the matched token verbatim, so unresolvable references survive
/// unchanged and text outside matched spans is never altered.
pub fn substitute_tokens<F>(pattern: &Regex, text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    pattern
        .replace_all(text, |caps: &fancy_regex::Captures| -> String {
            match caps.get(1).and_then(|m| lookup(m.as_str())) {
                Some(replacement) => replacement,
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

/// Truncate to at most `max` characters, on a character boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

/// Produce a single-line excerpt of at most `max` characters, with an
/// ellipsis when the source text was cut.
pub fn excerpt(s: &str, max: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max).collect();
    cut.push('…');
    cut
}
