//! Locale-tolerant `ipconfig /displaydns` parsing.
//!
//! The record-name header varies with the OS display language. The parser
//! recognizes a fixed vocabulary (English primary, plus the fallback
//! locales the original deployments saw) and degrades to a generic
//! `label . . . : value` pattern with a hostname shape check when no
//! known header matches, so unanticipated locales still yield records.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

/// Record-name headers, lower-cased: English, German, French, Spanish.
const RECORD_NAME_HEADERS: &[&str] = &[
    "record name",
    "eintragsname",
    "nom d'enregistrement",
    "nombre de registro",
];

lazy_static! {
    /// `label . . . : value` lines, tolerant of the dot padding.
    static ref LABEL_VALUE: Regex =
        Regex::new(r"^\s*([^:]+?)[\s.]*:\s*(\S+)\s*$").expect("static regex");
}

fn looks_like_hostname(value: &str) -> bool {
    value.contains('.')
        && value.len() > 3
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        && !value.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Extract cached record names from `ipconfig /displaydns` output.
///
/// Names are deduplicated, preserving first-seen order.
pub fn parse_display_dns(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut matched_known_header = false;

    for line in text.lines() {
        let Some(caps) = LABEL_VALUE.captures(line) else {
            continue;
        };
        let label = caps[1].trim().to_lowercase();
        if RECORD_NAME_HEADERS.iter().any(|h| label == *h) {
            matched_known_header = true;
            let value = caps[2].to_string();
            if seen.insert(value.to_lowercase()) {
                names.push(value);
            }
        }
    }

    if matched_known_header {
        return names;
    }

    // Unknown locale: fall back to the generic pattern and keep values
    // shaped like hostnames.
    for line in text.lines() {
        let Some(caps) = LABEL_VALUE.captures(line) else {
            continue;
        };
        let value = caps[2].to_string();
        if looks_like_hostname(&value) && seen.insert(value.to_lowercase()) {
            names.push(value);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGLISH: &str = "
Windows IP Configuration

    cheatstore.example.com
    ----------------------------------------
    Record Name . . . . . : cheatstore.example.com
    Record Type . . . . . : 1
    Time To Live  . . . . : 86390
    Data Length . . . . . : 4
    Section . . . . . . . : Answer
    A (Host) Record . . . : 203.0.113.7

    updates.example.org
    ----------------------------------------
    Record Name . . . . . : updates.example.org
    Record Type . . . . . : 5
";

    #[test]
    fn test_english_locale() {
        let names = parse_display_dns(ENGLISH);
        assert_eq!(
            names,
            vec![
                "cheatstore.example.com".to_string(),
                "updates.example.org".to_string()
            ]
        );
    }

    #[test]
    fn test_german_locale() {
        let text = "
    Eintragsname  . . . . : werkzeug.example.de
    Eintragstyp . . . . . : 1
";
        assert_eq!(parse_display_dns(text), vec!["werkzeug.example.de"]);
    }

    #[test]
    fn test_french_locale() {
        let text = "
    Nom d'enregistrement  . : outil.example.fr
    Type d'enregistrement . : 1
";
        assert_eq!(parse_display_dns(text), vec!["outil.example.fr"]);
    }

    #[test]
    fn test_unknown_locale_falls_back_to_hostname_shape() {
        let text = "
    Zapisnik  . . . . . . : nastroj.example.cz
    Typ . . . . . . . . . : 1
    Delka . . . . . . . . : 4
";
        // No known header, but the hostname-shaped value is still found
        // while the numeric fields are not.
        assert_eq!(parse_display_dns(text), vec!["nastroj.example.cz"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let text = "
    Record Name . . . . . : dup.example.com
    Record Name . . . . . : DUP.example.com
";
        assert_eq!(parse_display_dns(text), vec!["dup.example.com"]);
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_display_dns("").is_empty());
        assert!(parse_display_dns("Windows IP Configuration\n").is_empty());
    }

    #[test]
    fn test_hostname_shape() {
        assert!(looks_like_hostname("cheat.example.com"));
        assert!(!looks_like_hostname("203.0.113.7"));
        assert!(!looks_like_hostname("Answer"));
        assert!(!looks_like_hostname("a.b c"));
    }
}
