//! Keyword matching engine used by every probe.
//!
//! Two matching modes:
//! - substring patterns with word-boundary semantics, so `cheat` hits
//!   `my-cheat-tool.exe` but never `cheater`;
//! - exact-match names checked against the extension-stripped, case-folded
//!   file basename.
//!
//! Patterns are case-folded once at construction; matching operates on
//! `char` sequences so multi-byte case folding cannot desynchronize the
//! boundary checks.

use std::collections::HashSet;

struct Pattern {
    /// Original casing, returned for display on a hit.
    display: String,
    folded: Vec<char>,
}

/// Immutable matcher built once per scan run from the configured keyword set.
pub struct KeywordMatcher {
    patterns: Vec<Pattern>,
    exact: HashSet<String>,
}

fn fold(text: &str) -> Vec<char> {
    text.chars().flat_map(|c| c.to_lowercase()).collect()
}

/// Basename of a path-like string with its extension stripped.
fn basename_stem(text: &str) -> &str {
    let base = match text.rfind(['/', '\\']) {
        Some(idx) => &text[idx + 1..],
        None => text,
    };
    match base.rfind('.') {
        // A leading dot is part of the name, not an extension separator
        Some(0) | None => base,
        Some(idx) => &base[..idx],
    }
}

fn matches_at(text: &[char], pat: &[char], i: usize) -> bool {
    if text[i..i + pat.len()] != *pat {
        return false;
    }
    let before_ok = i == 0 || !text[i - 1].is_alphanumeric();
    let after = i + pat.len();
    let after_ok = after == text.len() || !text[after].is_alphanumeric();
    before_ok && after_ok
}

fn contains_word(text: &[char], pat: &[char]) -> bool {
    if pat.is_empty() || pat.len() > text.len() {
        return false;
    }
    (0..=text.len() - pat.len()).any(|i| matches_at(text, pat, i))
}

impl KeywordMatcher {
    /// Build a matcher from ordered substring patterns and an exact-match
    /// basename set. Empty entries are dropped.
    pub fn new<S: AsRef<str>>(substrings: &[S], exact: &[S]) -> Self {
        let patterns = substrings
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.trim().is_empty())
            .map(|s| Pattern {
                display: s.to_string(),
                folded: fold(s),
            })
            .collect();

        let exact = exact
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_lowercase())
            .collect();

        KeywordMatcher { patterns, exact }
    }

    /// True when any keyword matches `text`.
    pub fn contains_keyword(&self, text: &str) -> bool {
        self.find_keyword(text).is_some()
    }

    /// First matching keyword, in declared order.
    ///
    /// Exact-match hits are reported in lower-cased form and win over
    /// substring patterns; pattern hits keep their original casing.
    pub fn find_keyword(&self, text: &str) -> Option<&str> {
        if text.is_empty() {
            return None;
        }

        let stem = basename_stem(text).to_lowercase();
        if let Some(hit) = self.exact.get(&stem) {
            return Some(hit.as_str());
        }

        let folded = fold(text);
        self.patterns
            .iter()
            .find(|p| contains_word(&folded, &p.folded))
            .map(|p| p.display.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.exact.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(substrings: &[&str], exact: &[&str]) -> KeywordMatcher {
        KeywordMatcher::new(substrings, exact)
    }

    #[test]
    fn test_word_boundary_rejects_embedded_match() {
        let m = matcher(&["cheat"], &[]);
        assert!(!m.contains_keyword("cheater"));
        assert!(!m.contains_keyword("uncheatable"));
        assert!(!m.contains_keyword("cheats4u"));
    }

    #[test]
    fn test_word_boundary_accepts_delimited_match() {
        let m = matcher(&["cheat"], &[]);
        assert!(m.contains_keyword("my-cheat-tool.exe"));
        assert!(m.contains_keyword("cheat"));
        assert!(m.contains_keyword("CHEAT.EXE"));
        assert!(m.contains_keyword("best cheat ever"));
        assert!(m.contains_keyword("C:\\Games\\cheat\\loader.exe"));
    }

    #[test]
    fn test_exact_match_on_stripped_basename() {
        let m = matcher(&[], &["x22cheats"]);
        assert!(m.contains_keyword("x22cheats.exe"));
        assert!(m.contains_keyword("X22Cheats.EXE"));
        assert!(m.contains_keyword("C:\\Downloads\\x22cheats.exe"));
        assert!(!m.contains_keyword("x22cheats_modified.exe"));
        assert!(!m.contains_keyword("not-x22cheats.exe"));
    }

    #[test]
    fn test_exact_hit_reported_lowercased() {
        let m = matcher(&[], &["AimBot"]);
        assert_eq!(m.find_keyword("AIMBOT.exe"), Some("aimbot"));
    }

    #[test]
    fn test_pattern_hit_keeps_declared_casing_and_order() {
        let m = matcher(&["Trigger", "aim"], &[]);
        // Both match; first declared pattern wins
        assert_eq!(m.find_keyword("aim trigger loader"), Some("Trigger"));
        assert_eq!(m.find_keyword("pure aim config"), Some("aim"));
    }

    #[test]
    fn test_empty_input_never_matches() {
        let m = matcher(&["cheat"], &["aimbot"]);
        assert!(!m.contains_keyword(""));
        assert_eq!(m.find_keyword(""), None);
    }

    #[test]
    fn test_empty_patterns_are_dropped() {
        let m = matcher(&["", "  "], &[""]);
        assert!(m.is_empty());
        assert!(!m.contains_keyword("anything"));
    }

    #[test]
    fn test_basename_stem() {
        assert_eq!(basename_stem("C:\\dir\\tool.exe"), "tool");
        assert_eq!(basename_stem("/usr/bin/tool"), "tool");
        assert_eq!(basename_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(basename_stem(".hidden"), ".hidden");
        assert_eq!(basename_stem("noext"), "noext");
    }

    #[test]
    fn test_case_folded_unicode_match() {
        let m = matcher(&["wallhack"], &[]);
        assert!(m.contains_keyword("WALLHACK v2"));
        // Non-alphanumeric unicode neighbors count as boundaries
        assert!(m.contains_keyword("»wallhack«"));
    }

    #[test]
    fn test_digit_neighbors_are_not_boundaries() {
        let m = matcher(&["esp"], &[]);
        assert!(!m.contains_keyword("esp32-firmware.bin"));
        assert!(m.contains_keyword("esp.overlay.dll"));
    }
}
