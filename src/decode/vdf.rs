//! Valve Data Format (VDF) decoding for Steam artifacts.
//!
//! Covers the two documents the scanner reads: `loginusers.vdf` (known
//! accounts) and `libraryfolders.vdf` (game library roots). The parser is
//! a small line-oriented state machine and is deliberately forgiving: a
//! malformed document yields zero accounts, never an error, and records
//! with invalid identifiers are skipped silently.

use log::debug;

use crate::constants::{STEAM_ID_LEN, STEAM_ID_PREFIX};

/// One Steam account parsed from `loginusers.vdf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteamAccount {
    /// 17-digit community id beginning with the fixed `7656` prefix.
    pub steam_id: String,
    pub account_name: String,
    pub persona_name: Option<String>,
    pub remember_password: bool,
    /// Last-login timestamp (Unix seconds) when present.
    pub timestamp: Option<i64>,
}

/// True for a well-formed 64-bit Steam community id.
pub fn is_valid_steam_id(id: &str) -> bool {
    id.len() == STEAM_ID_LEN
        && id.starts_with(STEAM_ID_PREFIX)
        && id.bytes().all(|b| b.is_ascii_digit())
}

/// Extract the quoted strings from one VDF line, honoring `\"` and `\\`
/// escapes.
fn quoted_strings(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' if !in_quote => in_quote = true,
            '"' => {
                in_quote = false;
                out.push(std::mem::take(&mut current));
            }
            '\\' if in_quote => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            _ if in_quote => current.push(c),
            _ => {}
        }
    }
    out
}

#[derive(Default)]
struct PartialAccount {
    steam_id: String,
    account_name: String,
    persona_name: Option<String>,
    remember_password: bool,
    timestamp: Option<i64>,
}

/// Parse `loginusers.vdf` into the accounts it records.
///
/// An account is only emitted once both its identifier and its
/// `AccountName` are present.
pub fn parse_login_users(text: &str) -> Vec<SteamAccount> {
    let mut accounts = Vec::new();
    let mut depth: usize = 0;
    let mut in_users = false;
    let mut last_key: Option<String> = None;
    let mut current: Option<PartialAccount> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if line.starts_with('{') {
            depth += 1;
            if depth == 1 {
                in_users = last_key
                    .as_deref()
                    .map(|k| k.eq_ignore_ascii_case("users"))
                    .unwrap_or(false);
            }
            continue;
        }

        if line.starts_with('}') {
            if depth == 2 {
                if let Some(acc) = current.take() {
                    if !acc.account_name.is_empty() {
                        accounts.push(SteamAccount {
                            steam_id: acc.steam_id,
                            account_name: acc.account_name,
                            persona_name: acc.persona_name,
                            remember_password: acc.remember_password,
                            timestamp: acc.timestamp,
                        });
                    }
                }
            }
            depth = depth.saturating_sub(1);
            if depth == 0 {
                in_users = false;
            }
            continue;
        }

        let fields = quoted_strings(line);
        match fields.len() {
            1 => {
                let key = &fields[0];
                if depth == 1 && in_users {
                    if is_valid_steam_id(key) {
                        current = Some(PartialAccount {
                            steam_id: key.clone(),
                            ..PartialAccount::default()
                        });
                    } else {
                        debug!("skipping malformed steam id: {key}");
                        current = None;
                    }
                }
                last_key = Some(key.clone());
            }
            2 if depth == 2 => {
                if let Some(acc) = current.as_mut() {
                    let (key, value) = (&fields[0], &fields[1]);
                    if key.eq_ignore_ascii_case("AccountName") {
                        acc.account_name = value.clone();
                    } else if key.eq_ignore_ascii_case("PersonaName") {
                        acc.persona_name = Some(value.clone());
                    } else if key.eq_ignore_ascii_case("RememberPassword") {
                        acc.remember_password = value == "1";
                    } else if key.eq_ignore_ascii_case("Timestamp") {
                        acc.timestamp = value.parse().ok();
                    }
                }
            }
            _ => {}
        }
    }

    accounts
}

/// Parse `libraryfolders.vdf` into its library root paths.
pub fn parse_library_folders(text: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for raw in text.lines() {
        let fields = quoted_strings(raw.trim());
        if fields.len() == 2 && fields[0].eq_ignore_ascii_case("path") && !fields[1].is_empty() {
            paths.push(fields[1].clone());
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_USER: &str = r#"
"users"
{
	"76561198012345678"
	{
		"AccountName"		"sharpshooter"
		"PersonaName"		"Sharp Shooter"
		"RememberPassword"		"1"
		"Timestamp"		"1650000000"
	}
}
"#;

    #[test]
    fn test_single_valid_account() {
        let accounts = parse_login_users(ONE_USER);
        assert_eq!(accounts.len(), 1);
        let acc = &accounts[0];
        assert_eq!(acc.steam_id, "76561198012345678");
        assert_eq!(acc.account_name, "sharpshooter");
        assert_eq!(acc.persona_name.as_deref(), Some("Sharp Shooter"));
        assert!(acc.remember_password);
        assert_eq!(acc.timestamp, Some(1_650_000_000));
    }

    #[test]
    fn test_invalid_id_interleaved_with_valid() {
        let doc = r#"
"users"
{
	"12345"
	{
		"AccountName"		"bogus"
	}
	"76561198000000001"
	{
		"AccountName"		"legit"
		"RememberPassword"		"0"
	}
}
"#;
        let accounts = parse_login_users(doc);
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account_name, "legit");
        assert!(!accounts[0].remember_password);
    }

    #[test]
    fn test_missing_account_name_is_not_emitted() {
        let doc = r#"
"users"
{
	"76561198000000002"
	{
		"PersonaName"		"ghost"
	}
}
"#;
        assert!(parse_login_users(doc).is_empty());
    }

    #[test]
    fn test_empty_document_yields_zero() {
        assert!(parse_login_users("").is_empty());
        assert!(parse_login_users("garbage { } \" unbalanced").is_empty());
    }

    #[test]
    fn test_id_outside_users_section_is_ignored() {
        let doc = r#"
"other"
{
	"76561198000000003"
	{
		"AccountName"		"elsewhere"
	}
}
"#;
        assert!(parse_login_users(doc).is_empty());
    }

    #[test]
    fn test_is_valid_steam_id() {
        assert!(is_valid_steam_id("76561198012345678"));
        assert!(!is_valid_steam_id("7656119801234567")); // 16 digits
        assert!(!is_valid_steam_id("86561198012345678")); // wrong prefix
        assert!(!is_valid_steam_id("7656119801234567x"));
        assert!(!is_valid_steam_id(""));
    }

    #[test]
    fn test_library_folders_paths() {
        let doc = r#"
"libraryfolders"
{
	"0"
	{
		"path"		"C:\\Program Files (x86)\\Steam"
	}
	"1"
	{
		"path"		"D:\\SteamLibrary"
		"label"		""
	}
}
"#;
        let paths = parse_library_folders(doc);
        assert_eq!(
            paths,
            vec![
                "C:\\Program Files (x86)\\Steam".to_string(),
                "D:\\SteamLibrary".to_string()
            ]
        );
    }

    #[test]
    fn test_quoted_strings_escapes() {
        let fields = quoted_strings(r#""key"		"a \"quoted\" \\ value""#);
        assert_eq!(fields, vec!["key", "a \"quoted\" \\ value"]);
    }
}
