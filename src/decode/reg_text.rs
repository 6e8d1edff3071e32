//! `reg query ... /s` export parsing.
//!
//! All registry interrogation in this scanner goes through `reg.exe`
//! text exports: key-path lines starting with a hive name, followed by
//! indented `name  REG_TYPE  data` value lines. The field layout is
//! locale-stable; only footer lines vary, and those match no pattern
//! and fall through.

use lazy_static::lazy_static;
use regex::Regex;

/// One value parsed from a registry export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegValue {
    pub key_path: String,
    pub name: String,
    pub value_type: String,
    /// Raw textual data; REG_BINARY arrives as a contiguous hex string.
    pub data: String,
}

lazy_static! {
    static ref VALUE_LINE: Regex =
        Regex::new(r"^\s+(.*?)\s{2,}(REG_[A-Z0-9_]+)\s*(.*)$").expect("static regex");
}

fn is_key_line(line: &str) -> bool {
    !line.starts_with(char::is_whitespace)
        && (line.starts_with("HKEY_") || line.starts_with("HKLM") || line.starts_with("HKCU"))
}

/// Parse a full `reg query /s` export into its values.
///
/// Values encountered before any key line are skipped; malformed lines
/// are ignored rather than fatal.
pub fn parse_reg_query(text: &str) -> Vec<RegValue> {
    let mut values = Vec::new();
    let mut current_key: Option<String> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if is_key_line(line) {
            current_key = Some(line.trim_end().to_string());
            continue;
        }
        let Some(key_path) = current_key.as_ref() else {
            continue;
        };
        if let Some(caps) = VALUE_LINE.captures(line) {
            values.push(RegValue {
                key_path: key_path.clone(),
                name: caps[1].trim().to_string(),
                value_type: caps[2].to_string(),
                data: caps[3].trim().to_string(),
            });
        }
    }
    values
}

/// Distinct key paths present in an export, in first-seen order.
pub fn parse_key_paths(text: &str) -> Vec<String> {
    let mut keys = Vec::new();
    for line in text.lines() {
        if is_key_line(line) {
            let key = line.trim_end().to_string();
            if keys.last() != Some(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Decode a contiguous hex string (REG_BINARY data) into bytes.
pub fn hex_to_bytes(data: &str) -> Option<Vec<u8>> {
    let data = data.trim();
    if data.is_empty() || data.len() % 2 != 0 {
        return None;
    }
    (0..data.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(data.get(i..i + 2)?, 16).ok())
        .collect()
}
