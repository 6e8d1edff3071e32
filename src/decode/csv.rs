//! CSV parsing for `/fo csv` console output.
//!
//! `tasklist`, `driverquery` and `getmac` emit RFC 4180-style CSV with
//! every field quoted; quotes inside fields are doubled. The parser is a
//! small state machine rather than a full CSV crate because the input is
//! single-line records from trusted local tools.

/// Split one CSV line into its fields, honoring quoting and doubled
/// quotes.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse a whole `/fo csv /nh` document into rows, skipping blank lines
/// and the `INFO:` placeholder some tools emit when there is no data.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("INFO:"))
        .map(parse_csv_line)
        .collect()
}
