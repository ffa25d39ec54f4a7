//! Authority name normalization
//!
//! Library authority records write names as "Surname, Given, 1892-1973"
//! with parenthetical asides. Normalization makes them comparable and
//! presentable; the raw authority string is never mutated in place.

use once_cell::sync::Lazy;
use regex::Regex;

static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("static regex"));
static YEAR_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]{3,4}(\s*-\s*[0-9]{3,4})?\b").expect("static regex"));

/// Normalize an authority name into natural reading order.
///
/// Strips parenthetical asides and 3–4 digit year ranges (with an optional
/// hyphen-joined second year), collapses whitespace, and rewrites
/// `"Surname, Given"` as `"Given Surname"`. Strings without a comma pass
/// through cleaned but otherwise unchanged.
pub fn normalize_name(raw: &str) -> String {
    let cleaned = PARENTHETICAL_RE.replace_all(raw, " ");
    let cleaned = YEAR_RANGE_RE.replace_all(&cleaned, " ");
    let cleaned = tidy(&cleaned);

    match cleaned.split_once(',') {
        Some((surname, given)) => {
            let given = given
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if given.is_empty() {
                surname.trim().to_string()
            } else {
                format!("{} {}", given, surname.trim())
            }
        }
        None => cleaned,
    }
}

/// Collapse whitespace and trim stray separators left behind by the strips.
fn tidy(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == ',' || c == '-' || c.is_whitespace())
        .to_string()
}
