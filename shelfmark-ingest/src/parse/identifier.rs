//! ISBN identifier extraction from arbitrary text
//!
//! The scan normalizes away hyphens and whitespace, then looks for an
//! ISBN-13 (13 digits starting 978/979) before falling back to an ISBN-10
//! (9 digits plus a digit or `X` check character). The 13-digit form always
//! wins when both are present in the same pass: metadata blocks routinely
//! carry both, and downstream consumers expect the 13-digit record.

use once_cell::sync::Lazy;
use regex::Regex;

static ISBN13_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"97[89][0-9]{10}").expect("static regex"));
static ISBN10_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{9}[0-9Xx]").expect("static regex"));

/// Find an ISBN inside arbitrary text.
///
/// Returns the normalized digit string (ISBN-10 check character uppercased),
/// or `None` if no ISBN-shaped substring exists. Pure function, no side
/// effects.
pub fn extract_isbn(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if let Some(m) = ISBN13_RE.find(&normalized) {
        return Some(m.as_str().to_string());
    }

    ISBN10_RE
        .find(&normalized)
        .map(|m| m.as_str().to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_hyphenated_isbn13() {
        assert_eq!(
            extract_isbn("ISBN 978-0-261-10334-4").as_deref(),
            Some("9780261103344")
        );
    }

    #[test]
    fn finds_isbn10_with_check_x() {
        assert_eq!(
            extract_isbn("ISBN 0-8044-2957-x").as_deref(),
            Some("080442957X")
        );
    }

    #[test]
    fn isbn13_wins_over_isbn10() {
        // Both forms present in one metadata block
        let text = "ISBN-10: 0261103342\nISBN-13: 978-0-261-10334-4";
        assert_eq!(extract_isbn(text).as_deref(), Some("9780261103344"));

        // Order in the text does not matter
        let text = "ISBN-13: 978-0-261-10334-4 / ISBN-10: 0261103342";
        assert_eq!(extract_isbn(text).as_deref(), Some("9780261103344"));
    }

    #[test]
    fn isbn13_survives_whitespace_splits() {
        assert_eq!(
            extract_isbn("979 8 88 770 123 4").as_deref(),
            Some("9798887701234")
        );
    }

    #[test]
    fn no_match_on_plain_text() {
        assert_eq!(extract_isbn(""), None);
        assert_eq!(extract_isbn("no numbers here"), None);
        assert_eq!(extract_isbn("call 555-1234"), None);
    }
}
