//! Relevance scoring for raw authority-search hits
//!
//! Authority search endpoints return plenty of noise (manuscripts,
//! photographs, newspaper issues that merely mention a title). Candidates
//! are scored against the book's own title/author tokens and anything
//! below the floor is discarded before further processing.

/// Candidates scoring below this are discarded as noise.
pub const MIN_RELEVANCE_SCORE: i32 = 2;

const BOOK_FORMATS: &[&str] = &["book", "ebook", "text"];
const NOISE_FORMATS: &[&str] = &["manuscript", "photo", "newspaper", "periodical", "map"];

/// Score one candidate: +3 per title token (≥ 3 chars, case-insensitive)
/// found in the candidate's combined text, +2 per author token, +2 when the
/// declared format looks like a book, −2 when it looks like archival noise.
pub fn relevance_score(
    candidate_text: &str,
    candidate_format: &str,
    title: Option<&str>,
    author: Option<&str>,
) -> i32 {
    let haystack = candidate_text.to_lowercase();
    let mut score = 0;

    for token in query_tokens(title) {
        if haystack.contains(&token) {
            score += 3;
        }
    }
    for token in query_tokens(author) {
        if haystack.contains(&token) {
            score += 2;
        }
    }

    let format = candidate_format.to_lowercase();
    if BOOK_FORMATS.iter().any(|f| format.contains(f)) {
        score += 2;
    }
    if NOISE_FORMATS.iter().any(|f| format.contains(f)) {
        score -= 2;
    }

    score
}

/// Filter candidates below the floor and sort descending by score.
/// The sort is stable, so ties keep encounter order.
pub fn rank_candidates<T>(candidates: Vec<T>, score_of: impl Fn(&T) -> i32) -> Vec<(T, i32)> {
    let mut scored: Vec<(T, i32)> = candidates
        .into_iter()
        .map(|c| {
            let score = score_of(&c);
            (c, score)
        })
        .filter(|(_, score)| *score >= MIN_RELEVANCE_SCORE)
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
}

/// Comparison tokens: lowercase words of at least three characters.
fn query_tokens(source: Option<&str>) -> Vec<String> {
    source
        .unwrap_or_default()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_tokens_score_three_each() {
        let score = relevance_score(
            "The Hobbit, or There and Back Again",
            "",
            Some("The Hobbit"),
            None,
        );
        // "the" + "hobbit" both present
        assert_eq!(score, 6);
    }

    #[test]
    fn author_tokens_score_two_each() {
        let score = relevance_score("by J.R.R. Tolkien", "", None, Some("Tolkien"));
        assert_eq!(score, 2);
    }

    #[test]
    fn book_format_bonus_and_noise_penalty() {
        assert_eq!(relevance_score("Hobbit", "book", Some("Hobbit"), None), 5);
        assert_eq!(
            relevance_score("Hobbit", "manuscript/mixed material", Some("Hobbit"), None),
            1
        );
    }

    #[test]
    fn adding_a_matching_token_never_decreases_score() {
        let base = relevance_score("hobbit", "", Some("The Hobbit Again"), None);
        let more = relevance_score("hobbit again", "", Some("The Hobbit Again"), None);
        assert!(more >= base);
    }

    #[test]
    fn low_scores_are_discarded() {
        let candidates = vec![("relevant hobbit text", 0), ("irrelevant", 1)];
        let ranked = rank_candidates(candidates, |(text, _)| {
            relevance_score(text, "", Some("Hobbit"), None)
        });
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0 .0, "relevant hobbit text");
    }

    #[test]
    fn ties_keep_encounter_order() {
        let candidates = vec!["hobbit one", "hobbit two", "hobbit three"];
        let ranked = rank_candidates(candidates, |text| {
            relevance_score(text, "", Some("Hobbit"), None)
        });
        let order: Vec<&str> = ranked.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, vec!["hobbit one", "hobbit two", "hobbit three"]);
    }

    #[test]
    fn short_tokens_ignored() {
        // "of" and "to" are below the three-character floor
        let score = relevance_score("of to", "", Some("of to"), None);
        assert_eq!(score, 0);
    }
}
