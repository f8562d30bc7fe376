//! Substring search over a deck's cards.
//!
//! Filtering is a pure function of `(cards, query)`: it never mutates its
//! inputs, keeps the original card order, and treats a blank query as "match
//! everything". Debouncing lives with the caller that owns a clock.

use crate::model::Card;

/// Outcome of filtering a card sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult<'a> {
    /// Matching cards in their original order.
    pub matched: Vec<&'a Card>,
    /// Index of each match in the input slice, parallel to `matched`.
    pub positions: Vec<usize>,
    pub match_count: usize,
    pub total_count: usize,
    /// The normalized (trimmed, lowercased) query; empty when everything matched.
    pub query: String,
}

impl SearchResult<'_> {
    /// Short status line for the search box.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.query.is_empty() {
            return format!("{} cards", self.match_count);
        }
        if self.match_count == 0 {
            return format!("No matches for \"{}\"", self.query);
        }
        format!("{} of {} match", self.match_count, self.total_count)
    }

    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.query.is_empty()
    }
}

/// Trims and lowercases a raw query.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Case-insensitive substring filter over front and back.
#[must_use]
pub fn filter<'a>(cards: &'a [Card], query: &str) -> SearchResult<'a> {
    let needle = normalize_query(query);

    let (positions, matched): (Vec<usize>, Vec<&Card>) = if needle.is_empty() {
        cards.iter().enumerate().unzip()
    } else {
        cards
            .iter()
            .enumerate()
            .filter(|(_, card)| card.matches_lowercase(&needle))
            .unzip()
    };

    SearchResult {
        match_count: matched.len(),
        total_count: cards.len(),
        matched,
        positions,
        query: needle,
    }
}

/// A piece of text split around the first occurrence of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight<'a> {
    pub before: &'a str,
    pub matched: &'a str,
    pub after: &'a str,
}

/// Locates the first case-insensitive occurrence of `query` in `text`.
///
/// Offsets are mapped back onto `text`, so characters whose lowercase form has
/// a different byte length still split on valid boundaries.
#[must_use]
pub fn highlight<'a>(text: &'a str, query: &str) -> Option<Highlight<'a>> {
    let needle = normalize_query(query);
    if needle.is_empty() || text.is_empty() {
        return None;
    }

    // For every byte of the lowered text, the span of the source char it came from.
    let mut lowered = String::with_capacity(text.len());
    let mut spans: Vec<(usize, usize)> = Vec::with_capacity(text.len());
    for (start, ch) in text.char_indices() {
        let end = start + ch.len_utf8();
        for lower in ch.to_lowercase() {
            lowered.push(lower);
            spans.extend(std::iter::repeat_n((start, end), lower.len_utf8()));
        }
    }

    let idx = lowered.find(&needle)?;
    let start = spans[idx].0;
    let end = spans[idx + needle.len() - 1].1;
    Some(Highlight {
        before: &text[..start],
        matched: &text[start..end],
        after: &text[end..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CardId;
    use crate::time::fixed_now;

    fn cards() -> Vec<Card> {
        [("Hola", "Hello"), ("Adiós", "Goodbye"), ("Gracias", "Thank you")]
            .iter()
            .enumerate()
            .map(|(i, (f, b))| Card::new(CardId::from_counter(i as u64 + 1), f, b, fixed_now()).unwrap())
            .collect()
    }

    #[test]
    fn blank_query_returns_everything_in_order() {
        let cards = cards();
        for q in ["", "   ", "\t\n"] {
            let result = filter(&cards, q);
            assert_eq!(result.positions, vec![0, 1, 2]);
            assert_eq!(result.match_count, 3);
            assert!(!result.is_filtered());
        }
    }

    #[test]
    fn matches_front_or_back_ignoring_case() {
        let cards = cards();
        let result = filter(&cards, "HOLA");
        assert_eq!(result.positions, vec![0]);
        let result = filter(&cards, "you");
        assert_eq!(result.matched[0].front(), "Gracias");
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let cards = cards();
        let result = filter(&cards, "zzz");
        assert!(result.matched.is_empty());
        assert_eq!(result.total_count, 3);
        assert_eq!(result.summary(), "No matches for \"zzz\"");
    }

    #[test]
    fn filtering_is_idempotent() {
        let cards = cards();
        let first = filter(&cards, "o");
        let again = filter(&cards, "o");
        assert_eq!(first, again);

        let narrowed: Vec<Card> = first.matched.iter().map(|c| (*c).clone()).collect();
        let second = filter(&narrowed, "o");
        assert_eq!(second.match_count, first.match_count);
        let fronts: Vec<_> = second.matched.iter().map(|c| c.front()).collect();
        let expected: Vec<_> = first.matched.iter().map(|c| c.front()).collect();
        assert_eq!(fronts, expected);
    }

    #[test]
    fn summary_variants() {
        let cards = cards();
        assert_eq!(filter(&cards, "").summary(), "3 cards");
        assert_eq!(filter(&cards, "s").summary(), "2 of 3 match");
    }

    #[test]
    fn highlight_splits_original_text() {
        let h = highlight("Por favor", "FAV").unwrap();
        assert_eq!(h.before, "Por ");
        assert_eq!(h.matched, "fav");
        assert_eq!(h.after, "or");
    }

    #[test]
    fn highlight_handles_multibyte_text() {
        let h = highlight("ADIÓS amigo", "diós").unwrap();
        assert_eq!(h.before, "A");
        assert_eq!(h.matched, "DIÓS");
        assert_eq!(h.after, " amigo");
    }

    #[test]
    fn highlight_absent_query() {
        assert!(highlight("Hola", "xyz").is_none());
        assert!(highlight("Hola", "  ").is_none());
    }
}
