use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::card::Card;
use crate::model::deck::Deck;
use crate::model::ids::{CardId, DeckId};

/// The persisted deck/card data plus the id counters and active deck pointer.
///
/// Invariants (kept by `normalize` and by every mutation in the services
/// layer):
/// - every deck has exactly one entry in `cards_by_deck_id` and vice versa
/// - `active_deck_id` is `None` or names an existing deck
/// - both counters exceed every numeric id suffix in use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub decks: Vec<Deck>,
    pub cards_by_deck_id: BTreeMap<DeckId, Vec<Card>>,
    pub active_deck_id: Option<DeckId>,
    pub next_deck_id: u64,
    pub next_card_id: u64,
}

/// What a merge added to the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub decks_added: usize,
    pub cards_added: usize,
    pub ids_reassigned: usize,
    /// Decks and cards left out because no fresh id was available.
    pub skipped: usize,
}

impl Default for Collection {
    fn default() -> Self {
        Self::empty()
    }
}

impl Collection {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            decks: Vec::new(),
            cards_by_deck_id: BTreeMap::new(),
            active_deck_id: None,
            next_deck_id: 1,
            next_card_id: 1,
        }
    }

    /// First-run collection: one "Spanish Basics" deck with six cards.
    #[must_use]
    pub fn sample(now: DateTime<Utc>) -> Self {
        const PAIRS: [(&str, &str); 6] = [
            ("Hola", "Hello"),
            ("Adiós", "Goodbye"),
            ("Sí", "Yes"),
            ("No", "No"),
            ("Gracias", "Thank you"),
            ("Por favor", "Please"),
        ];

        let deck_id = DeckId::from_counter(1);
        let mut collection = Self::empty();
        if let Ok(deck) = Deck::new(deck_id.clone(), "Spanish Basics", now) {
            let cards = PAIRS
                .iter()
                .zip(1u64..)
                .filter_map(|((front, back), n)| {
                    Card::new(CardId::from_counter(n), front, back, now).ok()
                })
                .collect();
            collection.decks.push(deck);
            collection.cards_by_deck_id.insert(deck_id.clone(), cards);
            collection.active_deck_id = Some(deck_id);
        }
        collection.renumber_counters();
        collection
    }

    #[must_use]
    pub fn deck(&self, id: &DeckId) -> Option<&Deck> {
        self.decks.iter().find(|d| d.id() == id)
    }

    pub fn deck_mut(&mut self, id: &DeckId) -> Option<&mut Deck> {
        self.decks.iter_mut().find(|d| d.id() == id)
    }

    #[must_use]
    pub fn contains_deck(&self, id: &DeckId) -> bool {
        self.deck(id).is_some()
    }

    /// Cards of a deck in insertion order; empty for unknown decks.
    #[must_use]
    pub fn cards(&self, deck_id: &DeckId) -> &[Card] {
        self.cards_by_deck_id
            .get(deck_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.cards_by_deck_id.values().map(Vec::len).sum()
    }

    /// The id `allocate_deck_id` would hand out next, if the counter can still advance.
    #[must_use]
    pub fn peek_deck_id(&self) -> Option<DeckId> {
        self.next_deck_id
            .checked_add(1)
            .map(|_| DeckId::from_counter(self.next_deck_id))
    }

    /// The id `allocate_card_id` would hand out next, if the counter can still advance.
    #[must_use]
    pub fn peek_card_id(&self) -> Option<CardId> {
        self.next_card_id
            .checked_add(1)
            .map(|_| CardId::from_counter(self.next_card_id))
    }

    /// Hands out the next `deck-<n>` id and advances the counter.
    ///
    /// `None` once the counter is exhausted; the counter is left untouched.
    pub fn allocate_deck_id(&mut self) -> Option<DeckId> {
        let id = self.peek_deck_id()?;
        self.next_deck_id += 1;
        Some(id)
    }

    /// Hands out the next `card-<n>` id and advances the counter.
    ///
    /// `None` once the counter is exhausted; the counter is left untouched.
    pub fn allocate_card_id(&mut self) -> Option<CardId> {
        let id = self.peek_card_id()?;
        self.next_card_id += 1;
        Some(id)
    }

    /// Largest deck suffix a counter can step past.
    #[must_use]
    pub fn max_deck_suffix(&self) -> Option<u64> {
        reachable_max(self.decks.iter().map(|d| d.id().numeric_suffix()))
    }

    /// Largest card suffix a counter can step past.
    #[must_use]
    pub fn max_card_suffix(&self) -> Option<u64> {
        reachable_max(
            self.cards_by_deck_id
                .values()
                .flatten()
                .map(|c| c.id().numeric_suffix()),
        )
    }

    /// Raises both counters above every numeric suffix in use. Never lowers them.
    ///
    /// Ids ending in `u64::MAX` are ignored here; `reassign_saturated_ids`
    /// moves them out of the way.
    pub fn renumber_counters(&mut self) {
        if let Some(next) = self.max_deck_suffix().and_then(|max| max.checked_add(1)) {
            self.next_deck_id = self.next_deck_id.max(next);
        }
        if let Some(next) = self.max_card_suffix().and_then(|max| max.checked_add(1)) {
            self.next_card_id = self.next_card_id.max(next);
        }
        self.next_deck_id = self.next_deck_id.max(1);
        self.next_card_id = self.next_card_id.max(1);
    }

    /// Gives fresh ids to decks and cards whose suffix no counter can exceed.
    ///
    /// Entities that cannot get a fresh id because the counter is exhausted
    /// are dropped. Returns how many ids were reassigned.
    pub fn reassign_saturated_ids(&mut self) -> usize {
        self.renumber_counters();
        let mut reassigned = 0;

        let decks = std::mem::take(&mut self.decks);
        for deck in decks {
            if !is_saturated(deck.id().numeric_suffix()) {
                self.decks.push(deck);
                continue;
            }
            let old = deck.id().clone();
            let cards = self.cards_by_deck_id.remove(&old);
            let Some(fresh) = self.allocate_deck_id() else {
                if self.active_deck_id.as_ref() == Some(&old) {
                    self.active_deck_id = None;
                }
                continue;
            };
            if let Some(cards) = cards {
                self.cards_by_deck_id.insert(fresh.clone(), cards);
            }
            if self.active_deck_id.as_ref() == Some(&old) {
                self.active_deck_id = Some(fresh.clone());
            }
            reassigned += 1;
            self.decks.push(deck.with_id(fresh));
        }

        let deck_ids: Vec<DeckId> = self.cards_by_deck_id.keys().cloned().collect();
        for deck_id in deck_ids {
            let Some(cards) = self.cards_by_deck_id.remove(&deck_id) else {
                continue;
            };
            let mut kept = Vec::with_capacity(cards.len());
            for card in cards {
                if !is_saturated(card.id().numeric_suffix()) {
                    kept.push(card);
                } else if let Some(fresh) = self.allocate_card_id() {
                    reassigned += 1;
                    kept.push(card.with_id(fresh));
                }
            }
            self.cards_by_deck_id.insert(deck_id, kept);
        }

        reassigned
    }

    /// Repairs a collection assembled from independently validated parts.
    ///
    /// Returns `true` when anything had to change.
    pub fn normalize(&mut self) -> bool {
        let before = (
            self.decks.len(),
            self.cards_by_deck_id.len(),
            self.active_deck_id.clone(),
            self.next_deck_id,
            self.next_card_id,
        );

        let reassigned = self.reassign_saturated_ids();

        let mut seen = HashSet::new();
        self.decks.retain(|d| seen.insert(d.id().clone()));

        self.cards_by_deck_id.retain(|id, _| seen.contains(id));
        for deck in &self.decks {
            self.cards_by_deck_id.entry(deck.id().clone()).or_default();
        }

        if let Some(active) = &self.active_deck_id {
            if !seen.contains(active) {
                self.active_deck_id = self.decks.first().map(|d| d.id().clone());
            }
        }

        self.renumber_counters();

        let after = (
            self.decks.len(),
            self.cards_by_deck_id.len(),
            self.active_deck_id.clone(),
            self.next_deck_id,
            self.next_card_id,
        );
        reassigned > 0 || before != after
    }

    /// Adds imported decks and their cards without replacing anything.
    ///
    /// Deck or card ids that collide with ids already present get fresh ids.
    /// Imported card lists whose deck is not part of `decks` are dropped.
    pub fn merge(
        &mut self,
        decks: Vec<Deck>,
        mut cards_by_deck_id: BTreeMap<DeckId, Vec<Card>>,
    ) -> MergeReport {
        let mut report = MergeReport::default();

        // Fresh ids must not collide with anything in either collection.
        let imported_deck_max = reachable_max(decks.iter().map(|d| d.id().numeric_suffix()));
        let imported_card_max = reachable_max(
            cards_by_deck_id
                .values()
                .flatten()
                .map(|c| c.id().numeric_suffix()),
        );
        if let Some(next) = imported_deck_max.and_then(|max| max.checked_add(1)) {
            self.next_deck_id = self.next_deck_id.max(next);
        }
        if let Some(next) = imported_card_max.and_then(|max| max.checked_add(1)) {
            self.next_card_id = self.next_card_id.max(next);
        }
        self.renumber_counters();

        let mut deck_ids: HashSet<DeckId> = self.decks.iter().map(|d| d.id().clone()).collect();
        let mut card_ids: HashSet<CardId> = self
            .cards_by_deck_id
            .values()
            .flatten()
            .map(|c| c.id().clone())
            .collect();

        for deck in decks {
            let original_id = deck.id().clone();
            let cards = cards_by_deck_id.remove(&original_id).unwrap_or_default();

            let taken =
                deck_ids.contains(&original_id) || is_saturated(original_id.numeric_suffix());
            let deck = if taken {
                let Some(fresh) = self.allocate_deck_id() else {
                    report.skipped += 1 + cards.len();
                    continue;
                };
                report.ids_reassigned += 1;
                deck.with_id(fresh)
            } else {
                deck
            };
            deck_ids.insert(deck.id().clone());

            let mut kept = Vec::with_capacity(cards.len());
            for card in cards {
                let taken =
                    card_ids.contains(card.id()) || is_saturated(card.id().numeric_suffix());
                let card = if taken {
                    let Some(fresh) = self.allocate_card_id() else {
                        report.skipped += 1;
                        continue;
                    };
                    report.ids_reassigned += 1;
                    card.with_id(fresh)
                } else {
                    card
                };
                card_ids.insert(card.id().clone());
                kept.push(card);
            }

            report.decks_added += 1;
            report.cards_added += kept.len();
            self.cards_by_deck_id.insert(deck.id().clone(), kept);
            self.decks.push(deck);
        }

        self.renumber_counters();
        report
    }
}

/// An id ending in `u64::MAX` can never sit below a counter.
fn is_saturated(suffix: Option<u64>) -> bool {
    suffix == Some(u64::MAX)
}

fn reachable_max(suffixes: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    suffixes.flatten().filter(|&n| n < u64::MAX).max()
}
