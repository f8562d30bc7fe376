//! Transient study-session state: mode, presentation order, cursor, flip.
//!
//! `order` holds positions into the active deck's card list. It is either the
//! identity order of the filtered cards or a shuffled permutation of it.
//! Nothing here is persisted.

use rand::Rng;

use crate::model::DeckId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Browse,
    Study,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    #[must_use]
    pub fn step(self) -> i8 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    mode: Mode,
    /// Deck the current order was built for; `None` until first built.
    deck: Option<DeckId>,
    order: Vec<usize>,
    cursor: usize,
    flipped: bool,
    query: String,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Accessors
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn deck(&self) -> Option<&DeckId> {
        self.deck.as_ref()
    }

    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Position (into the deck's card list) under the cursor.
    #[must_use]
    pub fn current_position(&self) -> Option<usize> {
        self.order.get(self.cursor).copied()
    }

    /// True once an order exists for `deck`.
    #[must_use]
    pub fn is_built_for(&self, deck: &DeckId) -> bool {
        self.deck.as_ref() == Some(deck)
    }

    /// Replaces the order, rewinding the cursor and showing the front.
    pub fn rebuild(&mut self, deck: Option<DeckId>, positions: Vec<usize>) {
        self.deck = deck;
        self.order = positions;
        self.cursor = 0;
        self.flipped = false;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Browse {
            self.flipped = false;
        }
        self.mode = mode;
    }

    /// Moves the cursor one step with wrap-around at both ends.
    ///
    /// Returns `false` when there is nothing to move over.
    pub fn advance(&mut self, direction: Direction) -> bool {
        let len = self.order.len();
        if len == 0 {
            return false;
        }
        self.cursor = match direction {
            Direction::Forward => (self.cursor + 1) % len,
            Direction::Backward => (self.cursor + len - 1) % len,
        };
        self.flipped = false;
        true
    }

    pub fn toggle_flip(&mut self) -> bool {
        self.flipped = !self.flipped;
        self.flipped
    }

    /// Fisher-Yates over the current order: walk `i` from the last index down
    /// to 1 and swap with a partner drawn uniformly from `[0, i]`.
    ///
    /// Returns `false` (and changes nothing) when the order is empty.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.order.is_empty() {
            return false;
        }
        for i in (1..self.order.len()).rev() {
            let j = rng.random_range(0..=i);
            self.order.swap(i, j);
        }
        self.cursor = 0;
        self.flipped = false;
        true
    }

    /// Adds a newly visible card at the end of the order.
    pub fn push_position(&mut self, position: usize) {
        if !self.order.contains(&position) {
            self.order.push(position);
        }
    }

    /// Hides a card that still exists but no longer matches the query.
    pub fn hide_position(&mut self, position: usize) {
        let was_current = self.current_position() == Some(position);
        if let Some(idx) = self.order.iter().position(|&p| p == position) {
            self.order.remove(idx);
            if idx < self.cursor {
                self.cursor -= 1;
            }
            if was_current {
                self.flipped = false;
            }
            self.clamp_cursor();
        }
    }

    /// Accounts for a card removed from the deck: its entry disappears and
    /// every later position shifts down by one.
    pub fn remove_position(&mut self, position: usize) {
        self.hide_position(position);
        for p in &mut self.order {
            if *p > position {
                *p -= 1;
            }
        }
    }

    /// Keeps the cursor inside `[0, len)`; zero when the order is empty.
    pub fn clamp_cursor(&mut self) {
        self.cursor = match self.order.len() {
            0 => 0,
            len => self.cursor.min(len - 1),
        };
    }
}
