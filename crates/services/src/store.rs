//! The session state store: canonical deck/card data plus the transient study
//! session built over it.
//!
//! Every mutation validates fully before touching state. Data mutations arm the
//! autosave timer and notify the render hook; navigation and flips only render.
//! Timers are deadlines against the injected `Clock` and fire from `tick`.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use flashcards_core::EngineConfig;
use flashcards_core::model::{Card, CardId, Collection, Deck, DeckId, MergeReport};
use flashcards_core::search::{self, SearchResult};
use flashcards_core::session::{Direction, Mode, Session};

use crate::Clock;
use crate::error::{ErrorKind, InterchangeError, PersistenceError, StoreError};
use crate::interchange::{self, ExportPayload, plural};
use crate::notice::{Notice, NoticeBoard, NoticeLevel};
use crate::persistence::{DiscardReason, LoadOutcome, Loaded, PersistenceAdapter, StorageInfo};
use crate::scheduler::{Debouncer, TaskHandle};

pub type RenderHook = Box<dyn FnMut() + Send>;

/// Read-only snapshot of what the study screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyView<'a> {
    pub deck: Option<&'a Deck>,
    pub card: Option<&'a Card>,
    /// 1-based position of `card` in the presentation order; 0 when empty.
    pub position: usize,
    pub total: usize,
    pub progress_percent: u32,
    pub flipped: bool,
    pub mode: Mode,
    pub query: &'a str,
    /// Search status line, e.g. `"2 of 6 match"`.
    pub summary: String,
    pub deck_card_count: usize,
}

/// What a `tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub search_applied: bool,
    pub saved: bool,
    pub notice_expired: bool,
}

pub struct StudyStore {
    collection: Collection,
    session: Session,
    config: EngineConfig,
    clock: Clock,
    rng: StdRng,
    persistence: PersistenceAdapter,
    autosave: Debouncer<()>,
    search: Debouncer<String>,
    notices: NoticeBoard,
    render: Option<RenderHook>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl StudyStore {
    #[must_use]
    pub fn new(
        collection: Collection,
        persistence: PersistenceAdapter,
        clock: Clock,
        config: EngineConfig,
    ) -> Self {
        Self {
            collection,
            session: Session::new(),
            rng: StdRng::from_os_rng(),
            persistence,
            autosave: Debouncer::new(config.autosave_delay),
            search: Debouncer::new(config.search_debounce),
            notices: NoticeBoard::new(config.notice_timeout),
            render: None,
            last_saved_at: None,
            clock,
            config,
        }
    }

    /// Loads the stored collection (or `default`) and selects the first deck
    /// when none is active.
    pub async fn load(
        persistence: PersistenceAdapter,
        default: Collection,
        clock: Clock,
        config: EngineConfig,
    ) -> Self {
        let Loaded {
            mut collection,
            outcome,
        } = persistence.load(default).await;

        if collection.active_deck_id.is_none() {
            collection.active_deck_id = collection.decks.first().map(|d| d.id().clone());
        }

        let mut store = Self::new(collection, persistence, clock, config);
        let problem = match outcome {
            LoadOutcome::Stored | LoadOutcome::Empty => None,
            LoadOutcome::Discarded(DiscardReason::VersionMismatch { .. }) => {
                Some("Saved data is from another version; starting with defaults")
            }
            LoadOutcome::Discarded(_) => Some("Saved data could not be read; starting with defaults"),
            LoadOutcome::Partial(_) => Some("Some saved data was invalid and has been reset"),
        };
        if let Some(message) = problem {
            let now = store.clock.now();
            store
                .notices
                .post(NoticeLevel::Warning, Some(ErrorKind::Persistence), message, now);
        }
        store
    }

    /// Makes shuffles reproducible.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Installs the callback invoked after every visible change.
    #[must_use]
    pub fn with_render_hook(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.render = Some(Box::new(hook));
        self
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Lets tests and drivers advance a fixed clock.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[must_use]
    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.persistence
    }

    #[must_use]
    pub fn decks(&self) -> &[Deck] {
        &self.collection.decks
    }

    #[must_use]
    pub fn deck(&self, id: &DeckId) -> Option<&Deck> {
        self.collection.deck(id)
    }

    #[must_use]
    pub fn cards(&self, deck_id: &DeckId) -> &[Card] {
        self.collection.cards(deck_id)
    }

    #[must_use]
    pub fn active_deck_id(&self) -> Option<&DeckId> {
        self.collection.active_deck_id.as_ref()
    }

    #[must_use]
    pub fn active_deck(&self) -> Option<&Deck> {
        self.active_deck_id().and_then(|id| self.collection.deck(id))
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    #[must_use]
    pub fn search_query(&self) -> &str {
        self.session.query()
    }

    /// Query typed but not yet applied.
    #[must_use]
    pub fn pending_search(&self) -> Option<&str> {
        self.search.pending_payload().map(String::as_str)
    }

    #[must_use]
    pub fn has_pending_save(&self) -> bool {
        self.autosave.is_pending()
    }

    #[must_use]
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    #[must_use]
    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.current()
    }

    /// The card under the cursor, if a session exists for the active deck.
    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        let deck = self.active_deck_id()?;
        if !self.session.is_built_for(deck) {
            return None;
        }
        let position = self.session.current_position()?;
        self.collection.cards(deck).get(position)
    }

    /// Search over the active deck with the applied query.
    #[must_use]
    pub fn search_result(&self) -> SearchResult<'_> {
        let cards = self
            .active_deck_id()
            .map_or(&[][..], |id| self.collection.cards(id));
        search::filter(cards, self.session.query())
    }

    #[must_use]
    pub fn view(&self) -> StudyView<'_> {
        let deck = self.active_deck();
        let built = deck.is_some_and(|d| self.session.is_built_for(d.id()));
        let total = if built { self.session.order().len() } else { 0 };
        let card = self.current_card();
        let position = if card.is_some() {
            self.session.cursor() + 1
        } else {
            0
        };
        let progress_percent = if total == 0 {
            0
        } else {
            u32::try_from((position * 100 + total / 2) / total).unwrap_or(100)
        };

        StudyView {
            deck,
            card,
            position,
            total,
            progress_percent,
            flipped: self.session.is_flipped(),
            mode: self.session.mode(),
            query: self.session.query(),
            summary: self.search_result().summary(),
            deck_card_count: deck.map_or(0, |d| self.collection.cards(d.id()).len()),
        }
    }

    //
    // ─── DECKS ─────────────────────────────────────────────────────────────────
    //

    /// Creates a deck with a trimmed name.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Deck` (and posts a warning) if the name is blank,
    /// and `StoreError::IdsExhausted` once no fresh deck id is left.
    pub fn create_deck(&mut self, name: &str) -> Result<DeckId, StoreError> {
        let id = self
            .collection
            .peek_deck_id()
            .ok_or_else(|| self.reject(StoreError::IdsExhausted("deck")))?;
        let deck = Deck::new(id.clone(), name, self.clock.stamp())
            .map_err(|e| self.reject(e.into()))?;

        self.collection.allocate_deck_id();
        let message = format!("Created deck: \"{}\"", deck.name());
        self.collection.cards_by_deck_id.insert(id.clone(), Vec::new());
        self.collection.decks.push(deck);

        log::info!("created deck {id}");
        self.notify(NoticeLevel::Success, message);
        self.changed();
        Ok(id)
    }

    /// Renames a deck.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DeckNotFound` for unknown ids and
    /// `StoreError::Deck` (with a warning) for blank names.
    pub fn rename_deck(&mut self, id: &DeckId, name: &str) -> Result<(), StoreError> {
        let renamed = match self.collection.deck_mut(id) {
            None => return Err(self.reject(StoreError::DeckNotFound(id.clone()))),
            Some(deck) => deck.rename(name).map(|old| (old, deck.name().to_owned())),
        };
        let (old, new) = renamed.map_err(|e| self.reject(e.into()))?;

        log::info!("renamed deck {id}");
        self.notify(NoticeLevel::Success, format!("Renamed \"{old}\" to \"{new}\""));
        self.changed();
        Ok(())
    }

    /// Deletes a deck and all of its cards.
    ///
    /// If it was active, the first remaining deck becomes active and the
    /// session is rebuilt for it; with no decks left the store returns to
    /// browse mode.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DeckNotFound` for unknown ids.
    pub fn delete_deck(&mut self, id: &DeckId) -> Result<(), StoreError> {
        let Some(index) = self.collection.decks.iter().position(|d| d.id() == id) else {
            return Err(self.reject(StoreError::DeckNotFound(id.clone())));
        };

        let deck = self.collection.decks.remove(index);
        self.collection.cards_by_deck_id.remove(id);

        if self.collection.active_deck_id.as_ref() == Some(id) {
            self.collection.active_deck_id =
                self.collection.decks.first().map(|d| d.id().clone());
            self.search.cancel();
            self.session.set_query("");
            if self.collection.active_deck_id.is_some() {
                self.rebuild_order();
            } else {
                self.session.rebuild(None, Vec::new());
                self.session.set_mode(Mode::Browse);
            }
        } else if self.session.is_built_for(id) {
            self.rebuild_order();
        }

        log::info!("deleted deck {id}");
        self.notify(NoticeLevel::Success, format!("Deleted deck: \"{}\"", deck.name()));
        self.changed();
        Ok(())
    }

    /// Makes a deck active and starts studying it from the top with no query.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DeckNotFound` for unknown ids; nothing changes.
    pub fn select_deck(&mut self, id: &DeckId) -> Result<(), StoreError> {
        if !self.collection.contains_deck(id) {
            return Err(self.reject(StoreError::DeckNotFound(id.clone())));
        }

        self.collection.active_deck_id = Some(id.clone());
        self.search.cancel();
        self.session.set_query("");
        self.rebuild_order();
        self.session.set_mode(Mode::Study);

        log::debug!("selected deck {id}");
        self.changed();
        Ok(())
    }

    //
    // ─── CARDS ─────────────────────────────────────────────────────────────────
    //

    /// Adds a card at the end of a deck.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DeckNotFound` for unknown decks,
    /// `StoreError::Card` (with a warning) for a blank front and
    /// `StoreError::IdsExhausted` once no fresh card id is left.
    pub fn add_card(
        &mut self,
        deck_id: &DeckId,
        front: &str,
        back: &str,
    ) -> Result<CardId, StoreError> {
        if !self.collection.contains_deck(deck_id) {
            return Err(self.reject(StoreError::DeckNotFound(deck_id.clone())));
        }
        let id = self
            .collection
            .peek_card_id()
            .ok_or_else(|| self.reject(StoreError::IdsExhausted("card")))?;
        let card = Card::new(id.clone(), front, back, self.clock.stamp())
            .map_err(|e| self.reject(e.into()))?;

        self.collection.allocate_card_id();
        let visible = self.matches_query(&card);
        let cards = self
            .collection
            .cards_by_deck_id
            .entry(deck_id.clone())
            .or_default();
        cards.push(card);
        let position = cards.len() - 1;

        if self.session.is_built_for(deck_id) && visible {
            self.session.push_position(position);
        }

        log::info!("added card {id} to {deck_id}");
        self.notify(NoticeLevel::Success, "Card added");
        self.changed();
        Ok(id)
    }

    /// Edits a card. A blank side keeps its current value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DeckNotFound` or `StoreError::CardNotFound` for
    /// unknown ids.
    pub fn update_card(
        &mut self,
        deck_id: &DeckId,
        card_id: &CardId,
        front: &str,
        back: &str,
    ) -> Result<(), StoreError> {
        let position = self.locate_card(deck_id, card_id)?;
        let now = self.clock.stamp();
        let needle = search::normalize_query(self.session.query());

        let Some(card) = self
            .collection
            .cards_by_deck_id
            .get_mut(deck_id)
            .and_then(|cards| cards.get_mut(position))
        else {
            return Err(self.reject(StoreError::CardNotFound(card_id.clone())));
        };
        card.apply_edit(front, back, now);
        let visible = needle.is_empty() || card.matches_lowercase(&needle);

        if self.session.is_built_for(deck_id) {
            if visible {
                self.session.push_position(position);
            } else {
                self.session.hide_position(position);
            }
        }

        log::info!("updated card {card_id}");
        self.notify(NoticeLevel::Success, "Card updated");
        self.changed();
        Ok(())
    }

    /// Removes a card, keeping the cursor inside the shrunk order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DeckNotFound` or `StoreError::CardNotFound` for
    /// unknown ids.
    pub fn delete_card(&mut self, deck_id: &DeckId, card_id: &CardId) -> Result<(), StoreError> {
        let position = self.locate_card(deck_id, card_id)?;
        if let Some(cards) = self.collection.cards_by_deck_id.get_mut(deck_id) {
            cards.remove(position);
        }
        if self.session.is_built_for(deck_id) {
            self.session.remove_position(position);
        }

        log::info!("deleted card {card_id}");
        self.notify(NoticeLevel::Success, "Card deleted");
        self.changed();
        Ok(())
    }

    //
    // ─── SEARCH ────────────────────────────────────────────────────────────────
    //

    /// Applies a query immediately: the order is rebuilt from the filtered
    /// cards and the cursor returns to the first card. Any pending debounced
    /// query is dropped.
    pub fn set_search_query(&mut self, query: &str) {
        self.search.cancel();
        self.apply_query(query);
    }

    /// Schedules `query` to apply once input has been quiet for the debounce
    /// window. Each call supersedes the previous one.
    pub fn queue_search(&mut self, query: impl Into<String>) -> TaskHandle {
        let now = self.clock.now();
        self.search.arm(query.into(), now)
    }

    /// Applies the debounced query for `handle` if it is still current and due.
    pub fn fire_search(&mut self, handle: TaskHandle) -> bool {
        let now = self.clock.now();
        match self.search.fire(handle, now) {
            Some(query) => {
                self.apply_query(&query);
                true
            }
            None => false,
        }
    }

    /// Drops a typed-but-unapplied query.
    pub fn cancel_pending_search(&mut self) -> Option<String> {
        self.search.cancel()
    }

    pub fn clear_search(&mut self) {
        self.set_search_query("");
    }

    //
    // ─── STUDY ─────────────────────────────────────────────────────────────────
    //

    /// Randomly reorders the visible cards and rewinds to the first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NothingToShuffle` (with a warning) if no card is
    /// visible.
    pub fn shuffle(&mut self) -> Result<(), StoreError> {
        self.ensure_session();
        if !self.session.shuffle(&mut self.rng) {
            return Err(self.reject(StoreError::NothingToShuffle));
        }
        self.notify(NoticeLevel::Info, "Deck shuffled");
        self.render();
        Ok(())
    }

    /// Moves one card forward or back, wrapping at both ends.
    pub fn advance(&mut self, direction: Direction) -> bool {
        let moved = self.session.advance(direction);
        if moved {
            self.render();
        }
        moved
    }

    /// Shows the other side of the current card. Returns the new state.
    ///
    /// Without a current card nothing changes and `false` is returned.
    pub fn toggle_flip(&mut self) -> bool {
        if self.current_card().is_none() {
            return false;
        }
        let flipped = self.session.toggle_flip();
        self.render();
        flipped
    }

    /// Switches to study mode.
    ///
    /// The order is built when no session exists for the active deck;
    /// otherwise the previous order and position are resumed. Returns `false`
    /// without an active deck.
    pub fn enter_study_mode(&mut self) -> bool {
        if self.active_deck_id().is_none() {
            return false;
        }
        self.ensure_session();
        self.session.clamp_cursor();
        self.session.set_mode(Mode::Study);
        self.render();
        true
    }

    /// Returns to browse mode, keeping the order for the next visit.
    pub fn exit_study_mode(&mut self) {
        self.session.set_mode(Mode::Browse);
        self.render();
    }

    //
    // ─── IMPORT / EXPORT ───────────────────────────────────────────────────────
    //

    /// Merges imported decks into the collection.
    pub fn import(&mut self, payload: ExportPayload) -> MergeReport {
        let report = self
            .collection
            .merge(payload.decks, payload.cards_by_deck_id);
        if self.collection.active_deck_id.is_none() {
            self.collection.active_deck_id =
                self.collection.decks.first().map(|d| d.id().clone());
        }

        log::info!(
            "imported {} decks, {} cards ({} ids reassigned)",
            report.decks_added,
            report.cards_added,
            report.ids_reassigned
        );
        if report.skipped > 0 {
            log::warn!("import skipped {} entries: no fresh ids left", report.skipped);
        }
        self.notify(
            NoticeLevel::Success,
            format!("Imported {}", plural(report.decks_added, "deck")),
        );
        self.changed();
        report
    }

    /// Serializes every deck and card as an export file.
    ///
    /// # Errors
    ///
    /// Returns `InterchangeError::Json` if serialization fails.
    pub fn export(&self) -> Result<String, InterchangeError> {
        interchange::export(
            &self.collection,
            &self.config.export_version,
            self.clock.stamp(),
        )
    }

    //
    // ─── TIMERS & PERSISTENCE ──────────────────────────────────────────────────
    //

    /// Fires whatever timers are due: a debounced query, the autosave and the
    /// notice timeout.
    pub async fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::default();

        if let Some(query) = self.search.take_due(now) {
            self.apply_query(&query);
            report.search_applied = true;
        }
        if self.autosave.take_due(now).is_some() {
            report.saved = self.save_now().await.is_ok();
        }
        if self.notices.expire(now) {
            report.notice_expired = true;
            self.render();
        }
        report
    }

    /// Writes a pending autosave immediately.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the write fails; a warning is posted too.
    pub async fn flush(&mut self) -> Result<(), PersistenceError> {
        if self.autosave.take_now().is_some() {
            self.save_now().await?;
        }
        Ok(())
    }

    /// Reports what is currently stored under the persistence key.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the backend cannot be read.
    pub async fn storage_info(&self) -> Result<StorageInfo, PersistenceError> {
        self.persistence.info().await
    }

    /// Removes the stored value and drops any pending autosave. The in-memory
    /// collection is untouched.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the backend refuses the removal.
    pub async fn clear_storage(&mut self) -> Result<(), PersistenceError> {
        self.autosave.cancel();
        self.persistence.clear().await?;
        self.last_saved_at = None;
        log::info!("cleared stored data under {}", self.persistence.key());
        self.notify(NoticeLevel::Info, "Saved data cleared");
        Ok(())
    }

    /// Posts a notice and re-renders.
    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let now = self.clock.now();
        self.notices.post(level, None, message, now);
        self.render();
    }

    async fn save_now(&mut self) -> Result<(), PersistenceError> {
        let now = self.clock.now();
        match self.persistence.save(&self.collection, now).await {
            Ok(_) => {
                self.last_saved_at = Some(now);
                log::info!("auto-saved");
                Ok(())
            }
            Err(err) => {
                let message = if err.is_quota_exceeded() {
                    "Storage is full; changes are kept in memory only".to_owned()
                } else {
                    format!("Failed to save changes: {err}")
                };
                self.notices
                    .post(NoticeLevel::Warning, Some(err.kind()), message, now);
                self.render();
                Err(err)
            }
        }
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    /// Logs a failed operation; validation failures also post a warning.
    fn reject(&mut self, err: StoreError) -> StoreError {
        let kind = err.kind();
        match kind {
            ErrorKind::Validation => {
                log::warn!("{err}");
                let now = self.clock.now();
                self.notices
                    .post(NoticeLevel::Warning, Some(kind), err.to_string(), now);
                self.render();
            }
            ErrorKind::NotFound | ErrorKind::Persistence => log::debug!("ignored: {err}"),
        }
        err
    }

    fn changed(&mut self) {
        let now = self.clock.now();
        self.autosave.arm((), now);
        self.render();
    }

    fn render(&mut self) {
        if let Some(hook) = self.render.as_mut() {
            hook();
        }
    }

    fn apply_query(&mut self, query: &str) {
        self.session.set_query(query);
        if self.active_deck_id().is_some() {
            self.rebuild_order();
        }
        log::debug!("applied search {query:?}");
        self.render();
    }

    fn rebuild_order(&mut self) {
        let deck = self.collection.active_deck_id.clone();
        let positions = deck.as_ref().map_or_else(Vec::new, |id| {
            search::filter(self.collection.cards(id), self.session.query()).positions
        });
        self.session.rebuild(deck, positions);
    }

    fn ensure_session(&mut self) {
        let built = self
            .active_deck_id()
            .is_some_and(|id| self.session.is_built_for(id));
        if !built {
            self.rebuild_order();
        }
    }

    fn matches_query(&self, card: &Card) -> bool {
        let needle = search::normalize_query(self.session.query());
        needle.is_empty() || card.matches_lowercase(&needle)
    }

    fn locate_card(&mut self, deck_id: &DeckId, card_id: &CardId) -> Result<usize, StoreError> {
        if !self.collection.contains_deck(deck_id) {
            return Err(self.reject(StoreError::DeckNotFound(deck_id.clone())));
        }
        match self
            .collection
            .cards(deck_id)
            .iter()
            .position(|c| c.id() == card_id)
        {
            Some(position) => Ok(position),
            None => Err(self.reject(StoreError::CardNotFound(card_id.clone()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Duration;
    use flashcards_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryStore;

    fn store_with(collection: Collection) -> StudyStore {
        let persistence =
            PersistenceAdapter::new(Arc::new(InMemoryStore::new()), "test", 1);
        StudyStore::new(collection, persistence, fixed_clock(), EngineConfig::default())
            .with_rng_seed(42)
    }

    fn spanish() -> (StudyStore, DeckId, CardId, CardId) {
        let mut store = store_with(Collection::empty());
        let deck = store.create_deck("Spanish").unwrap();
        let hola = store.add_card(&deck, "Hola", "Hello").unwrap();
        let adios = store.add_card(&deck, "Adiós", "Goodbye").unwrap();
        (store, deck, hola, adios)
    }

    fn visible_fronts(store: &StudyStore) -> Vec<String> {
        let deck = store.active_deck_id().unwrap();
        store
            .session()
            .order()
            .iter()
            .map(|&p| store.cards(deck)[p].front().to_owned())
            .collect()
    }

    #[test]
    fn create_deck_trims_and_allocates_ids() {
        let mut store = store_with(Collection::empty());
        let id = store.create_deck("  Spanish  ").unwrap();
        assert_eq!(id, DeckId::new("deck-1"));
        assert_eq!(store.deck(&id).unwrap().name(), "Spanish");
        assert!(store.cards(&id).is_empty());
        assert_eq!(store.collection().next_deck_id, 2);
        assert!(store.has_pending_save());
    }

    #[test]
    fn blank_deck_name_changes_nothing_and_warns() {
        let mut store = store_with(Collection::empty());
        let err = store.create_deck("   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.decks().is_empty());
        assert_eq!(store.collection().next_deck_id, 1);
        assert!(!store.has_pending_save());

        let notice = store.current_notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.kind, Some(ErrorKind::Validation));
        assert_eq!(notice.message, "Deck name cannot be empty");
    }

    #[test]
    fn unknown_ids_are_silent_no_ops() {
        let (mut store, deck, _, _) = spanish();
        store.notify(NoticeLevel::Info, "marker");
        let before = store.collection().clone();

        let missing = DeckId::new("deck-99");
        assert!(matches!(
            store.rename_deck(&missing, "x"),
            Err(StoreError::DeckNotFound(_))
        ));
        assert!(store.delete_deck(&missing).is_err());
        assert!(store.select_deck(&missing).is_err());
        assert!(store.delete_card(&deck, &CardId::new("card-99")).is_err());

        assert_eq!(store.collection(), &before);
        assert_eq!(store.current_notice().unwrap().message, "marker");
    }

    #[test]
    fn rename_reports_old_and_new_names() {
        let (mut store, deck, _, _) = spanish();
        store.rename_deck(&deck, " Español ").unwrap();
        assert_eq!(store.deck(&deck).unwrap().name(), "Español");
        assert_eq!(
            store.current_notice().unwrap().message,
            "Renamed \"Spanish\" to \"Español\""
        );
        assert!(store.rename_deck(&deck, "").is_err());
        assert_eq!(store.deck(&deck).unwrap().name(), "Español");
    }

    #[test]
    fn deleting_active_deck_falls_back_to_first() {
        let (mut store, spanish, _, _) = spanish();
        let french = store.create_deck("French").unwrap();
        store.add_card(&french, "Bonjour", "Hello").unwrap();
        store.select_deck(&french).unwrap();

        store.delete_deck(&french).unwrap();
        assert!(!store.collection().cards_by_deck_id.contains_key(&french));
        assert_eq!(store.active_deck_id(), Some(&spanish));
        assert_eq!(store.session().order().len(), 2);

        store.delete_deck(&spanish).unwrap();
        assert_eq!(store.active_deck_id(), None);
        assert_eq!(store.mode(), Mode::Browse);
        assert!(store.collection().cards_by_deck_id.is_empty());
    }

    #[test]
    fn select_deck_resets_session_and_enters_study() {
        let (mut store, deck, _, _) = spanish();
        store.set_search_query("hola");
        store.queue_search("adi");
        store.select_deck(&deck).unwrap();

        assert_eq!(store.mode(), Mode::Study);
        assert_eq!(store.search_query(), "");
        assert_eq!(store.pending_search(), None);
        assert_eq!(store.session().cursor(), 0);
        assert_eq!(visible_fronts(&store), ["Hola", "Adiós"]);
    }

    #[test]
    fn blank_front_is_rejected_on_add() {
        let (mut store, deck, _, _) = spanish();
        let err = store.add_card(&deck, "  ", "back").unwrap_err();
        assert_eq!(err, StoreError::Card(flashcards_core::model::CardError::EmptyFront));
        assert_eq!(store.cards(&deck).len(), 2);
        assert_eq!(store.collection().next_card_id, 3);
    }

    #[test]
    fn blank_edit_keeps_existing_values() {
        let mut store = store_with(Collection::empty());
        let deck = store.create_deck("D").unwrap();
        let card = store.add_card(&deck, "X", "Y").unwrap();
        store.clock_mut().advance(Duration::minutes(1));

        store.update_card(&deck, &card, "", "").unwrap();
        let stored = &store.cards(&deck)[0];
        assert_eq!(stored.front(), "X");
        assert_eq!(stored.back(), "Y");
        assert_eq!(stored.updated_at(), Some(fixed_now() + Duration::minutes(1)));
    }

    #[test]
    fn deleting_last_card_clamps_cursor() {
        let (mut store, deck, _, adios) = spanish();
        store.select_deck(&deck).unwrap();
        store.advance(Direction::Forward);
        assert_eq!(store.session().cursor(), 1);

        store.delete_card(&deck, &adios).unwrap();
        assert_eq!(store.session().cursor(), 0);
        assert_eq!(store.current_card().unwrap().front(), "Hola");
    }

    #[test]
    fn shuffle_survives_card_edits() {
        let mut store = store_with(Collection::sample(fixed_now()));
        let deck = DeckId::new("deck-1");
        store.select_deck(&deck).unwrap();
        store.shuffle().unwrap();
        let order = store.session().order().to_vec();

        let current = store.current_card().unwrap().id().clone();
        store.update_card(&deck, &current, "Hola!", "").unwrap();
        assert_eq!(store.session().order(), order.as_slice());

        let added = store.add_card(&deck, "Buenos días", "Good morning").unwrap();
        assert_eq!(store.session().order().len(), 7);
        assert_eq!(store.session().order()[..6], order[..]);
        assert!(store.cards(&deck).iter().any(|c| c.id() == &added));
    }

    #[test]
    fn shuffle_on_empty_deck_warns() {
        let mut store = store_with(Collection::empty());
        let deck = store.create_deck("Empty").unwrap();
        store.select_deck(&deck).unwrap();
        assert_eq!(store.shuffle(), Err(StoreError::NothingToShuffle));
        assert_eq!(store.current_notice().unwrap().message, "No cards to shuffle");
    }

    #[test]
    fn exit_and_reenter_resumes_position() {
        let (mut store, deck, _, _) = spanish();
        store.select_deck(&deck).unwrap();
        store.advance(Direction::Forward);
        store.toggle_flip();

        store.exit_study_mode();
        assert!(!store.session().is_flipped());
        assert!(store.enter_study_mode());
        assert_eq!(store.session().cursor(), 1);
        assert_eq!(store.view().position, 2);
    }

    #[test]
    fn enter_study_without_deck_is_refused() {
        let mut store = store_with(Collection::empty());
        assert!(!store.enter_study_mode());
        assert_eq!(store.mode(), Mode::Browse);
    }

    #[test]
    fn view_reports_progress() {
        let mut store = store_with(Collection::sample(fixed_now()));
        store.select_deck(&DeckId::new("deck-1")).unwrap();
        store.advance(Direction::Forward);

        let view = store.view();
        assert_eq!(view.position, 2);
        assert_eq!(view.total, 6);
        assert_eq!(view.progress_percent, 33);
        assert_eq!(view.summary, "6 cards");
        assert_eq!(view.card.unwrap().front(), "Adiós");
        assert_eq!(view.deck.unwrap().name(), "Spanish Basics");
    }

    #[test]
    fn render_hook_runs_for_mutations_and_navigation() {
        let renders = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&renders);
        let mut store = store_with(Collection::sample(fixed_now()))
            .with_render_hook(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        store.select_deck(&DeckId::new("deck-1")).unwrap();
        let after_select = renders.load(Ordering::SeqCst);
        assert!(after_select >= 1);

        store.advance(Direction::Forward);
        store.toggle_flip();
        assert_eq!(renders.load(Ordering::SeqCst), after_select + 2);
        assert!(store.has_pending_save());
    }

    #[test]
    fn import_merges_and_activates_first_deck_when_none() {
        let mut store = store_with(Collection::empty());
        let payload = interchange::parse_import(
            &interchange::export(&Collection::sample(fixed_now()), "1.0.0", fixed_now()).unwrap(),
        )
        .unwrap();

        let report = store.import(payload);
        assert_eq!(report.decks_added, 1);
        assert_eq!(store.active_deck_id(), Some(&DeckId::new("deck-1")));
        assert_eq!(store.current_notice().unwrap().message, "Imported 1 deck");
        assert!(store.has_pending_save());
    }

    #[test]
    fn import_with_max_suffix_keeps_ids_unique() {
        let mut store = store_with(Collection::empty());
        let payload = interchange::parse_import(
            r#"{"decks":[{"id":"deck-18446744073709551615","name":"Edge","createdAt":0}],
                "cardsByDeckId":{"deck-18446744073709551615":[
                    {"id":"card-18446744073709551615","front":"a","back":"b","createdAt":0}
                ]}}"#,
        )
        .unwrap();

        let report = store.import(payload);
        assert_eq!(report.decks_added, 1);
        assert_eq!(report.ids_reassigned, 2);
        assert_eq!(report.skipped, 0);

        let imported = store.decks()[0].id().clone();
        assert_ne!(imported.numeric_suffix(), Some(u64::MAX));
        assert!(store.collection().next_deck_id > imported.numeric_suffix().unwrap());

        let created = store.create_deck("New").unwrap();
        assert_ne!(created, imported);
        let card = store.add_card(&created, "x", "y").unwrap();
        assert_ne!(card, store.cards(&imported)[0].id().clone());
    }

    #[test]
    fn exhausted_counter_rejects_new_ids() {
        let mut collection = Collection::empty();
        collection.next_deck_id = u64::MAX;
        let mut store = store_with(collection);

        let err = store.create_deck("Spanish").unwrap_err();
        assert_eq!(err, StoreError::IdsExhausted("deck"));
        assert!(store.decks().is_empty());
        assert_eq!(store.collection().next_deck_id, u64::MAX);
        assert!(!store.has_pending_save());
        assert_eq!(store.current_notice().unwrap().message, "No more deck ids available");
    }

    #[test]
    fn flip_without_current_card_is_inert() {
        let mut store = store_with(Collection::empty());
        let deck = store.create_deck("Empty").unwrap();
        store.select_deck(&deck).unwrap();

        assert!(!store.toggle_flip());
        assert!(!store.session().is_flipped());
    }
}
