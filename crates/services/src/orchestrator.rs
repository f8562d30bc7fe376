//! Input routing: keyboard events and UI actions in, store operations and
//! dialogs out.
//!
//! Keys go to an open dialog first (which consumes everything), then to the
//! global shortcuts, then to the study controls.

use flashcards_core::model::{CardId, DeckId};
use flashcards_core::session::{Direction, Mode};

use crate::error::StoreError;
use crate::focus::{ElementKind, Page};
use crate::interchange::{self, ExportPayload, plural};
use crate::keys::{Key, KeyPress};
use crate::modal::{DialogClosed, DialogSpec, KeyResult, ModalController, Outcome, TextField};
use crate::notice::NoticeLevel;
use crate::store::StudyStore;

pub const SEARCH_INPUT_ID: &str = "search-input";

const DECK_NAME_INPUT: &str = "deck-name-input";
const RENAME_INPUT: &str = "rename-input";
const CARD_FRONT_INPUT: &str = "card-front-input";
const CARD_BACK_INPUT: &str = "card-back-input";
const EDIT_FRONT_INPUT: &str = "edit-card-front";
const EDIT_BACK_INPUT: &str = "edit-card-back";

/// What a dialog was opened for; returned with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogPurpose {
    CreateDeck,
    RenameDeck(DeckId),
    DeleteDeck(DeckId),
    AddCard(DeckId),
    EditCard { deck: DeckId, card: CardId },
    ConfirmImport(Box<ExportPayload>),
}

/// Pointer and form events from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    NewDeck,
    SelectDeck(DeckId),
    RenameDeck(DeckId),
    DeleteDeck(DeckId),
    NewCard,
    EditCurrentCard,
    /// Double-click on a card in the active deck.
    EditCard(CardId),
    SearchInput(String),
    ClearSearch,
    Shuffle,
    Next,
    Previous,
    Flip,
    EnterStudy,
    ExitStudy,
    /// Contents of a file chosen for import.
    ImportText(String),
    /// The chosen import file could not be read.
    ImportUnreadable,
}

/// A serialized collection ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

pub struct Orchestrator {
    store: StudyStore,
    modal: ModalController<DialogPurpose>,
    page: Page,
}

impl Orchestrator {
    #[must_use]
    pub fn new(store: StudyStore) -> Self {
        Self {
            store,
            modal: ModalController::new(),
            page: Page::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &StudyStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StudyStore {
        &mut self.store
    }

    #[must_use]
    pub fn modal(&self) -> &ModalController<DialogPurpose> {
        &self.modal
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn into_store(self) -> StudyStore {
        self.store
    }

    //
    // ─── KEYBOARD ──────────────────────────────────────────────────────────────
    //

    /// Handles one key press. Returns `true` if something consumed it.
    pub fn handle_key(&mut self, press: KeyPress) -> bool {
        match self.modal.handle_key(&mut self.page, press) {
            KeyResult::NotOpen => {}
            KeyResult::Handled => return true,
            KeyResult::Closed(closed) => {
                self.on_dialog_closed(closed);
                return true;
            }
        }

        if press.key == Key::Escape {
            return self.handle_escape();
        }
        if self.page.focus_in_text_input() {
            return false;
        }

        if press.is_command() {
            return match press.char_lower() {
                Some('n') => {
                    self.open_create_deck();
                    true
                }
                Some('k') if self.store.active_deck_id().is_some() => {
                    self.open_add_card();
                    true
                }
                _ => false,
            };
        }

        if self.store.mode() == Mode::Study {
            return self.handle_study_key(press);
        }
        false
    }

    fn handle_study_key(&mut self, press: KeyPress) -> bool {
        match (press.key, press.char_lower()) {
            (Key::Space, _) | (_, Some('f')) => {
                self.store.toggle_flip();
            }
            (Key::ArrowRight, _) | (_, Some('n')) => {
                self.store.advance(Direction::Forward);
            }
            (Key::ArrowLeft, _) | (_, Some('p')) => {
                self.store.advance(Direction::Backward);
            }
            (_, Some('s')) => {
                settle("shuffle", self.store.shuffle());
            }
            _ => return false,
        }
        true
    }

    /// Escape always drops the search; outside text inputs it also leaves study mode.
    fn handle_escape(&mut self) -> bool {
        let cleared = self.clear_search_if_any();
        if self.store.mode() != Mode::Study || self.page.focus_in_text_input() {
            return cleared;
        }
        self.store.exit_study_mode();
        true
    }

    fn clear_search_if_any(&mut self) -> bool {
        let pending = self.store.cancel_pending_search().is_some();
        if self.store.search_query().is_empty() && !pending {
            return false;
        }
        self.store.clear_search();
        true
    }

    //
    // ─── ACTIONS ───────────────────────────────────────────────────────────────
    //

    pub fn dispatch(&mut self, action: UiAction) {
        log::trace!("dispatch {action:?}");
        match action {
            UiAction::NewDeck => self.open_create_deck(),
            UiAction::SelectDeck(id) => {
                settle("select deck", self.store.select_deck(&id));
            }
            UiAction::RenameDeck(id) => self.open_rename_deck(id),
            UiAction::DeleteDeck(id) => self.open_delete_deck(id),
            UiAction::NewCard => self.open_add_card(),
            UiAction::EditCurrentCard => {
                if let Some(card) = self.store.current_card() {
                    let id = card.id().clone();
                    self.open_edit_card(id);
                }
            }
            UiAction::EditCard(id) => self.open_edit_card(id),
            UiAction::SearchInput(text) => {
                self.page.focus(SEARCH_INPUT_ID, ElementKind::TextInput);
                self.store.queue_search(text);
            }
            UiAction::ClearSearch => self.store.clear_search(),
            UiAction::Shuffle => {
                settle("shuffle", self.store.shuffle());
            }
            UiAction::Next => {
                self.store.advance(Direction::Forward);
            }
            UiAction::Previous => {
                self.store.advance(Direction::Backward);
            }
            UiAction::Flip => {
                self.store.toggle_flip();
            }
            UiAction::EnterStudy => {
                self.store.enter_study_mode();
            }
            UiAction::ExitStudy => self.store.exit_study_mode(),
            UiAction::ImportText(text) => self.begin_import(&text),
            UiAction::ImportUnreadable => {
                self.store.notify(NoticeLevel::Error, "Failed to read file");
            }
        }
    }

    /// Serializes the collection for download and reports the result.
    pub fn export(&mut self) -> Option<ExportFile> {
        match self.store.export() {
            Ok(contents) => {
                let file_name =
                    format!("flashcards-backup-{}.json", self.store.clock().now_millis());
                self.store
                    .notify(NoticeLevel::Success, "Decks exported successfully");
                Some(ExportFile {
                    file_name,
                    contents,
                })
            }
            Err(err) => {
                log::error!("export failed: {err}");
                self.store.notify(NoticeLevel::Error, "Failed to export decks");
                None
            }
        }
    }

    /// Routes a button press inside the open dialog.
    pub fn activate_dialog_control(&mut self, id: &str) {
        if let Some(closed) = self.modal.activate(&mut self.page, id) {
            self.on_dialog_closed(closed);
        }
    }

    pub fn click_outside_dialog(&mut self) {
        if let Some(closed) = self.modal.click_outside(&mut self.page) {
            self.on_dialog_closed(closed);
        }
    }

    /// Types into a dialog input.
    pub fn set_dialog_value(&mut self, id: &str, text: impl Into<String>) -> bool {
        self.modal.set_value(id, text)
    }

    //
    // ─── DIALOGS ───────────────────────────────────────────────────────────────
    //

    fn open_dialog(&mut self, spec: DialogSpec<DialogPurpose>) {
        if let Some(displaced) = self.modal.open(&mut self.page, spec) {
            self.on_dialog_closed(displaced);
        }
    }

    fn open_create_deck(&mut self) {
        let spec = DialogSpec::new("Create New Deck", DialogPurpose::CreateDeck, |content| {
            Some(content.text_field(
                TextField::new(DECK_NAME_INPUT, "Deck Name")
                    .with_placeholder("e.g., Spanish Vocabulary")
                    .required(),
            ))
        })
        .with_submit_label("Create Deck");
        self.open_dialog(spec);
    }

    fn open_rename_deck(&mut self, id: DeckId) {
        let Some(current) = self.store.deck(&id).map(|d| d.name().to_owned()) else {
            return;
        };
        let spec = DialogSpec::new("Rename Deck", DialogPurpose::RenameDeck(id), move |content| {
            Some(content.text_field(
                TextField::new(RENAME_INPUT, "New Name")
                    .with_value(current)
                    .required(),
            ))
        })
        .with_submit_label("Save")
        .with_destructive_label("Delete Deck");
        self.open_dialog(spec);
    }

    fn open_delete_deck(&mut self, id: DeckId) {
        let Some(name) = self.store.deck(&id).map(|d| d.name().to_owned()) else {
            return;
        };
        let cards = plural(self.store.cards(&id).len(), "card");
        let spec = DialogSpec::new("Delete Deck?", DialogPurpose::DeleteDeck(id), move |content| {
            content.paragraph(format!(
                "Are you sure you want to delete \"{name}\"? This will also delete {cards}. \
                 This action cannot be undone."
            ));
            None
        })
        .with_submit_label("Delete")
        .with_destructive_label("Delete");
        self.open_dialog(spec);
    }

    fn open_add_card(&mut self) {
        let Some(deck) = self.store.active_deck_id().cloned() else {
            return;
        };
        let spec = DialogSpec::new("Add New Card", DialogPurpose::AddCard(deck), |content| {
            let front = content.text_field(
                TextField::new(CARD_FRONT_INPUT, "Front (Question)")
                    .with_placeholder("What to learn")
                    .required(),
            );
            content.text_field(
                TextField::new(CARD_BACK_INPUT, "Back (Answer)")
                    .with_placeholder("The definition or answer"),
            );
            Some(front)
        })
        .with_submit_label("Add Card");
        self.open_dialog(spec);
    }

    fn open_edit_card(&mut self, card: CardId) {
        let Some(deck) = self.store.active_deck_id().cloned() else {
            return;
        };
        let Some((front, back)) = self
            .store
            .cards(&deck)
            .iter()
            .find(|c| c.id() == &card)
            .map(|c| (c.front().to_owned(), c.back().to_owned()))
        else {
            return;
        };
        let purpose = DialogPurpose::EditCard { deck, card };
        let spec = DialogSpec::new("Edit Card", purpose, move |content| {
            let front = content.text_field(TextField::new(EDIT_FRONT_INPUT, "Front").with_value(front));
            content.text_field(TextField::new(EDIT_BACK_INPUT, "Back").with_value(back));
            Some(front)
        })
        .with_submit_label("Save")
        .with_destructive_label("Delete Card");
        self.open_dialog(spec);
    }

    fn begin_import(&mut self, text: &str) {
        let payload = match interchange::parse_import(text) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("rejected import: {err}");
                self.store
                    .notify(NoticeLevel::Error, "Failed to import file. Invalid format.");
                return;
            }
        };
        let question = payload.confirmation_message();
        let spec = DialogSpec::new(
            "Import Decks?",
            DialogPurpose::ConfirmImport(Box::new(payload)),
            move |content| {
                content.paragraph(question);
                None
            },
        )
        .with_submit_label("Import");
        self.open_dialog(spec);
    }

    fn on_dialog_closed(&mut self, closed: DialogClosed<DialogPurpose>) {
        let DialogClosed {
            tag,
            outcome,
            values,
        } = closed;

        match (tag, outcome) {
            (_, Outcome::Cancel) => {}
            (DialogPurpose::CreateDeck, _) => {
                let created = self.store.create_deck(values.get(DECK_NAME_INPUT));
                if let Some(id) = settle("create deck", created) {
                    settle("select deck", self.store.select_deck(&id));
                }
            }
            (DialogPurpose::RenameDeck(id), Outcome::Submit) => {
                settle(
                    "rename deck",
                    self.store.rename_deck(&id, values.get(RENAME_INPUT)),
                );
            }
            (DialogPurpose::RenameDeck(id) | DialogPurpose::DeleteDeck(id), _) => {
                settle("delete deck", self.store.delete_deck(&id));
            }
            (DialogPurpose::AddCard(deck), _) => {
                let added = self.store.add_card(
                    &deck,
                    values.get(CARD_FRONT_INPUT),
                    values.get(CARD_BACK_INPUT),
                );
                settle("add card", added);
            }
            (DialogPurpose::EditCard { deck, card }, Outcome::Submit) => {
                let updated = self.store.update_card(
                    &deck,
                    &card,
                    values.get(EDIT_FRONT_INPUT),
                    values.get(EDIT_BACK_INPUT),
                );
                settle("update card", updated);
            }
            (DialogPurpose::EditCard { deck, card }, Outcome::Destructive) => {
                settle("delete card", self.store.delete_card(&deck, &card));
            }
            (DialogPurpose::ConfirmImport(payload), _) => {
                self.store.import(*payload);
            }
        }
    }
}

/// Store failures are already posted as notices; here they are only traced.
fn settle<T>(action: &str, result: Result<T, StoreError>) -> Option<T> {
    result
        .map_err(|err| log::debug!("{action} not applied: {err}"))
        .ok()
}
