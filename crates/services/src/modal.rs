//! Accessible modal dialog lifecycle.
//!
//! `Closed -> Open -> Closed`. While open, focus is trapped among the dialog's
//! own elements, every key is consumed, and the page behind is hidden from
//! assistive technology. Closing (for any outcome) restores whatever element
//! was focused before `open`.

use std::collections::BTreeMap;

use crate::focus::{ElementId, ElementKind, FocusTarget, Page};
use crate::keys::{Key, KeyPress};

pub const CANCEL_ID: &str = "modal-cancel";
pub const DESTRUCTIVE_ID: &str = "modal-destructive";
pub const SUBMIT_ID: &str = "modal-submit";

/// How a dialog was closed. Escape and clicking outside are both `Cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Submit,
    Destructive,
    Cancel,
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    pub id: ElementId,
    pub label: String,
    pub value: String,
    pub placeholder: Option<String>,
    pub required: bool,
}

impl TextField {
    #[must_use]
    pub fn new(id: impl Into<ElementId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value: String::new(),
            placeholder: None,
            required: false,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(String),
    Field(TextField),
}

/// Body of a dialog, filled in by the `DialogSpec` content builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogContent {
    blocks: Vec<Block>,
}

impl DialogContent {
    pub fn paragraph(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Paragraph(text.into()));
    }

    /// Appends a text input and returns its id, handy as the initial focus.
    pub fn text_field(&mut self, field: TextField) -> ElementId {
        let id = field.id.clone();
        self.blocks.push(Block::Field(field));
        id
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn fields(&self) -> impl Iterator<Item = &TextField> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Field(f) => Some(f),
            Block::Paragraph(_) => None,
        })
    }

    fn field_mut(&mut self, id: &ElementId) -> Option<&mut TextField> {
        self.blocks.iter_mut().find_map(|b| match b {
            Block::Field(f) if &f.id == id => Some(f),
            _ => None,
        })
    }
}

/// Field values captured when a dialog closes, keyed by element id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<ElementId, String>);

impl FormValues {
    /// The value of a field, or `""` if the dialog had no such field.
    #[must_use]
    pub fn get(&self, id: &str) -> &str {
        self.0
            .get(&ElementId::new(id))
            .map_or("", String::as_str)
    }
}

//
// ─── DIALOG BUILDER ────────────────────────────────────────────────────────────
//

pub type ContentBuilder = Box<dyn FnOnce(&mut DialogContent) -> Option<ElementId> + Send>;

/// Everything needed to open a dialog. `tag` comes back unchanged in
/// `DialogClosed` so the caller knows which dialog produced the outcome.
pub struct DialogSpec<T> {
    pub title: String,
    pub tag: T,
    pub submit_label: String,
    pub cancel_label: String,
    /// The destructive control exists only when this is set.
    pub destructive_label: Option<String>,
    build_content: ContentBuilder,
}

impl<T> DialogSpec<T> {
    pub fn new(
        title: impl Into<String>,
        tag: T,
        build_content: impl FnOnce(&mut DialogContent) -> Option<ElementId> + Send + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            tag,
            submit_label: "Submit".to_owned(),
            cancel_label: "Cancel".to_owned(),
            destructive_label: None,
            build_content: Box::new(build_content),
        }
    }

    #[must_use]
    pub fn with_submit_label(mut self, label: impl Into<String>) -> Self {
        self.submit_label = label.into();
        self
    }

    #[must_use]
    pub fn with_cancel_label(mut self, label: impl Into<String>) -> Self {
        self.cancel_label = label.into();
        self
    }

    #[must_use]
    pub fn with_destructive_label(mut self, label: impl Into<String>) -> Self {
        self.destructive_label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogClosed<T> {
    pub tag: T,
    pub outcome: Outcome,
    pub values: FormValues,
}

/// Result of offering a key press to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
    /// No dialog is open; the key is free for other handlers.
    NotOpen,
    /// The dialog consumed the key and stays open.
    Handled,
    Closed(DialogClosed<T>),
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

struct OpenDialog<T> {
    title: String,
    tag: T,
    content: DialogContent,
    submit_label: String,
    cancel_label: String,
    destructive_label: Option<String>,
    focus_order: Vec<ElementId>,
    focus_index: usize,
    restore: Option<FocusTarget>,
}

impl<T> OpenDialog<T> {
    fn kind_of(&self, id: &ElementId) -> ElementKind {
        if self.content.fields().any(|f| &f.id == id) {
            ElementKind::TextInput
        } else {
            ElementKind::Button
        }
    }

    fn focused(&self) -> Option<&ElementId> {
        self.focus_order.get(self.focus_index)
    }
}

fn button_outcome(id: &ElementId) -> Option<Outcome> {
    match id.as_str() {
        SUBMIT_ID => Some(Outcome::Submit),
        DESTRUCTIVE_ID => Some(Outcome::Destructive),
        CANCEL_ID => Some(Outcome::Cancel),
        _ => None,
    }
}

/// Owns at most one open dialog.
pub struct ModalController<T> {
    open: Option<OpenDialog<T>>,
}

impl<T> Default for ModalController<T> {
    fn default() -> Self {
        Self { open: None }
    }
}

impl<T> ModalController<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.open.as_ref().map(|d| d.title.as_str())
    }

    #[must_use]
    pub fn tag(&self) -> Option<&T> {
        self.open.as_ref().map(|d| &d.tag)
    }

    #[must_use]
    pub fn content(&self) -> Option<&DialogContent> {
        self.open.as_ref().map(|d| &d.content)
    }

    /// Submit, cancel and destructive labels of the open dialog.
    #[must_use]
    pub fn labels(&self) -> Option<(&str, &str, Option<&str>)> {
        self.open.as_ref().map(|d| {
            (
                d.submit_label.as_str(),
                d.cancel_label.as_str(),
                d.destructive_label.as_deref(),
            )
        })
    }

    #[must_use]
    pub fn focus_order(&self) -> &[ElementId] {
        self.open.as_ref().map_or(&[], |d| d.focus_order.as_slice())
    }

    #[must_use]
    pub fn value(&self, id: &str) -> Option<&str> {
        let id = ElementId::new(id);
        self.open
            .as_ref()?
            .content
            .fields()
            .find(|f| f.id == id)
            .map(|f| f.value.as_str())
    }

    /// Opens a dialog.
    ///
    /// A dialog that is already open is first closed with `Outcome::Cancel`;
    /// that result is returned so the caller can route it.
    pub fn open(&mut self, page: &mut Page, spec: DialogSpec<T>) -> Option<DialogClosed<T>> {
        let displaced = self.close(page, Outcome::Cancel);

        let DialogSpec {
            title,
            tag,
            submit_label,
            cancel_label,
            destructive_label,
            build_content,
        } = spec;

        let mut content = DialogContent::default();
        let target = build_content(&mut content);

        let mut focus_order: Vec<ElementId> = content.fields().map(|f| f.id.clone()).collect();
        let first_content = focus_order.first().cloned();
        focus_order.push(CANCEL_ID.into());
        if destructive_label.is_some() {
            focus_order.push(DESTRUCTIVE_ID.into());
        }
        focus_order.push(SUBMIT_ID.into());

        let initial = target
            .filter(|id| focus_order.contains(id))
            .or(first_content)
            .unwrap_or_else(|| SUBMIT_ID.into());
        let focus_index = focus_order
            .iter()
            .position(|id| id == &initial)
            .unwrap_or(focus_order.len() - 1);

        let dialog = OpenDialog {
            title,
            tag,
            content,
            submit_label,
            cancel_label,
            destructive_label,
            focus_order,
            focus_index,
            restore: page.focused().cloned(),
        };
        log::debug!("opened dialog {:?}", dialog.title);

        let kind = dialog.kind_of(&initial);
        page.set_background_hidden(true);
        page.focus(initial, kind);
        self.open = Some(dialog);
        displaced
    }

    /// Closes the open dialog with `outcome`, restoring focus and background
    /// visibility. Returns `None` when nothing was open.
    pub fn close(&mut self, page: &mut Page, outcome: Outcome) -> Option<DialogClosed<T>> {
        let dialog = self.open.take()?;
        let values = FormValues(
            dialog
                .content
                .fields()
                .map(|f| (f.id.clone(), f.value.clone()))
                .collect(),
        );
        page.set_background_hidden(false);
        page.restore(dialog.restore);
        log::debug!("closed dialog {:?} with {outcome:?}", dialog.title);
        Some(DialogClosed {
            tag: dialog.tag,
            outcome,
            values,
        })
    }

    /// Equivalent to clicking the overlay outside the dialog body.
    pub fn click_outside(&mut self, page: &mut Page) -> Option<DialogClosed<T>> {
        self.close(page, Outcome::Cancel)
    }

    /// Activates an element: buttons close the dialog with their outcome,
    /// inputs take focus. Unknown ids are ignored.
    pub fn activate(&mut self, page: &mut Page, id: &str) -> Option<DialogClosed<T>> {
        let id = ElementId::new(id);
        let outcome = {
            let dialog = self.open.as_ref()?;
            if !dialog.focus_order.contains(&id) {
                return None;
            }
            button_outcome(&id)
        };
        match outcome {
            Some(outcome) => self.close(page, outcome),
            None => {
                self.focus(page, id.as_str());
                None
            }
        }
    }

    /// Moves focus to an element of the open dialog.
    ///
    /// Returns `false` (leaving focus alone) for ids outside the dialog.
    pub fn focus(&mut self, page: &mut Page, id: &str) -> bool {
        let id = ElementId::new(id);
        let Some(dialog) = self.open.as_mut() else {
            return false;
        };
        let Some(index) = dialog.focus_order.iter().position(|e| e == &id) else {
            return false;
        };
        dialog.focus_index = index;
        let kind = dialog.kind_of(&id);
        page.focus(id, kind);
        true
    }

    /// Replaces the text of an input.
    pub fn set_value(&mut self, id: &str, text: impl Into<String>) -> bool {
        let id = ElementId::new(id);
        match self.open.as_mut().and_then(|d| d.content.field_mut(&id)) {
            Some(field) => {
                field.value = text.into();
                true
            }
            None => false,
        }
    }

    /// Routes a key press to the open dialog.
    pub fn handle_key(&mut self, page: &mut Page, press: KeyPress) -> KeyResult<T> {
        let Some(dialog) = self.open.as_mut() else {
            return KeyResult::NotOpen;
        };
        let focused = dialog.focused().cloned();
        let on_input = focused
            .as_ref()
            .is_some_and(|id| dialog.kind_of(id) == ElementKind::TextInput);

        match press.key {
            Key::Escape => self.closed(page, Outcome::Cancel),
            Key::Tab => {
                let len = dialog.focus_order.len();
                dialog.focus_index = if press.shift {
                    (dialog.focus_index + len - 1) % len
                } else {
                    (dialog.focus_index + 1) % len
                };
                if let Some(id) = dialog.focused().cloned() {
                    let kind = dialog.kind_of(&id);
                    page.focus(id, kind);
                }
                KeyResult::Handled
            }
            Key::Enter if on_input => self.closed(page, Outcome::Submit),
            Key::Enter | Key::Space if !on_input => {
                match focused.as_ref().and_then(button_outcome) {
                    Some(outcome) => self.closed(page, outcome),
                    None => KeyResult::Handled,
                }
            }
            Key::Char(c) if on_input && !press.is_command() => {
                if let Some(field) = focused.and_then(|id| dialog.content.field_mut(&id)) {
                    field.value.push(c);
                }
                KeyResult::Handled
            }
            Key::Space if on_input => {
                if let Some(field) = focused.and_then(|id| dialog.content.field_mut(&id)) {
                    field.value.push(' ');
                }
                KeyResult::Handled
            }
            Key::Backspace if on_input => {
                if let Some(field) = focused.and_then(|id| dialog.content.field_mut(&id)) {
                    field.value.pop();
                }
                KeyResult::Handled
            }
            _ => KeyResult::Handled,
        }
    }

    fn closed(&mut self, page: &mut Page, outcome: Outcome) -> KeyResult<T> {
        match self.close(page, outcome) {
            Some(closed) => KeyResult::Closed(closed),
            None => KeyResult::NotOpen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_focus(id: &str) -> Page {
        let mut page = Page::new();
        page.focus(id, ElementKind::Button);
        page
    }

    fn confirm(tag: u8) -> DialogSpec<u8> {
        DialogSpec::new("Delete Deck?", tag, |content| {
            content.paragraph("Are you sure?");
            None
        })
        .with_submit_label("Delete")
        .with_destructive_label("Delete")
    }

    fn form(tag: u8) -> DialogSpec<u8> {
        DialogSpec::new("Rename Deck", tag, |content| {
            Some(content.text_field(
                TextField::new("rename-input", "New Name")
                    .with_value("Spanish")
                    .required(),
            ))
        })
        .with_submit_label("Save")
    }

    #[test]
    fn initial_focus_prefers_builder_target() {
        let mut page = Page::new();
        let mut modal = ModalController::new();
        modal.open(&mut page, form(1));
        assert_eq!(page.focused_id(), Some(&ElementId::new("rename-input")));
        assert!(page.focus_in_text_input());
        assert!(page.is_background_hidden());
    }

    #[test]
    fn initial_focus_falls_back_to_first_focusable() {
        let mut page = Page::new();
        let mut modal = ModalController::new();
        modal.open(
            &mut page,
            DialogSpec::new("Add New Card", 0u8, |content| {
                content.text_field(TextField::new("card-front-input", "Front"));
                content.text_field(TextField::new("card-back-input", "Back"));
                Some(ElementId::new("not-in-dialog"))
            }),
        );
        assert_eq!(page.focused_id(), Some(&ElementId::new("card-front-input")));
    }

    #[test]
    fn initial_focus_is_submit_without_inputs() {
        let mut page = Page::new();
        let mut modal = ModalController::new();
        modal.open(&mut page, confirm(0));
        assert_eq!(page.focused_id(), Some(&ElementId::new(SUBMIT_ID)));
        assert_eq!(
            modal.focus_order(),
            &[
                ElementId::new(CANCEL_ID),
                ElementId::new(DESTRUCTIVE_ID),
                ElementId::new(SUBMIT_ID)
            ]
        );
    }

    #[test]
    fn tab_wraps_within_dialog() {
        let mut page = page_with_focus("new-deck-button");
        let mut modal = ModalController::new();
        modal.open(&mut page, confirm(0));

        assert_eq!(page.focused_id(), Some(&ElementId::new(SUBMIT_ID)));
        assert_eq!(
            modal.handle_key(&mut page, Key::Tab.into()),
            KeyResult::Handled
        );
        assert_eq!(page.focused_id(), Some(&ElementId::new(CANCEL_ID)));

        modal.handle_key(&mut page, KeyPress::plain(Key::Tab).with_shift());
        assert_eq!(page.focused_id(), Some(&ElementId::new(SUBMIT_ID)));
    }

    #[test]
    fn focus_cannot_escape_to_page() {
        let mut page = page_with_focus("deck-list");
        let mut modal = ModalController::new();
        modal.open(&mut page, form(0));
        assert!(!modal.focus(&mut page, "deck-list"));
        assert_eq!(page.focused_id(), Some(&ElementId::new("rename-input")));
    }

    #[test]
    fn every_close_path_restores_focus() {
        let paths: [fn(&mut ModalController<u8>, &mut Page) -> Option<DialogClosed<u8>>; 4] = [
            |m, p| match m.handle_key(p, Key::Escape.into()) {
                KeyResult::Closed(c) => Some(c),
                _ => None,
            },
            |m, p| m.click_outside(p),
            |m, p| m.activate(p, SUBMIT_ID),
            |m, p| m.activate(p, DESTRUCTIVE_ID),
        ];
        let expected = [
            Outcome::Cancel,
            Outcome::Cancel,
            Outcome::Submit,
            Outcome::Destructive,
        ];

        for (close, outcome) in paths.into_iter().zip(expected) {
            let mut page = page_with_focus("edit-button");
            let mut modal = ModalController::new();
            modal.open(&mut page, confirm(7));
            let closed = close(&mut modal, &mut page).unwrap();
            assert_eq!(closed.outcome, outcome);
            assert_eq!(closed.tag, 7);
            assert!(!modal.is_open());
            assert_eq!(page.focused_id(), Some(&ElementId::new("edit-button")));
            assert!(!page.is_background_hidden());
        }
    }

    #[test]
    fn enter_in_input_submits_with_values() {
        let mut page = Page::new();
        let mut modal = ModalController::new();
        modal.open(&mut page, form(3));
        modal.handle_key(&mut page, Key::Backspace.into());
        modal.handle_key(&mut page, Key::Char('!').into());

        let KeyResult::Closed(closed) = modal.handle_key(&mut page, Key::Enter.into()) else {
            panic!("dialog should close");
        };
        assert_eq!(closed.outcome, Outcome::Submit);
        assert_eq!(closed.values.get("rename-input"), "Spanis!");
        assert_eq!(closed.values.get("missing"), "");
        assert_eq!(page.focused(), None);
    }

    #[test]
    fn enter_on_cancel_button_cancels() {
        let mut page = Page::new();
        let mut modal = ModalController::new();
        modal.open(&mut page, confirm(0));
        assert!(modal.focus(&mut page, CANCEL_ID));
        let KeyResult::Closed(closed) = modal.handle_key(&mut page, Key::Enter.into()) else {
            panic!("dialog should close");
        };
        assert_eq!(closed.outcome, Outcome::Cancel);
    }

    #[test]
    fn opening_second_dialog_cancels_first() {
        let mut page = page_with_focus("origin");
        let mut modal = ModalController::new();
        assert!(modal.open(&mut page, form(1)).is_none());

        let displaced = modal.open(&mut page, confirm(2)).unwrap();
        assert_eq!(displaced.tag, 1);
        assert_eq!(displaced.outcome, Outcome::Cancel);
        assert_eq!(modal.tag(), Some(&2));

        modal.click_outside(&mut page);
        assert_eq!(page.focused_id(), Some(&ElementId::new("origin")));
    }

    #[test]
    fn keys_are_ignored_when_closed() {
        let mut page = Page::new();
        let mut modal: ModalController<u8> = ModalController::new();
        assert_eq!(
            modal.handle_key(&mut page, Key::Escape.into()),
            KeyResult::NotOpen
        );
    }

    #[test]
    fn destructive_control_only_exists_when_labelled() {
        let mut page = Page::new();
        let mut modal = ModalController::new();
        modal.open(&mut page, form(0));
        assert!(modal.activate(&mut page, DESTRUCTIVE_ID).is_none());
        assert!(modal.is_open());
        assert_eq!(modal.labels(), Some(("Save", "Cancel", None)));
    }
}
