//! Minimal model of the page behind the dialogs: which element has focus and
//! whether the background is hidden from assistive technology.

use std::fmt;

/// Identifier of a focusable element.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(String);

impl ElementId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    TextInput,
    Button,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTarget {
    pub id: ElementId,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    focused: Option<FocusTarget>,
    background_hidden: bool,
}

impl Page {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&mut self, id: impl Into<ElementId>, kind: ElementKind) {
        self.focused = Some(FocusTarget {
            id: id.into(),
            kind,
        });
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    #[must_use]
    pub fn focused(&self) -> Option<&FocusTarget> {
        self.focused.as_ref()
    }

    #[must_use]
    pub fn focused_id(&self) -> Option<&ElementId> {
        self.focused.as_ref().map(|t| &t.id)
    }

    /// Keyboard shortcuts are suppressed while this holds.
    #[must_use]
    pub fn focus_in_text_input(&self) -> bool {
        matches!(
            self.focused,
            Some(FocusTarget {
                kind: ElementKind::TextInput,
                ..
            })
        )
    }

    #[must_use]
    pub fn is_background_hidden(&self) -> bool {
        self.background_hidden
    }

    pub(crate) fn restore(&mut self, target: Option<FocusTarget>) {
        self.focused = target;
    }

    pub(crate) fn set_background_hidden(&mut self, hidden: bool) {
        self.background_hidden = hidden;
    }
}
