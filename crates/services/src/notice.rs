use chrono::{DateTime, Duration, Utc};

use crate::error::ErrorKind;

/// Severity tag of a transient message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A transient, auto-dismissing message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    /// Set when the notice reports a failure.
    pub kind: Option<ErrorKind>,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Holds the single visible notice. Posting replaces whatever was shown.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    timeout: Duration,
    current: Option<Notice>,
}

impl NoticeBoard {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            current: None,
        }
    }

    pub fn post(
        &mut self,
        level: NoticeLevel,
        kind: Option<ErrorKind>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.current = Some(Notice {
            level,
            kind,
            message: message.into(),
            expires_at: now + self.timeout,
        });
    }

    #[must_use]
    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref()
    }

    /// Dismisses the notice once its timeout has elapsed.
    ///
    /// Returns `true` if a notice was removed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        let expired = matches!(&self.current, Some(n) if n.expires_at <= now);
        if expired {
            self.current = None;
        }
        expired
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}
