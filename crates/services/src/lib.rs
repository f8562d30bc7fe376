#![forbid(unsafe_code)]

pub mod error;
pub mod focus;
pub mod interchange;
pub mod keys;
pub mod modal;
pub mod notice;
pub mod orchestrator;
pub mod persistence;
pub mod scheduler;
pub mod store;

pub use flashcards_core::Clock;

pub use error::{AppError, ErrorKind, InterchangeError, PersistenceError, StoreError};
pub use focus::{ElementId, ElementKind, Page};
pub use interchange::ExportPayload;
pub use keys::{Key, KeyPress};
pub use modal::{DialogSpec, ModalController, Outcome};
pub use notice::{Notice, NoticeLevel};
pub use orchestrator::{DialogPurpose, ExportFile, Orchestrator, UiAction};
pub use persistence::{LoadOutcome, PersistenceAdapter, StorageInfo};
pub use store::{StudyStore, StudyView, TickReport};
