use chrono::Duration;

/// Storage key the collection envelope lives under.
pub const DEFAULT_STORAGE_KEY: &str = "flashcards_app_v1";

/// Envelope schema this build reads and writes.
pub const SCHEMA_VERSION: u32 = 1;

/// Version string stamped into export files.
pub const EXPORT_FORMAT_VERSION: &str = "1.0.0";

/// Tunables shared by the store, its timers and the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Idle time after the last mutation before the collection is written.
    pub autosave_delay: Duration,
    /// Window in which successive search inputs coalesce.
    pub search_debounce: Duration,
    /// How long a notice stays visible.
    pub notice_timeout: Duration,
    pub storage_key: String,
    pub schema_version: u32,
    pub export_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_delay: Duration::milliseconds(1000),
            search_debounce: Duration::milliseconds(300),
            notice_timeout: Duration::milliseconds(3000),
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            schema_version: SCHEMA_VERSION,
            export_version: EXPORT_FORMAT_VERSION.to_owned(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }
}
