//! Store configuration.

use std::fmt;
use std::str::FromStr;

/// How records are laid out in the ledger state and how they are queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Composite keys with ordered prefix scans.
    #[default]
    CompositeKey,
    /// JSON envelopes with rich selector queries.
    Document,
}

impl BackendKind {
    /// Returns the name used on the command line and in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CompositeKey => "composite",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "composite" | "composite-key" => Ok(Self::CompositeKey),
            "document" => Ok(Self::Document),
            other => Err(format!(
                "unknown backend {other:?}, expected \"composite\" or \"document\""
            )),
        }
    }
}

/// Configuration for opening a record store.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Storage layout and query strategy.
    pub backend: BackendKind,

    /// Whether to sync the ledger state after every accepted segment.
    pub sync_on_write: bool,
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for the composite-key backend.
    #[must_use]
    pub fn composite_key() -> Self {
        Self::new().backend(BackendKind::CompositeKey)
    }

    /// Configuration for the document backend.
    #[must_use]
    pub fn document() -> Self {
        Self::new().backend(BackendKind::Document)
    }

    /// Sets the backend.
    #[must_use]
    pub const fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Sets whether to sync after every accepted segment.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }
}
