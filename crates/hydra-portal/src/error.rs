//! Error types for the portal engine.
//!
//! Orphaned sources, staleness, and depth cutoffs are data, not errors. What
//! lands here is either a contract violation (an edit outside the buffer) or
//! a failure in something the engine calls out to.

use thiserror::Error;

use hydra_blocks::HostError;
use hydra_types::SourceRef;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialize error: {0}")]
    RonWrite(#[from] ron::Error),
}

/// Errors that can occur in the portal engine.
#[derive(Debug, Error)]
pub enum PortalError {
    /// An edit's range falls outside the text it is applied to.
    #[error("edit range {index}..{end} out of bounds for text with length {len}")]
    InvalidEditRange {
        /// Char index the edit starts at.
        index: usize,
        /// Char index the edit's deletion ends at.
        end: usize,
        /// Char length of the text at apply time.
        len: usize,
    },

    /// The source block no longer resolves.
    #[error("source not found: {0}")]
    SourceNotFound(SourceRef),

    /// The source block exists but carries no text buffer.
    #[error("source has no text buffer: {0}")]
    NoTextBuffer(SourceRef),

    /// The host rejected a mutation.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The concept/search service failed.
    #[error("search failed: {0}")]
    Search(String),

    /// No async runtime to run on.
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

impl PortalError {
    /// Create an InvalidEditRange error for a splice of `delete_count` at `index`.
    pub fn invalid_edit_range(index: usize, delete_count: usize, len: usize) -> Self {
        Self::InvalidEditRange {
            index,
            end: index.saturating_add(delete_count),
            len,
        }
    }

    /// Wrap a search-service failure.
    pub fn search(err: impl std::fmt::Display) -> Self {
        Self::Search(err.to_string())
    }

    /// Whether the source is gone (as opposed to a bad edit or a backend failure).
    pub fn is_orphaned(&self) -> bool {
        matches!(self, Self::SourceNotFound(_) | Self::NoTextBuffer(_))
    }
}

/// Result type for portal engine operations.
pub type Result<T> = std::result::Result<T, PortalError>;
