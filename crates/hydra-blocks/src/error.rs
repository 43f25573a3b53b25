//! Error types for host block operations.

use thiserror::Error;

use hydra_types::{BlockId, DocumentId};

/// Errors that can occur when mutating or resolving host blocks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Block not found in document.
    #[error("block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// Document not registered with the host.
    #[error("document not found: {0:?}")]
    DocumentNotFound(DocumentId),

    /// Edit position out of bounds.
    #[error("edit range {pos}..{end} out of bounds for text with length {len}")]
    PositionOutOfBounds { pos: usize, end: usize, len: usize },

    /// Invalid parent/reference block for insertion.
    #[error("reference block not found: {0:?}")]
    InvalidReference(BlockId),

    /// Duplicate block ID.
    #[error("block already exists: {0:?}")]
    DuplicateBlock(BlockId),

    /// Duplicate document ID.
    #[error("document already exists: {0:?}")]
    DuplicateDocument(DocumentId),
}
