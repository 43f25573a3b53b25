//! Host block-document capabilities for Hydra, plus an in-memory reference host.
//!
//! The portal engine never touches a concrete editor. It consumes the narrow
//! capability traits in [`host`], and this crate provides one implementation
//! of them backed by plain strings and version counters.
//!
//! # Design Philosophy
//!
//! Blocks are organized as outlines, not flat text:
//! - Every block owns its own text buffer (the CRDT sits behind [`TextBuffer`])
//! - Children are ordered and may be expanded or collapsed
//! - Descriptor children ("What", "Why", ...) categorize their parent
//!
//! # Listener Semantics
//!
//! - Every mutation bumps the affected buffer's version exactly once
//! - Listeners run after internal locks are released
//! - Subscriptions are released explicitly through [`Unsubscribe`]

mod document;
mod error;
pub mod host;
mod outline;
mod store;
mod text;

pub use document::OutlineDocument;
pub use error::HostError;
pub use host::{
    BlockHandle, BlockHost, DocumentChange, DocumentListener, ListenerSet, TextBearingBlock,
    TextBuffer, TextChange, TextListener, TreeBlock, Unsubscribe, WatchedDocument,
};
pub use outline::{BlockSnapshot, DocumentSnapshot, OutlineSnapshot};
pub use store::{HostEvent, MemoryHost, SharedMemoryHost, shared_memory_host};
pub use text::{MemoryTextBuffer, SharedTextBuffer};

/// Result type for host block operations.
pub type Result<T> = std::result::Result<T, HostError>;
