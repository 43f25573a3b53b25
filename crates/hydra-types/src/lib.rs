//! Shared identity and data types for the Hydra portal engine.
//!
//! This crate is the leaf of the workspace: typed IDs, the Portal entity,
//! sync status, deltas and edit operations, the subtree read model, placement
//! results, and the DTOs exchanged with the concept/search service. It has
//! **no internal hydra dependencies**.
//!
//! # Key Types
//!
//! |-------------------------|-----------------------------------------------|
//! | Type                    | Purpose                                       |
//! |-------------------------|-----------------------------------------------|
//! | [`SourceRef`]           | `(DocumentId, BlockId)` a Portal points at    |
//! | [`Portal`]              | Reference-only mirror block                   |
//! | [`SyncStatus`]          | synced / stale / orphaned                     |
//! | [`Delta`]               | retain/insert/delete walk from the CRDT       |
//! | [`EditOperation`]       | Single positional splice                      |
//! | [`SubtreeNode`]         | Depth-bounded read model node                 |
//! | [`PlacementResult`]     | Parent + index for a new mirror               |
//! | [`AutoReorgContext`]    | Document snapshot handed to the search stage  |
//! |-------------------------|-----------------------------------------------|

pub mod block;
pub mod edit;
pub mod ids;
pub mod placement;
pub mod search;
pub mod subtree;
pub mod sync;

// Re-export primary types at crate root for convenience.
pub use block::{BULLET_FLAVOUR, DESCRIPTOR_FLAVOUR, DescriptorKind, PORTAL_FLAVOUR, Portal};
pub use edit::{Delta, DeltaOp, EditOperation, byte_offset, char_len, splice_chars};
pub use ids::{BlockId, DocumentId, SourceRef};
pub use placement::{PlacementReason, PlacementResult};
pub use search::{
    AutoReorgContext, Concept, PortalSuggestion, RankedMatch, SemanticSearchRequest,
};
pub use subtree::{DEFAULT_MAX_DEPTH, SubtreeFetchResult, SubtreeNode, SubtreeOptions};
pub use sync::SyncStatus;
