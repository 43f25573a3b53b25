//! Portal transclusion and synchronization engine.
//!
//! A Portal mirrors one source block's text elsewhere in the document graph
//! without owning it. This crate keeps mirrors in step with their source,
//! pushes mirror edits back into the source buffer, builds the depth-bounded
//! subtree a mirror displays, decides where new mirrors attach, and watches
//! documents for auto-reorganization suggestions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Rendering / UI (external)        │
//! └──────────┬──────────────────▲───────────┘
//!            │ local delta      │ SyncStatus, SubtreeNode
//!            ▼                  │
//! ┌─────────────────────────────┴───────────┐
//! │             PortalSession               │
//! │  observer → compute_sync_state          │
//! │  delta → EditOperation → splice         │
//! └──────────┬──────────────────▲───────────┘
//!            │ splice           │ TextChange
//!            ▼                  │
//! ┌─────────────────────────────┴───────────┐
//! │     BlockHost / TextBuffer (host)       │
//! └──────────▲──────────────────────────────┘
//!            │ DocumentChange
//! ┌──────────┴──────────────────────────────┐
//! │  AutoReorgWatcher → AutoReorgPipeline   │
//! │  → ConceptSearch → determine_placement  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Recoverable conditions are data: an orphaned source is
//! [`SyncStatus::Orphaned`](hydra_types::SyncStatus), a depth cutoff is
//! `depth_limited`, a dropped edit is [`PropagationOutcome::Dropped`].

pub mod cursor;
pub mod error;
pub mod observer;
pub mod placement;
pub mod portal;
pub mod propagate;
pub mod reorg;
pub mod subtree;
pub mod sync_state;

pub use cursor::{CursorPosition, CursorTransform, transform_cursor_position};
pub use error::{ConfigError, PortalError, Result};
pub use observer::{ObserverHandle, observe_source};
pub use placement::{determine_placement, is_descriptor};
pub use portal::{PortalSession, StatusListener};
pub use propagate::{
    EditVersions, PropagationOutcome, apply_edit_to_buffer, apply_edit_to_source,
    delta_to_edit_operation, detect_edit_conflict, propagate_delta,
};
pub use reorg::{
    AutoReorgConfig, AutoReorgPipeline, AutoReorgWatcher, ConceptSearch, ManualTimer, Timer,
    TimerHandle, TokioTimer, TriggerCallback, WatchHandle, WatchState, WatchStats,
    create_auto_reorg_observer,
};
pub use subtree::{
    NodeClass, TextBufferCache, count_visible_nodes, fetch_subtree, fetch_subtree_cached,
    flatten_subtree, has_visible_children,
};
pub use sync_state::compute_sync_state;
