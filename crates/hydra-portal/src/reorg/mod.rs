//! Auto-reorganization: watch a document, then suggest new Portals.
//!
//! [`AutoReorgWatcher`] debounces whole-document change events and hands an
//! [`AutoReorgContext`](hydra_types::AutoReorgContext) to a trigger.
//! [`AutoReorgPipeline`] is the usual trigger: it asks the external
//! [`ConceptSearch`] service for related blocks and runs the placement
//! engine on each hit.

pub mod config;
pub mod pipeline;
pub mod timer;
pub mod watcher;

pub use config::AutoReorgConfig;
pub use pipeline::{AutoReorgPipeline, ConceptSearch};
pub use timer::{ManualTimer, Timer, TimerHandle, TimerTask, TokioTimer};
pub use watcher::{
    AutoReorgWatcher, TriggerCallback, WatchHandle, WatchState, WatchStats, build_context,
    create_auto_reorg_observer,
};
