//! Sync status derivation.

use hydra_types::SyncStatus;

/// Derive a Portal's sync status from what its observer last saw.
///
/// Pure: identical inputs always give the identical status.
pub fn compute_sync_state(source_text: Option<&str>, portal_cached_text: &str, source_exists: bool) -> SyncStatus {
    match source_text {
        None => SyncStatus::Orphaned,
        Some(_) if !source_exists => SyncStatus::Orphaned,
        Some(text) if text != portal_cached_text => SyncStatus::Stale,
        Some(_) => SyncStatus::Synced,
    }
}
