//! Portal sync status.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Consistency between a Portal's mirror and its source block.
///
/// - `Synced`: the mirror shows exactly the source text.
/// - `Stale`: the source resolves but its text differs from what the mirror
///   last observed. Transient; converges on the next observed change.
/// - `Orphaned`: the source no longer resolves. Never editable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SyncStatus {
    #[default]
    Synced,
    Stale,
    Orphaned,
}

impl SyncStatus {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Stale => "stale",
            SyncStatus::Orphaned => "orphaned",
        }
    }

    /// Orphaned mirrors are read-only at all times.
    pub fn is_editable(&self) -> bool {
        !matches!(self, SyncStatus::Orphaned)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        for status in [SyncStatus::Synced, SyncStatus::Stale, SyncStatus::Orphaned] {
            assert_eq!(SyncStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(SyncStatus::from_str("ORPHANED"), Some(SyncStatus::Orphaned));
        assert_eq!(SyncStatus::from_str("gone"), None);
    }

    #[test]
    fn test_only_orphaned_is_read_only() {
        assert!(SyncStatus::Synced.is_editable());
        assert!(SyncStatus::Stale.is_editable());
        assert!(!SyncStatus::Orphaned.is_editable());
    }
}
