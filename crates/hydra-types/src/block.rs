//! Portal entities, block flavours, and descriptor kinds.
//!
//! ## Design: flavour + DescriptorKind
//!
//! The host tags each block with a free-form `flavour` string. The engine only
//! cares about two of them: plain bullets and descriptors. A descriptor is a
//! categorizing pseudo-child ("What", "Why", "Pros", ...) that acts as the
//! preferred attachment point for new mirrors. Which category it is lives in
//! its text and is parsed into [`DescriptorKind`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{BlockId, SourceRef};
use crate::sync::SyncStatus;

/// Flavour of an ordinary outline bullet.
pub const BULLET_FLAVOUR: &str = "hydra:bullet";

/// Flavour of a descriptor pseudo-child.
pub const DESCRIPTOR_FLAVOUR: &str = "hydra:descriptor";

/// Flavour of a Portal block (a mirror of another block).
pub const PORTAL_FLAVOUR: &str = "hydra:portal";

/// Category carried by a descriptor block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum DescriptorKind {
    What,
    Why,
    How,
    Pros,
    Cons,
}

impl DescriptorKind {
    /// Parse a descriptor label: case-insensitive, surrounding whitespace and
    /// one trailing colon ignored (`"Pros:"` → `Pros`).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let label = trimmed.strip_suffix(':').unwrap_or(trimmed).trim_end();
        <Self as FromStr>::from_str(label).ok()
    }

    /// Display label, as shown to users.
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorKind::What => "What",
            DescriptorKind::Why => "Why",
            DescriptorKind::How => "How",
            DescriptorKind::Pros => "Pros",
            DescriptorKind::Cons => "Cons",
        }
    }

    pub fn all() -> [DescriptorKind; 5] {
        [
            DescriptorKind::What,
            DescriptorKind::Why,
            DescriptorKind::How,
            DescriptorKind::Pros,
            DescriptorKind::Cons,
        ]
    }
}

impl std::fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reference-only block mirroring another block's text.
///
/// The hosting document owns the Portal's lifecycle. The Portal never owns
/// the source's text; `sync_status` is derived, never authored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portal {
    /// The Portal block itself.
    pub id: BlockId,
    /// What it mirrors.
    pub source: SourceRef,
    /// Whether the mirrored subtree is folded in the host document.
    #[serde(default)]
    pub collapsed: bool,
    /// Last derived sync status.
    #[serde(default)]
    pub sync_status: SyncStatus,
}

impl Portal {
    pub fn new(id: impl Into<BlockId>, source: SourceRef) -> Self {
        Self {
            id: id.into(),
            source,
            collapsed: false,
            sync_status: SyncStatus::Synced,
        }
    }

    /// Mint a Portal with a fresh block id.
    pub fn to_source(source: SourceRef) -> Self {
        Self::new(BlockId::generate(), source)
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }
}
