//! Placement decisions for new mirrors.

use serde::{Deserialize, Serialize};

use crate::block::DescriptorKind;
use crate::ids::BlockId;

/// Why a placement chose its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementReason {
    /// Attached under the bullet's first descriptor child.
    Descriptor,
    /// Attached directly under the bullet.
    Direct,
}

impl PlacementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementReason::Descriptor => "descriptor",
            PlacementReason::Direct => "direct",
        }
    }
}

impl std::fmt::Display for PlacementReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a new mirror should be inserted.
///
/// `insert_index` is always 0: new content is the most recently relevant and
/// sorts first among its siblings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementResult {
    pub parent_block_id: BlockId,
    pub insert_index: usize,
    pub reason: PlacementReason,
    /// Category of the chosen descriptor, when its text names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<DescriptorKind>,
}

impl PlacementResult {
    pub fn descriptor(parent: BlockId, kind: Option<DescriptorKind>) -> Self {
        Self {
            parent_block_id: parent,
            insert_index: 0,
            reason: PlacementReason::Descriptor,
            descriptor: kind,
        }
    }

    pub fn direct(parent: BlockId) -> Self {
        Self {
            parent_block_id: parent,
            insert_index: 0,
            reason: PlacementReason::Direct,
            descriptor: None,
        }
    }
}
