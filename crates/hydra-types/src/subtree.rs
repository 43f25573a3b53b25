//! Read model of a source block's descendant tree.

use serde::{Deserialize, Serialize};

use crate::ids::BlockId;

/// Default traversal depth for subtree fetches.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// One materialized node of a subtree.
///
/// `children` is empty whenever traversal stopped at this node (depth cutoff,
/// or collapsed and not fetched). `child_count` always reports how many
/// children the node has in the source, so a collapsed parent can be told
/// apart from a leaf without storing a classification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeNode {
    pub id: BlockId,
    pub text: String,
    pub children: Vec<SubtreeNode>,
    pub depth: usize,
    pub is_expanded: bool,
    pub flavour: String,
    pub child_count: usize,
}

/// Options for a subtree fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeOptions {
    /// Deepest depth (root = 0) whose node is materialized.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Descend into collapsed nodes too.
    #[serde(default)]
    pub include_collapsed: bool,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for SubtreeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            include_collapsed: false,
        }
    }
}

impl SubtreeOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_include_collapsed(mut self, include_collapsed: bool) -> Self {
        self.include_collapsed = include_collapsed;
        self
    }
}

/// Result of a subtree fetch.
///
/// A missing source is reported through `error` with `root: None`; hitting
/// the depth cutoff is reported through `depth_limited`, never silently.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeFetchResult {
    pub root: Option<SubtreeNode>,
    pub total_nodes: usize,
    pub depth_limited: bool,
    pub error: Option<String>,
}

impl SubtreeFetchResult {
    /// Result for a source that did not resolve.
    pub fn not_found() -> Self {
        Self {
            root: None,
            total_nodes: 0,
            depth_limited: false,
            error: Some("source not found".to_string()),
        }
    }
}
