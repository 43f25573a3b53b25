//! Depth-bounded read model of a source block's descendants.
//!
//! [`fetch_subtree`] materializes a [`SubtreeNode`] tree; [`flatten_subtree`]
//! turns it into the depth-first sequence a renderer shows. Node classes are
//! derived on demand from `is_expanded`, `children` and `child_count`, never
//! stored.

use std::collections::HashMap;
use std::sync::Arc;

use hydra_blocks::{BlockHandle, BlockHost, TextBuffer};
use hydra_types::{BlockId, SourceRef, SubtreeFetchResult, SubtreeNode, SubtreeOptions};

// ============================================================================
// TextBufferCache
// ============================================================================

/// Caller-owned cache of resolved text buffers, keyed by block id.
///
/// Buffers are read live on every fetch; only the lookup is cached. The
/// owner invalidates entries when the tree they came from changes.
#[derive(Default)]
pub struct TextBufferCache {
    buffers: HashMap<BlockId, Arc<dyn TextBuffer>>,
}

impl TextBufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer for `block`, resolving and caching it on first use.
    pub fn buffer_for(&mut self, block: &dyn BlockHandle) -> Option<Arc<dyn TextBuffer>> {
        let id = block.id();
        if let Some(buffer) = self.buffers.get(&id) {
            return Some(buffer.clone());
        }
        let buffer = block.text_buffer()?;
        self.buffers.insert(id, buffer.clone());
        Some(buffer)
    }

    pub fn invalidate(&mut self, id: &BlockId) -> bool {
        self.buffers.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl std::fmt::Debug for TextBufferCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBufferCache")
            .field("entries", &self.buffers.len())
            .finish()
    }
}

// ============================================================================
// Fetch
// ============================================================================

/// Fetch a source block's subtree with a throwaway buffer cache.
pub fn fetch_subtree<H>(host: &H, source: &SourceRef, options: SubtreeOptions) -> SubtreeFetchResult
where
    H: BlockHost + ?Sized,
{
    fetch_subtree_cached(host, source, options, &mut TextBufferCache::new())
}

/// Fetch a source block's subtree, reusing `cache` for buffer lookups.
///
/// The root is depth 0. A node at `max_depth` is materialized but its
/// children are not; if it would have descended, `depth_limited` is set.
/// Collapsed nodes are only descended with `include_collapsed`.
#[tracing::instrument(skip(host, cache), fields(source = %source))]
pub fn fetch_subtree_cached<H>(
    host: &H,
    source: &SourceRef,
    options: SubtreeOptions,
    cache: &mut TextBufferCache,
) -> SubtreeFetchResult
where
    H: BlockHost + ?Sized,
{
    let Some(root) = host.resolve_block(source) else {
        tracing::debug!("subtree source not found");
        return SubtreeFetchResult::not_found();
    };

    let mut walk = Walk {
        options,
        cache,
        total_nodes: 0,
        depth_limited: false,
    };
    let root = walk.build(root.as_ref(), 0);

    tracing::debug!(total_nodes = walk.total_nodes, depth_limited = walk.depth_limited, "subtree fetched");
    SubtreeFetchResult {
        root: Some(root),
        total_nodes: walk.total_nodes,
        depth_limited: walk.depth_limited,
        error: None,
    }
}

struct Walk<'a> {
    options: SubtreeOptions,
    cache: &'a mut TextBufferCache,
    total_nodes: usize,
    depth_limited: bool,
}

impl Walk<'_> {
    fn build(&mut self, block: &dyn BlockHandle, depth: usize) -> SubtreeNode {
        self.total_nodes += 1;

        let text = self
            .cache
            .buffer_for(block)
            .map(|buffer| buffer.current_text())
            .unwrap_or_default();
        let is_expanded = block.is_expanded();
        let source_children = block.children();

        let mut children = Vec::new();
        let wants_children = is_expanded || self.options.include_collapsed;
        if wants_children && !source_children.is_empty() {
            if depth >= self.options.max_depth {
                self.depth_limited = true;
            } else {
                children.reserve(source_children.len());
                for child in &source_children {
                    children.push(self.build(child.as_ref(), depth + 1));
                }
            }
        }

        SubtreeNode {
            id: block.id(),
            text,
            children,
            depth,
            is_expanded,
            flavour: block.flavour(),
            child_count: source_children.len(),
        }
    }
}

// ============================================================================
// Visibility
// ============================================================================

/// Display class of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeClass {
    /// No children in the source.
    Leaf,
    /// Expanded, with children on screen.
    Parent,
    /// Has children in the source that are not on screen.
    Collapsed,
}

impl NodeClass {
    pub fn of(node: &SubtreeNode) -> Self {
        if node.child_count == 0 && node.children.is_empty() {
            NodeClass::Leaf
        } else if has_visible_children(node) {
            NodeClass::Parent
        } else {
            NodeClass::Collapsed
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            NodeClass::Leaf => "portal-node-leaf",
            NodeClass::Parent => "portal-node-parent",
            NodeClass::Collapsed => "portal-node-collapsed",
        }
    }
}

/// Whether a renderer shows any children under this node.
pub fn has_visible_children(node: &SubtreeNode) -> bool {
    node.is_expanded && !node.children.is_empty()
}

/// Depth-first, pre-order list of what a renderer shows.
///
/// Descends into a node's children iff the node is expanded.
pub fn flatten_subtree(root: &SubtreeNode) -> Vec<&SubtreeNode> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        if node.is_expanded {
            stack.extend(node.children.iter().rev());
        }
    }
    out
}

/// Number of nodes [`flatten_subtree`] yields.
pub fn count_visible_nodes(root: &SubtreeNode) -> usize {
    let below = if root.is_expanded {
        root.children.iter().map(count_visible_nodes).sum()
    } else {
        0
    };
    1 + below
}
