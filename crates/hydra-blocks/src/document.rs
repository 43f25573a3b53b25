//! Outline document: an ordered tree of blocks, each with its own text buffer.
//!
//! # Tree Model
//!
//! Blocks form a tree via parent links. Roots and each block's children are
//! kept in explicit order. Deleting a block deletes its whole subtree.
//!
//! Text changes in any block's buffer are forwarded to document listeners as
//! [`DocumentChange::TextChanged`], so a watcher sees every mutation through
//! one subscription.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use hydra_types::{BULLET_FLAVOUR, BlockId, DESCRIPTOR_FLAVOUR, DescriptorKind, DocumentId, PORTAL_FLAVOUR};

use crate::error::HostError;
use crate::host::{
    BlockHandle, DocumentChange, DocumentListener, ListenerSet, TextBearingBlock, TextBuffer,
    TextChange, TextListener, TreeBlock, Unsubscribe, WatchedDocument,
};
use crate::text::MemoryTextBuffer;
use crate::Result;

struct BlockEntry {
    parent_id: Option<BlockId>,
    children: Vec<BlockId>,
    flavour: String,
    expanded: bool,
    text: Arc<MemoryTextBuffer>,
    forward: Unsubscribe,
}

#[derive(Default)]
struct DocState {
    blocks: HashMap<BlockId, BlockEntry>,
    roots: Vec<BlockId>,
}

impl DocState {
    fn siblings_mut(&mut self, parent_id: Option<&BlockId>) -> Option<&mut Vec<BlockId>> {
        match parent_id {
            Some(parent) => self.blocks.get_mut(parent).map(|entry| &mut entry.children),
            None => Some(&mut self.roots),
        }
    }

    /// Depth-first, pre-order walk of the whole document.
    fn walk(&self) -> Vec<BlockId> {
        let mut out = Vec::with_capacity(self.blocks.len());
        let mut stack: Vec<&BlockId> = self.roots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id.clone());
            if let Some(entry) = self.blocks.get(id) {
                stack.extend(entry.children.iter().rev());
            }
        }
        out
    }

    fn collect_subtree(&self, id: &BlockId, out: &mut Vec<BlockId>) {
        out.push(id.clone());
        if let Some(entry) = self.blocks.get(id) {
            for child in &entry.children {
                self.collect_subtree(child, out);
            }
        }
    }
}

struct DocInner {
    id: DocumentId,
    state: RwLock<DocState>,
    listeners: ListenerSet<DocumentChange>,
}

/// An in-memory outline document.
///
/// Cheap to clone; clones share the same tree.
#[derive(Clone)]
pub struct OutlineDocument {
    inner: Arc<DocInner>,
}

impl OutlineDocument {
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            inner: Arc::new(DocInner {
                id: id.into(),
                state: RwLock::new(DocState::default()),
                listeners: ListenerSet::new(),
            }),
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.inner.id
    }

    pub fn block_count(&self) -> usize {
        self.inner.state.read().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block_count() == 0
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.inner.state.read().blocks.contains_key(id)
    }

    pub fn roots(&self) -> Vec<BlockId> {
        self.inner.state.read().roots.clone()
    }

    /// Direct children of a block, in order. Empty if the block is unknown.
    pub fn children_of(&self, id: &BlockId) -> Vec<BlockId> {
        self.inner
            .state
            .read()
            .blocks
            .get(id)
            .map(|entry| entry.children.clone())
            .unwrap_or_default()
    }

    pub fn parent_of(&self, id: &BlockId) -> Option<BlockId> {
        self.inner
            .state
            .read()
            .blocks
            .get(id)
            .and_then(|entry| entry.parent_id.clone())
    }

    /// All block ids, depth-first.
    pub fn blocks_ordered(&self) -> Vec<BlockId> {
        self.inner.state.read().walk()
    }

    /// Live handle to a block.
    pub fn block(&self, id: &BlockId) -> Option<Arc<dyn BlockHandle>> {
        if !self.contains(id) {
            return None;
        }
        Some(Arc::new(MemoryBlock {
            doc: self.inner.clone(),
            id: id.clone(),
        }))
    }

    /// Concrete buffer of a block, for callers that drive remote edits.
    pub fn text_buffer(&self, id: &BlockId) -> Option<Arc<MemoryTextBuffer>> {
        self.inner
            .state
            .read()
            .blocks
            .get(id)
            .map(|entry| entry.text.clone())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a block with a fresh id.
    ///
    /// `index` is the position among its siblings; `None` appends.
    pub fn insert_block(
        &self,
        parent_id: Option<&BlockId>,
        index: Option<usize>,
        flavour: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<BlockId> {
        let id = BlockId::generate();
        self.insert_block_with_id(id.clone(), parent_id, index, flavour, text)?;
        Ok(id)
    }

    /// Insert a block with a caller-chosen id.
    pub fn insert_block_with_id(
        &self,
        id: BlockId,
        parent_id: Option<&BlockId>,
        index: Option<usize>,
        flavour: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<()> {
        let text = Arc::new(MemoryTextBuffer::new(text));

        {
            let mut state = self.inner.state.write();
            if state.blocks.contains_key(&id) {
                return Err(HostError::DuplicateBlock(id));
            }
            let siblings = match parent_id {
                Some(parent) => {
                    &mut state
                        .blocks
                        .get_mut(parent)
                        .ok_or_else(|| HostError::InvalidReference(parent.clone()))?
                        .children
                }
                None => &mut state.roots,
            };
            let at = index.unwrap_or(siblings.len()).min(siblings.len());
            siblings.insert(at, id.clone());

            let forward = text.on_change(forwarder(Arc::downgrade(&self.inner), id.clone()));
            state.blocks.insert(
                id.clone(),
                BlockEntry {
                    parent_id: parent_id.cloned(),
                    children: Vec::new(),
                    flavour: flavour.into(),
                    expanded: true,
                    text,
                    forward,
                },
            );
        }

        tracing::debug!(doc = %self.inner.id, block = %id, "block inserted");
        self.inner.listeners.emit(&DocumentChange::BlockInserted {
            block_id: id,
            parent_id: parent_id.cloned(),
        });
        Ok(())
    }

    /// Append a bullet under `parent_id` (or at the root).
    pub fn append_bullet(&self, parent_id: Option<&BlockId>, text: impl Into<String>) -> Result<BlockId> {
        self.insert_block(parent_id, None, BULLET_FLAVOUR, text)
    }

    /// Append a descriptor child labelled with `kind`.
    pub fn append_descriptor(&self, parent_id: &BlockId, kind: DescriptorKind) -> Result<BlockId> {
        self.insert_block(Some(parent_id), None, DESCRIPTOR_FLAVOUR, kind.as_str())
    }

    /// Delete a block and its whole subtree.
    pub fn delete_block(&self, id: &BlockId) -> Result<()> {
        let removed = {
            let mut state = self.inner.state.write();
            let parent_id = state
                .blocks
                .get(id)
                .ok_or_else(|| HostError::BlockNotFound(id.clone()))?
                .parent_id
                .clone();

            if let Some(siblings) = state.siblings_mut(parent_id.as_ref()) {
                siblings.retain(|sibling| sibling != id);
            }

            let mut doomed = Vec::new();
            state.collect_subtree(id, &mut doomed);
            doomed
                .iter()
                .filter_map(|block_id| state.blocks.remove(block_id))
                .collect::<Vec<_>>()
        };

        // Unhook forwarding outside the document lock.
        for mut entry in removed {
            entry.forward.unsubscribe();
        }

        tracing::debug!(doc = %self.inner.id, block = %id, "block deleted");
        self.inner
            .listeners
            .emit(&DocumentChange::BlockDeleted { block_id: id.clone() });
        Ok(())
    }

    /// Expand or collapse a block. No event when the flag is unchanged.
    pub fn set_expanded(&self, id: &BlockId, expanded: bool) -> Result<()> {
        let changed = {
            let mut state = self.inner.state.write();
            let entry = state
                .blocks
                .get_mut(id)
                .ok_or_else(|| HostError::BlockNotFound(id.clone()))?;
            let changed = entry.expanded != expanded;
            entry.expanded = expanded;
            changed
        };

        if changed {
            self.inner.listeners.emit(&DocumentChange::ExpandedChanged {
                block_id: id.clone(),
                expanded,
            });
        }
        Ok(())
    }

    /// Edit a block's text.
    pub fn edit_text(&self, id: &BlockId, pos: usize, insert: &str, delete: usize) -> Result<u64> {
        let buffer = self
            .text_buffer(id)
            .ok_or_else(|| HostError::BlockNotFound(id.clone()))?;
        buffer.splice(pos, delete, insert)
    }

    /// Append to a block's text.
    pub fn append_text(&self, id: &BlockId, text: &str) -> Result<u64> {
        let buffer = self
            .text_buffer(id)
            .ok_or_else(|| HostError::BlockNotFound(id.clone()))?;
        buffer.splice(buffer.len_chars(), 0, text)
    }
}

impl std::fmt::Debug for OutlineDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineDocument")
            .field("id", &self.inner.id)
            .field("blocks", &self.block_count())
            .finish()
    }
}

fn forwarder(doc: Weak<DocInner>, block_id: BlockId) -> TextListener {
    Arc::new(move |change: &TextChange| {
        if let Some(doc) = doc.upgrade() {
            doc.listeners.emit(&DocumentChange::TextChanged {
                block_id: block_id.clone(),
                version: change.version,
            });
        }
    })
}

fn is_bullet_flavour(flavour: &str) -> bool {
    flavour != DESCRIPTOR_FLAVOUR && flavour != PORTAL_FLAVOUR
}

impl WatchedDocument for OutlineDocument {
    fn document_id(&self) -> DocumentId {
        self.inner.id.clone()
    }

    fn document_text(&self) -> String {
        let state = self.inner.state.read();
        state
            .walk()
            .iter()
            .filter_map(|id| state.blocks.get(id))
            .map(|entry| entry.text.current_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn all_bullet_ids(&self) -> Vec<BlockId> {
        let state = self.inner.state.read();
        state
            .walk()
            .into_iter()
            .filter(|id| {
                state
                    .blocks
                    .get(id)
                    .is_some_and(|entry| is_bullet_flavour(&entry.flavour))
            })
            .collect()
    }

    fn on_change(&self, listener: DocumentListener) -> Unsubscribe {
        self.inner.listeners.add(listener)
    }
}

// ============================================================================
// MemoryBlock
// ============================================================================

/// Live view of one block. Reads go through the document, so a deleted block
/// reports no buffer and no children.
struct MemoryBlock {
    doc: Arc<DocInner>,
    id: BlockId,
}

impl TextBearingBlock for MemoryBlock {
    fn text_buffer(&self) -> Option<Arc<dyn TextBuffer>> {
        self.doc
            .state
            .read()
            .blocks
            .get(&self.id)
            .map(|entry| entry.text.clone() as Arc<dyn TextBuffer>)
    }
}

impl TreeBlock for MemoryBlock {
    fn id(&self) -> BlockId {
        self.id.clone()
    }

    fn children(&self) -> Vec<Arc<dyn BlockHandle>> {
        let state = self.doc.state.read();
        state
            .blocks
            .get(&self.id)
            .map(|entry| {
                entry
                    .children
                    .iter()
                    .map(|child| {
                        Arc::new(MemoryBlock {
                            doc: self.doc.clone(),
                            id: child.clone(),
                        }) as Arc<dyn BlockHandle>
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_expanded(&self) -> bool {
        self.doc
            .state
            .read()
            .blocks
            .get(&self.id)
            .is_some_and(|entry| entry.expanded)
    }

    fn flavour(&self) -> String {
        self.doc
            .state
            .read()
            .blocks
            .get(&self.id)
            .map(|entry| entry.flavour.clone())
            .unwrap_or_default()
    }
}
