//! Capability interfaces the engine consumes from the host framework.
//!
//! The host exposes loosely-typed block objects; the engine only ever sees
//! them through these narrow traits:
//!
//! - [`TextBearingBlock`]: may own a CRDT-backed [`TextBuffer`]
//! - [`TreeBlock`]: has an id, a flavour, an expand flag, and children
//! - [`BlockHost`]: resolves a [`SourceRef`] to a live block (or nothing)
//! - [`WatchedDocument`]: whole-document change stream for auto-reorg
//!
//! Every subscription returns an [`Unsubscribe`]. Listeners are always
//! invoked with no internal lock held, so a listener may read the buffer or
//! document it is observing.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use hydra_types::{BlockId, DocumentId, SourceRef};

use crate::Result;

// ============================================================================
// Events
// ============================================================================

/// A text buffer mutation, delivered with the buffer's full new text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChange {
    pub text: String,
    /// Buffer version after the mutation.
    pub version: u64,
}

/// A whole-document change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentChange {
    /// A block's text buffer changed.
    TextChanged { block_id: BlockId, version: u64 },
    /// A block was inserted.
    BlockInserted {
        block_id: BlockId,
        parent_id: Option<BlockId>,
    },
    /// A block (and its descendants) was deleted.
    BlockDeleted { block_id: BlockId },
    /// A block was expanded or collapsed.
    ExpandedChanged { block_id: BlockId, expanded: bool },
}

impl DocumentChange {
    /// Block the change is about.
    pub fn block_id(&self) -> &BlockId {
        match self {
            DocumentChange::TextChanged { block_id, .. }
            | DocumentChange::BlockInserted { block_id, .. }
            | DocumentChange::BlockDeleted { block_id }
            | DocumentChange::ExpandedChanged { block_id, .. } => block_id,
        }
    }
}

pub type TextListener = Arc<dyn Fn(&TextChange) + Send + Sync>;
pub type DocumentListener = Arc<dyn Fn(&DocumentChange) + Send + Sync>;

// ============================================================================
// Unsubscribe
// ============================================================================

/// Releases one listener registration.
///
/// `unsubscribe()` runs the release at most once; later calls are no-ops.
/// Dropping an `Unsubscribe` does NOT release the listener: the handle that
/// owns it decides when to let go.
pub struct Unsubscribe {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Unsubscribe {
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// An already-released handle.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release the listener. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether the release has not run yet.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.is_active())
            .finish()
    }
}

// ============================================================================
// ListenerSet
// ============================================================================

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Slots<E: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Listener<E>)>,
}

/// Registration list shared by the reference host's buffers and documents.
pub struct ListenerSet<E: ?Sized> {
    slots: Arc<Mutex<Slots<E>>>,
}

impl<E: ?Sized + 'static> ListenerSet<E> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener. The returned handle removes exactly this entry.
    pub fn add(&self, listener: Listener<E>) -> Unsubscribe {
        let id = {
            let mut slots = self.slots.lock();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, listener));
            id
        };

        let weak: Weak<Mutex<Slots<E>>> = Arc::downgrade(&self.slots);
        Unsubscribe::new(move || {
            if let Some(slots) = weak.upgrade() {
                slots.lock().entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Deliver an event to every listener, in registration order.
    pub fn emit(&self, event: &E) {
        // Snapshot first: listeners run without the slot lock held.
        let listeners: Vec<Listener<E>> = self
            .slots
            .lock()
            .entries
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: ?Sized + 'static> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Capability traits
// ============================================================================

/// A CRDT-backed text buffer owned by one block.
pub trait TextBuffer: Send + Sync {
    /// Current full text.
    fn current_text(&self) -> String;

    /// Monotonic version, bumped once per mutation (local or remote).
    fn version(&self) -> u64;

    /// Length in chars.
    fn len_chars(&self) -> usize {
        self.current_text().chars().count()
    }

    /// Register a change listener.
    fn on_change(&self, listener: TextListener) -> Unsubscribe;

    /// Remove `delete_count` chars at `index` and insert `insert` there, as
    /// one synchronous mutation. Returns the new version.
    fn splice(&self, index: usize, delete_count: usize, insert: &str) -> Result<u64>;
}

/// A block that may carry text.
pub trait TextBearingBlock: Send + Sync {
    /// `None` when the block has no text buffer (or no longer exists).
    fn text_buffer(&self) -> Option<Arc<dyn TextBuffer>>;
}

/// A block in the outline tree.
pub trait TreeBlock: Send + Sync {
    fn id(&self) -> BlockId;
    /// Direct children, in order.
    fn children(&self) -> Vec<Arc<dyn BlockHandle>>;
    fn is_expanded(&self) -> bool;
    fn flavour(&self) -> String;
}

/// Everything the engine needs from one host block.
pub trait BlockHandle: TextBearingBlock + TreeBlock {
    /// Current text, or empty when the block has no buffer.
    fn text(&self) -> String {
        self.text_buffer()
            .map(|buffer| buffer.current_text())
            .unwrap_or_default()
    }
}

impl<T: TextBearingBlock + TreeBlock + ?Sized> BlockHandle for T {}

/// Resolves source references to live blocks.
pub trait BlockHost: Send + Sync {
    /// `None` if the document or block no longer exists.
    fn resolve_block(&self, source: &SourceRef) -> Option<Arc<dyn BlockHandle>>;
}

/// A document whose changes can be watched as a whole.
pub trait WatchedDocument: Send + Sync {
    fn document_id(&self) -> DocumentId;
    /// All block text, depth-first, one block per line.
    fn document_text(&self) -> String;
    /// Ids of every bullet, depth-first.
    fn all_bullet_ids(&self) -> Vec<BlockId>;
    /// Register a whole-document change listener.
    fn on_change(&self, listener: DocumentListener) -> Unsubscribe;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_unsubscribe_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let mut unsub = Unsubscribe::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(unsub.is_active());
        unsub.unsubscribe();
        unsub.unsubscribe();
        assert!(!unsub.is_active());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let mut noop = Unsubscribe::noop();
        noop.unsubscribe();
        assert!(!noop.is_active());
    }

    #[test]
    fn test_listener_set_emit_and_remove() {
        let set: ListenerSet<u32> = ListenerSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = seen.clone();
        let mut first = set.add(Arc::new(move |n: &u32| s1.lock().push(("a", *n))));
        let s2 = seen.clone();
        let _second = set.add(Arc::new(move |n: &u32| s2.lock().push(("b", *n))));

        set.emit(&1);
        first.unsubscribe();
        set.emit(&2);

        assert_eq!(*seen.lock(), vec![("a", 1), ("b", 1), ("b", 2)]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_unsubscribe_after_set_dropped_is_harmless() {
        let set: ListenerSet<u32> = ListenerSet::new();
        let mut unsub = set.add(Arc::new(|_: &u32| {}));
        drop(set);
        unsub.unsubscribe();
        assert!(!unsub.is_active());
    }
}
