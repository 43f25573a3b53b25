//! In-memory text buffer used by the reference host.
//!
//! Every mutation bumps the version once and notifies listeners with the full
//! new text, after the state lock has been released.

use std::sync::Arc;

use parking_lot::Mutex;

use hydra_types::{Delta, DeltaOp, char_len, splice_chars};

use crate::error::HostError;
use crate::host::{ListenerSet, TextBuffer, TextChange, TextListener, Unsubscribe};
use crate::Result;

struct TextState {
    text: String,
    version: u64,
}

/// A plain `String` buffer with a version counter and change listeners.
pub struct MemoryTextBuffer {
    state: Mutex<TextState>,
    listeners: ListenerSet<TextChange>,
}

impl MemoryTextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(TextState {
                text: text.into(),
                version: 0,
            }),
            listeners: ListenerSet::new(),
        }
    }

    /// Replace the whole text, as a remote collaborator would.
    pub fn set_text(&self, text: impl Into<String>) -> u64 {
        let change = {
            let mut state = self.state.lock();
            state.text = text.into();
            state.version += 1;
            TextChange {
                text: state.text.clone(),
                version: state.version,
            }
        };
        let version = change.version;
        self.listeners.emit(&change);
        version
    }

    /// Replace the text without notifying listeners.
    ///
    /// Models a mutation whose change event has not been delivered yet.
    pub fn set_text_silently(&self, text: impl Into<String>) -> u64 {
        let mut state = self.state.lock();
        state.text = text.into();
        state.version += 1;
        state.version
    }

    /// Apply every op of a delta as one mutation.
    ///
    /// This is the full reference interpretation of a delta: retains copy,
    /// inserts add, deletes skip, and any remainder is kept.
    pub fn apply_delta(&self, delta: &Delta) -> Result<u64> {
        let change = {
            let mut state = self.state.lock();
            let next = apply_delta_to(&state.text, delta)?;
            state.text = next;
            state.version += 1;
            TextChange {
                text: state.text.clone(),
                version: state.version,
            }
        };
        let version = change.version;
        self.listeners.emit(&change);
        Ok(version)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for MemoryTextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryTextBuffer")
            .field("text", &state.text)
            .field("version", &state.version)
            .finish()
    }
}

impl TextBuffer for MemoryTextBuffer {
    fn current_text(&self) -> String {
        self.state.lock().text.clone()
    }

    fn version(&self) -> u64 {
        self.state.lock().version
    }

    fn len_chars(&self) -> usize {
        char_len(&self.state.lock().text)
    }

    fn on_change(&self, listener: TextListener) -> Unsubscribe {
        self.listeners.add(listener)
    }

    fn splice(&self, index: usize, delete_count: usize, insert: &str) -> Result<u64> {
        let change = {
            let mut state = self.state.lock();
            let next = splice_chars(&state.text, index, delete_count, insert).ok_or(
                HostError::PositionOutOfBounds {
                    pos: index,
                    end: index.saturating_add(delete_count),
                    len: char_len(&state.text),
                },
            )?;
            state.text = next;
            state.version += 1;
            TextChange {
                text: state.text.clone(),
                version: state.version,
            }
        };
        let version = change.version;
        tracing::trace!(index, delete_count, insert_len = char_len(insert), version, "splice");
        self.listeners.emit(&change);
        Ok(version)
    }
}

/// Shared handle to a reference buffer.
pub type SharedTextBuffer = Arc<MemoryTextBuffer>;

fn apply_delta_to(text: &str, delta: &Delta) -> Result<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;

    for op in delta.ops() {
        match op {
            DeltaOp::Retain(n) => {
                let end = cursor.saturating_add(*n);
                if end > len {
                    return Err(HostError::PositionOutOfBounds { pos: cursor, end, len });
                }
                out.extend(&chars[cursor..end]);
                cursor = end;
            }
            DeltaOp::Insert(s) => out.push_str(s),
            DeltaOp::Delete(n) => {
                let end = cursor.saturating_add(*n);
                if end > len {
                    return Err(HostError::PositionOutOfBounds { pos: cursor, end, len });
                }
                cursor = end;
            }
        }
    }

    out.extend(&chars[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_splice_bumps_version_and_notifies() {
        let buffer = MemoryTextBuffer::new("Hello World");
        let seen = Arc::new(AtomicU64::new(0));
        let s = seen.clone();
        let _unsub = buffer.on_change(Arc::new(move |change: &TextChange| {
            assert_eq!(change.text, "Hello there World");
            s.store(change.version, Ordering::SeqCst);
        }));

        let version = buffer.splice(6, 0, "there ").unwrap();
        assert_eq!(version, 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(buffer.current_text(), "Hello there World");
    }

    #[test]
    fn test_splice_out_of_range_is_rejected() {
        let buffer = MemoryTextBuffer::new("abc");
        let err = buffer.splice(2, 5, "").unwrap_err();
        assert_eq!(err, HostError::PositionOutOfBounds { pos: 2, end: 7, len: 3 });
        assert_eq!(buffer.version(), 0);
        assert_eq!(buffer.current_text(), "abc");
    }

    #[test]
    fn test_splice_counts_chars_not_bytes() {
        let buffer = MemoryTextBuffer::new("héllo");
        buffer.splice(1, 1, "e").unwrap();
        assert_eq!(buffer.current_text(), "hello");
        assert_eq!(buffer.len_chars(), 5);
    }

    #[test]
    fn test_apply_delta_applies_every_op() {
        let buffer = MemoryTextBuffer::new("one two three");
        let delta = Delta::default().retain(4).delete(3).insert("2").retain(1).insert("!");
        buffer.apply_delta(&delta).unwrap();
        assert_eq!(buffer.current_text(), "one 2 !three");
    }

    #[test]
    fn test_apply_delta_rejects_overrun() {
        let buffer = MemoryTextBuffer::new("abc");
        assert!(buffer.apply_delta(&Delta::default().retain(2).delete(2)).is_err());
        assert_eq!(buffer.current_text(), "abc");
    }

    #[test]
    fn test_listener_can_read_buffer() {
        let buffer = Arc::new(MemoryTextBuffer::new("a"));
        let inner = Arc::downgrade(&buffer);
        let _unsub = buffer.on_change(Arc::new(move |_: &TextChange| {
            if let Some(b) = inner.upgrade() {
                assert_eq!(b.current_text(), "ab");
            }
        }));
        buffer.splice(1, 0, "b").unwrap();
    }

    #[test]
    fn test_silent_set_does_not_notify() {
        let buffer = MemoryTextBuffer::new("a");
        let hits = Arc::new(AtomicU64::new(0));
        let h = hits.clone();
        let _unsub = buffer.on_change(Arc::new(move |_: &TextChange| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(buffer.set_text_silently("b"), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        buffer.set_text("c");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
