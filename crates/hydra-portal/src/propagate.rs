//! Edit propagation from a mirror back into its source.
//!
//! ```text
//! local edit in mirror
//!        │  Delta (retain/insert/delete walk)
//!        ▼
//! delta_to_edit_operation ──► EditOperation (one positional splice)
//!        │
//!        ▼
//! detect_edit_conflict (flag only, the CRDT merges)
//!        │
//!        ▼
//! apply_edit_to_buffer ──► source TextBuffer::splice
//!        │
//!        ▼
//! buffer change event ──► every observer, including the originating mirror
//! ```
//!
//! The two transforms are pure. Only [`apply_edit_to_buffer`] and
//! [`propagate_delta`] touch a buffer, and each does so with exactly one
//! synchronous splice, so no offset is ever carried across an await.

use hydra_blocks::{BlockHost, TextBuffer};
use hydra_types::{Delta, DeltaOp, EditOperation, SourceRef, char_len, splice_chars};

use crate::error::{PortalError, Result};

/// Derive the single positional edit a delta describes.
///
/// Retains advance the index; the first insert or delete found yields the
/// operation. An insert directly followed by a delete (or the reverse) is one
/// `Replace`. Later ops are ignored. A delta with no insert or delete yields
/// `None`.
pub fn delta_to_edit_operation(delta: &Delta) -> Option<EditOperation> {
    let mut index = 0usize;
    let mut ops = delta.ops().iter().peekable();

    while let Some(op) = ops.next() {
        match op {
            DeltaOp::Retain(n) => index = index.saturating_add(*n),
            DeltaOp::Insert(text) if text.is_empty() => {}
            DeltaOp::Delete(0) => {}
            DeltaOp::Insert(text) => {
                return Some(match ops.peek() {
                    Some(DeltaOp::Delete(n)) if *n > 0 => EditOperation::Replace {
                        index,
                        text: text.clone(),
                        delete_count: *n,
                    },
                    _ => EditOperation::Insert {
                        index,
                        text: text.clone(),
                    },
                });
            }
            DeltaOp::Delete(n) => {
                return Some(match ops.peek() {
                    Some(DeltaOp::Insert(text)) if !text.is_empty() => EditOperation::Replace {
                        index,
                        text: text.clone(),
                        delete_count: *n,
                    },
                    _ => EditOperation::Delete {
                        index,
                        delete_count: *n,
                    },
                });
            }
        }
    }

    None
}

/// Apply an edit to a string.
///
/// Ranges outside the text are rejected with
/// [`PortalError::InvalidEditRange`]; they are never clamped.
pub fn apply_edit_to_source(source_text: &str, op: &EditOperation) -> Result<String> {
    splice_chars(source_text, op.index(), op.delete_len(), op.inserted_text())
        .ok_or_else(|| PortalError::invalid_edit_range(op.index(), op.delete_len(), char_len(source_text)))
}

/// Versions compared by [`detect_edit_conflict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditVersions {
    /// Source version the mirror last observed.
    pub portal_last_known_version: u64,
    /// Source version right now.
    pub source_current_version: u64,
}

/// True iff the source moved since the mirror last looked.
///
/// This only reports that a concurrent write happened. Merging is the CRDT's
/// job.
pub fn detect_edit_conflict(versions: EditVersions) -> bool {
    versions.portal_last_known_version != versions.source_current_version
}

/// Apply an edit to a live buffer in one splice. Returns the new version.
pub fn apply_edit_to_buffer(buffer: &dyn TextBuffer, op: &EditOperation) -> Result<u64> {
    let len = buffer.len_chars();
    let end = op.index().saturating_add(op.delete_len());
    if op.index() > len || end > len {
        return Err(PortalError::invalid_edit_range(op.index(), op.delete_len(), len));
    }
    Ok(buffer.splice(op.index(), op.delete_len(), op.inserted_text())?)
}

/// What happened to a local mirror edit.
#[derive(Debug)]
pub enum PropagationOutcome {
    /// The edit reached the source.
    Applied {
        op: EditOperation,
        /// The source had moved since the mirror last observed it.
        conflict: bool,
        /// Source version after the edit.
        version: u64,
    },
    /// The delta carried no insert or delete.
    NoOp,
    /// The edit was dropped; re-check the sync status before the next one.
    Dropped { reason: PortalError },
}

impl PropagationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped { .. })
    }
}

/// Push a mirror's local delta into its source.
///
/// Never fails: an orphaned source or a bad range drops the edit and is
/// reported through [`PropagationOutcome::Dropped`].
#[tracing::instrument(skip(host, delta), fields(source = %source))]
pub fn propagate_delta<H>(host: &H, source: &SourceRef, delta: &Delta, last_known_version: u64) -> PropagationOutcome
where
    H: BlockHost + ?Sized,
{
    let Some(op) = delta_to_edit_operation(delta) else {
        return PropagationOutcome::NoOp;
    };

    let Some(block) = host.resolve_block(source) else {
        tracing::warn!("source orphaned mid-edit, dropping {}", op.kind());
        return PropagationOutcome::Dropped {
            reason: PortalError::SourceNotFound(source.clone()),
        };
    };
    let Some(buffer) = block.text_buffer() else {
        tracing::warn!("source lost its text buffer, dropping {}", op.kind());
        return PropagationOutcome::Dropped {
            reason: PortalError::NoTextBuffer(source.clone()),
        };
    };

    let conflict = detect_edit_conflict(EditVersions {
        portal_last_known_version: last_known_version,
        source_current_version: buffer.version(),
    });
    if conflict {
        tracing::debug!(last_known_version, current = buffer.version(), "concurrent source write");
    }

    match apply_edit_to_buffer(buffer.as_ref(), &op) {
        Ok(version) => {
            tracing::trace!(kind = op.kind(), index = op.index(), version, "edit propagated");
            PropagationOutcome::Applied { op, conflict, version }
        }
        Err(reason) => {
            tracing::warn!(error = %reason, "edit dropped");
            PropagationOutcome::Dropped { reason }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_blocks::{MemoryHost, MemoryTextBuffer};

    #[test]
    fn test_pure_retain_is_noop() {
        assert_eq!(delta_to_edit_operation(&Delta::default()), None);
        assert_eq!(delta_to_edit_operation(&Delta::default().retain(5)), None);
    }

    #[test]
    fn test_insert_at_accumulated_index() {
        let delta = Delta::default().retain(3).retain(2).insert("xy");
        assert_eq!(
            delta_to_edit_operation(&delta),
            Some(EditOperation::Insert {
                index: 5,
                text: "xy".into()
            })
        );
    }

    #[test]
    fn test_delete() {
        let delta = Delta::default().retain(1).delete(4);
        assert_eq!(
            delta_to_edit_operation(&delta),
            Some(EditOperation::Delete {
                index: 1,
                delete_count: 4
            })
        );
    }

    #[test]
    fn test_adjacent_ops_coalesce_to_replace() {
        let expected = Some(EditOperation::Replace {
            index: 2,
            text: "Z".into(),
            delete_count: 3,
        });
        assert_eq!(delta_to_edit_operation(&Delta::default().retain(2).insert("Z").delete(3)), expected);
        assert_eq!(delta_to_edit_operation(&Delta::default().retain(2).delete(3).insert("Z")), expected);
    }

    #[test]
    fn test_only_first_edit_is_taken() {
        let delta = Delta::default().insert("a").retain(4).insert("b");
        assert_eq!(
            delta_to_edit_operation(&delta),
            Some(EditOperation::Insert {
                index: 0,
                text: "a".into()
            })
        );
    }

    #[test]
    fn test_empty_ops_are_skipped() {
        let delta = Delta::default().insert("").delete(0).retain(1).delete(1);
        assert_eq!(
            delta_to_edit_operation(&delta),
            Some(EditOperation::Delete {
                index: 1,
                delete_count: 1
            })
        );
    }

    #[test]
    fn test_apply_edit_variants() {
        let insert = EditOperation::Insert {
            index: 5,
            text: ",".into(),
        };
        assert_eq!(apply_edit_to_source("Hello world", &insert).unwrap(), "Hello, world");

        let delete = EditOperation::Delete {
            index: 5,
            delete_count: 6,
        };
        assert_eq!(apply_edit_to_source("Hello world", &delete).unwrap(), "Hello");

        let replace = EditOperation::Replace {
            index: 6,
            text: "there".into(),
            delete_count: 5,
        };
        assert_eq!(apply_edit_to_source("Hello world", &replace).unwrap(), "Hello there");
    }

    #[test]
    fn test_apply_boundaries() {
        let at_end = EditOperation::Insert {
            index: 3,
            text: "!".into(),
        };
        assert_eq!(apply_edit_to_source("abc", &at_end).unwrap(), "abc!");

        let delete_all = EditOperation::Delete {
            index: 0,
            delete_count: 3,
        };
        assert_eq!(apply_edit_to_source("abc", &delete_all).unwrap(), "");

        let past_end = EditOperation::Insert {
            index: 4,
            text: "!".into(),
        };
        assert!(matches!(
            apply_edit_to_source("abc", &past_end),
            Err(PortalError::InvalidEditRange { index: 4, end: 4, len: 3 })
        ));

        let overrun = EditOperation::Delete {
            index: 2,
            delete_count: 2,
        };
        assert!(matches!(
            apply_edit_to_source("abc", &overrun),
            Err(PortalError::InvalidEditRange { index: 2, end: 4, len: 3 })
        ));
    }

    #[test]
    fn test_apply_uses_char_offsets() {
        let op = EditOperation::Replace {
            index: 1,
            text: "ö".into(),
            delete_count: 1,
        };
        assert_eq!(apply_edit_to_source("née", &op).unwrap(), "nöe");
    }

    #[test]
    fn test_conflict_detection() {
        let same = EditVersions {
            portal_last_known_version: 4,
            source_current_version: 4,
        };
        let moved = EditVersions {
            portal_last_known_version: 4,
            source_current_version: 5,
        };
        assert!(!detect_edit_conflict(same));
        assert!(detect_edit_conflict(moved));
    }

    #[test]
    fn test_apply_to_buffer_rejects_out_of_range() {
        let buffer = MemoryTextBuffer::new("abc");
        let op = EditOperation::Delete {
            index: 1,
            delete_count: 5,
        };
        assert!(matches!(
            apply_edit_to_buffer(&buffer, &op),
            Err(PortalError::InvalidEditRange { .. })
        ));
        assert_eq!(buffer.current_text(), "abc");
    }

    #[test]
    fn test_propagate_outcomes() {
        let host = MemoryHost::new();
        let doc = host.create_document("d").unwrap();
        let id = doc.append_bullet(None, "abc").unwrap();
        let source = SourceRef::new("d", id.clone());

        let noop = propagate_delta(&host, &source, &Delta::default().retain(3), 0);
        assert!(matches!(noop, PropagationOutcome::NoOp));

        let applied = propagate_delta(&host, &source, &Delta::default().retain(3).insert("d"), 0);
        match applied {
            PropagationOutcome::Applied { conflict, version, .. } => {
                assert!(!conflict);
                assert_eq!(version, 1);
            }
            other => panic!("expected Applied, got {other:?}"),
        }

        // Stale last-known version flags a conflict but still applies.
        let applied = propagate_delta(&host, &source, &Delta::default().insert(">"), 0);
        assert!(matches!(applied, PropagationOutcome::Applied { conflict: true, version: 2, .. }));
        assert_eq!(doc.block(&id).unwrap().text(), ">abcd");

        let dropped = propagate_delta(&host, &source, &Delta::default().retain(9).delete(1), 2);
        assert!(dropped.is_dropped());

        doc.delete_block(&id).unwrap();
        let orphaned = propagate_delta(&host, &source, &Delta::default().insert("x"), 2);
        assert!(matches!(
            orphaned,
            PropagationOutcome::Dropped {
                reason: PortalError::SourceNotFound(_)
            }
        ));
    }
}
