//! Text deltas and positional edit operations.
//!
//! A [`Delta`] is what the host's CRDT text buffer reports for a local edit
//! inside a mirror: a walk of retain/insert/delete ops over the old text. An
//! [`EditOperation`] is the single positional splice the propagator derives
//! from it and applies to the source buffer.
//!
//! All indices and lengths are in Unicode scalar values (chars), never bytes.

use serde::{Deserialize, Serialize};

/// One op of a text delta.
///
/// Serializes in the familiar delta shape: `{"retain": 5}`,
/// `{"insert": "abc"}`, `{"delete": 2}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaOp {
    /// Skip over `n` chars of the existing text.
    Retain(usize),
    /// Insert text at the current position.
    Insert(String),
    /// Delete `n` chars at the current position.
    Delete(usize),
}

/// An ordered sequence of delta ops.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta(pub Vec<DeltaOp>);

impl Delta {
    pub fn new(ops: Vec<DeltaOp>) -> Self {
        Self(ops)
    }

    /// Builder: append a retain.
    pub fn retain(mut self, n: usize) -> Self {
        self.0.push(DeltaOp::Retain(n));
        self
    }

    /// Builder: append an insert.
    pub fn insert(mut self, text: impl Into<String>) -> Self {
        self.0.push(DeltaOp::Insert(text.into()));
        self
    }

    /// Builder: append a delete.
    pub fn delete(mut self, n: usize) -> Self {
        self.0.push(DeltaOp::Delete(n));
        self
    }

    pub fn ops(&self) -> &[DeltaOp] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single positional edit, tagged by kind.
///
/// `index` is always interpreted against the text as it is at apply time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditOperation {
    Insert {
        index: usize,
        text: String,
    },
    Delete {
        index: usize,
        delete_count: usize,
    },
    Replace {
        index: usize,
        text: String,
        delete_count: usize,
    },
}

impl EditOperation {
    /// Position the edit applies at.
    pub fn index(&self) -> usize {
        match self {
            EditOperation::Insert { index, .. }
            | EditOperation::Delete { index, .. }
            | EditOperation::Replace { index, .. } => *index,
        }
    }

    /// Text inserted by this edit (empty for deletes).
    pub fn inserted_text(&self) -> &str {
        match self {
            EditOperation::Insert { text, .. } | EditOperation::Replace { text, .. } => text,
            EditOperation::Delete { .. } => "",
        }
    }

    /// Number of chars inserted.
    pub fn insert_len(&self) -> usize {
        self.inserted_text().chars().count()
    }

    /// Number of chars removed.
    pub fn delete_len(&self) -> usize {
        match self {
            EditOperation::Delete { delete_count, .. }
            | EditOperation::Replace { delete_count, .. } => *delete_count,
            EditOperation::Insert { .. } => 0,
        }
    }

    /// Kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EditOperation::Insert { .. } => "insert",
            EditOperation::Delete { .. } => "delete",
            EditOperation::Replace { .. } => "replace",
        }
    }
}

// ============================================================================
// Char-offset helpers
// ============================================================================

/// Length of `text` in chars.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of char position `pos`, or `None` if `pos > char_len(text)`.
///
/// `pos == char_len(text)` maps to `text.len()` (the end of the string).
pub fn byte_offset(text: &str, pos: usize) -> Option<usize> {
    if pos == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte_idx, _) in text.char_indices() {
        if count == pos {
            return Some(byte_idx);
        }
        count += 1;
    }
    (count == pos).then_some(text.len())
}

/// Splice `text`: remove `delete_count` chars at `index`, then insert
/// `insert` there. Returns `None` when the range falls outside the text.
pub fn splice_chars(text: &str, index: usize, delete_count: usize, insert: &str) -> Option<String> {
    let end = index.checked_add(delete_count)?;
    let start_byte = byte_offset(text, index)?;
    let end_byte = byte_offset(text, end)?;

    let mut out = String::with_capacity(text.len() + insert.len());
    out.push_str(&text[..start_byte]);
    out.push_str(insert);
    out.push_str(&text[end_byte..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_serializes_in_delta_shape() {
        let delta = Delta::default().retain(3).insert("hi").delete(1);
        let json = serde_json::to_string(&delta).unwrap();
        assert_eq!(json, r#"[{"retain":3},{"insert":"hi"},{"delete":1}]"#);

        let parsed: Delta = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, delta);
    }

    #[test]
    fn test_edit_operation_lengths() {
        let op = EditOperation::Replace {
            index: 2,
            text: "héllo".into(),
            delete_count: 3,
        };
        assert_eq!(op.index(), 2);
        assert_eq!(op.insert_len(), 5);
        assert_eq!(op.delete_len(), 3);
        assert_eq!(op.kind(), "replace");

        let op = EditOperation::Delete { index: 0, delete_count: 4 };
        assert_eq!(op.insert_len(), 0);
        assert_eq!(op.inserted_text(), "");
    }

    #[test]
    fn test_byte_offset_multibyte() {
        let text = "aé漢b";
        assert_eq!(byte_offset(text, 0), Some(0));
        assert_eq!(byte_offset(text, 1), Some(1));
        assert_eq!(byte_offset(text, 2), Some(3));
        assert_eq!(byte_offset(text, 3), Some(6));
        assert_eq!(byte_offset(text, 4), Some(7));
        assert_eq!(byte_offset(text, 5), None);
        assert_eq!(byte_offset("", 0), Some(0));
        assert_eq!(byte_offset("", 1), None);
    }

    #[test]
    fn test_splice_chars() {
        assert_eq!(splice_chars("hello", 5, 0, "!").as_deref(), Some("hello!"));
        assert_eq!(splice_chars("hello", 0, 1, "J").as_deref(), Some("Jello"));
        assert_eq!(splice_chars("héllo", 1, 1, "e").as_deref(), Some("hello"));
        assert_eq!(splice_chars("hello", 4, 2, ""), None);
        assert_eq!(splice_chars("hello", 6, 0, "x"), None);
    }

    #[test]
    fn test_edit_operation_tagged_serde() {
        let op = EditOperation::Insert { index: 1, text: "x".into() };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "insert");
        assert_eq!(json["index"], 1);
    }
}
