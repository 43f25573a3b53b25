//! Cursor transformation across a propagated edit.
//!
//! When an edit lands in the source, any cursor inside a mirror of that
//! source must move with the text. Cursors are transient: they are never
//! persisted and never shared between sessions.

use serde::{Deserialize, Serialize};

use hydra_types::EditOperation;

/// Inputs to [`transform_cursor_position`]. All values are char counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorTransform {
    pub original_position: usize,
    pub edit_index: usize,
    pub insert_length: usize,
    pub delete_length: usize,
}

impl CursorTransform {
    /// Transform for `position` across `op`.
    pub fn for_edit(position: usize, op: &EditOperation) -> Self {
        Self {
            original_position: position,
            edit_index: op.index(),
            insert_length: op.insert_len(),
            delete_length: op.delete_len(),
        }
    }
}

/// Move a cursor across an edit.
///
/// A cursor at or before the edit index is unchanged. Anything after it
/// shifts by `insert_length - delete_length`, floored at 0 and capped at
/// `usize::MAX`.
pub fn transform_cursor_position(t: CursorTransform) -> usize {
    if t.original_position <= t.edit_index {
        t.original_position
    } else {
        t.original_position
            .saturating_add(t.insert_length)
            .saturating_sub(t.delete_length)
    }
}

/// A cursor (and optional selection end) inside a mirror.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    /// Char offset of the caret.
    pub offset: usize,
    /// Other end of a selection, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_end: Option<usize>,
}

impl CursorPosition {
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            selection_end: None,
        }
    }

    pub fn with_selection(start: usize, end: usize) -> Self {
        Self {
            offset: start,
            selection_end: Some(end),
        }
    }

    /// No selection, or a selection of zero width.
    pub fn is_collapsed(&self) -> bool {
        self.selection_end.is_none_or(|end| end == self.offset)
    }

    /// Move both ends across `op`.
    pub fn transform(&mut self, op: &EditOperation) {
        self.offset = transform_cursor_position(CursorTransform::for_edit(self.offset, op));

        if let Some(end) = self.selection_end.as_mut() {
            *end = transform_cursor_position(CursorTransform::for_edit(*end, op));
        }
    }
}
