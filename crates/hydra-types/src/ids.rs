//! Typed identifiers for documents and blocks.
//!
//! The host block-document framework hands out opaque string ids, so both ID
//! types wrap a `String` rather than a raw UUID. Locally minted ids are
//! UUIDv7 (time-ordered) in simple hex form. The `short()` form (first 8
//! chars) is for human-facing output only, never a lookup key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A document identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

/// A block identifier, unique within the host's block graph.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Mint a new time-ordered ID (UUIDv7, simple hex).
            pub fn generate() -> Self {
                Self(uuid::Uuid::now_v7().as_simple().to_string())
            }

            /// Wrap an id handed out by the host.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First 8 characters, for display only. Never use for lookup.
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(8) {
                    Some((idx, _)) => &self.0[..idx],
                    None => &self.0,
                }
            }

            /// Check if this is the empty sentinel id.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(DocumentId, "DocumentId");
impl_typed_id!(BlockId, "BlockId");

/// Address of a source block: the `(documentId, blockId)` pair a Portal
/// points at.
///
/// No back-pointers exist from source to referrers; whether the pair still
/// resolves is checked lazily through the host.
#[derive(Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub document_id: DocumentId,
    pub block_id: BlockId,
}

impl SourceRef {
    pub fn new(document_id: impl Into<DocumentId>, block_id: impl Into<BlockId>) -> Self {
        Self {
            document_id: document_id.into(),
            block_id: block_id.into(),
        }
    }

    /// Compact key form: `"{document}/{block}"`.
    pub fn to_key(&self) -> String {
        format!("{}/{}", self.document_id, self.block_id)
    }

    /// Parse the `to_key()` form. Splits on the first `/`.
    pub fn from_key(key: &str) -> Option<Self> {
        let (doc, block) = key.split_once('/')?;
        if doc.is_empty() || block.is_empty() {
            return None;
        }
        Some(Self::new(doc, block))
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.document_id, self.block_id)
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SourceRef({}/{})",
            self.document_id.short(),
            self.block_id.short()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
