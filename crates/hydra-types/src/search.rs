//! Auto-reorganization context and the concept/search service DTOs.
//!
//! The concept extraction and semantic search backend is a black box; these
//! are the already-deserialized shapes it accepts and returns.

use serde::{Deserialize, Serialize};

use crate::ids::{BlockId, DocumentId, SourceRef};
use crate::placement::PlacementResult;

/// Snapshot of a watched document, built when the debounce timer fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoReorgContext {
    pub document_id: DocumentId,
    pub document_text: String,
    pub all_bullet_ids: Vec<BlockId>,
}

/// A concept extracted from free text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    /// Free-form category ("product", "company", ...).
    #[serde(default)]
    pub category: String,
}

impl Concept {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

/// A semantic search query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemanticSearchRequest {
    pub query: String,
    pub limit: usize,
    /// Minimum similarity score in `[0, 1]`.
    pub threshold: f32,
    /// Documents whose blocks must not be returned.
    #[serde(default)]
    pub exclude_doc_ids: Vec<DocumentId>,
    /// Restrict matches to one descriptor category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_filter: Option<String>,
}

/// One ranked search hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub document_id: DocumentId,
    pub block_id: BlockId,
    pub bullet_text: String,
    /// Ancestor path of the hit, e.g. `"Food > Fruit > Apple"`.
    #[serde(default)]
    pub context_path: String,
    #[serde(default)]
    pub children_summary: Option<String>,
    #[serde(default)]
    pub descriptor_type: Option<String>,
    pub score: f32,
}

impl RankedMatch {
    /// The hit as a Portal source.
    pub fn source(&self) -> SourceRef {
        SourceRef::new(self.document_id.clone(), self.block_id.clone())
    }
}

/// A proposed new Portal, ready for the host to create on acceptance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortalSuggestion {
    /// Block to mirror.
    pub source: SourceRef,
    /// Bullet in the watched document that mentioned the concept.
    pub target_bullet: BlockId,
    /// Where under that bullet the Portal goes.
    pub placement: PlacementResult,
    /// Concept that linked the two.
    pub concept: String,
    pub score: f32,
}
