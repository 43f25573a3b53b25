//! Serializable outline snapshots for seeding a [`MemoryHost`].
//!
//! ```json
//! {"documents": [{"id": "notes", "blocks": [
//!     {"id": "fruit", "text": "Fruit", "children": [
//!         {"text": "What", "flavour": "hydra:descriptor"}
//!     ]}
//! ]}]}
//! ```

use serde::{Deserialize, Serialize};

use hydra_types::{BULLET_FLAVOUR, BlockId, DocumentId};

use crate::document::OutlineDocument;
use crate::store::MemoryHost;
use crate::Result;

/// A whole host's worth of documents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSnapshot {
    #[serde(default)]
    pub documents: Vec<DocumentSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    #[serde(default)]
    pub blocks: Vec<BlockSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    /// Omitted ids are minted on load.
    #[serde(default)]
    pub id: Option<BlockId>,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_flavour")]
    pub flavour: String,
    #[serde(default = "default_expanded")]
    pub expanded: bool,
    #[serde(default)]
    pub children: Vec<BlockSnapshot>,
}

fn default_flavour() -> String {
    BULLET_FLAVOUR.to_string()
}

fn default_expanded() -> bool {
    true
}

impl BlockSnapshot {
    pub fn bullet(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            flavour: default_flavour(),
            expanded: true,
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_flavour(mut self, flavour: impl Into<String>) -> Self {
        self.flavour = flavour.into();
        self
    }

    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    pub fn with_children(mut self, children: Vec<BlockSnapshot>) -> Self {
        self.children = children;
        self
    }
}

impl DocumentSnapshot {
    /// Build a live document from this snapshot.
    pub fn build(&self) -> Result<OutlineDocument> {
        let doc = OutlineDocument::new(self.id.clone());
        for block in &self.blocks {
            insert_snapshot(&doc, None, block)?;
        }
        Ok(doc)
    }
}

impl MemoryHost {
    /// Register every document in a snapshot.
    pub fn load_snapshot(&self, snapshot: &OutlineSnapshot) -> Result<()> {
        for doc in &snapshot.documents {
            self.insert_document(doc.build()?)?;
        }
        Ok(())
    }

    pub fn from_snapshot(snapshot: &OutlineSnapshot) -> Result<Self> {
        let host = Self::new();
        host.load_snapshot(snapshot)?;
        Ok(host)
    }
}

fn insert_snapshot(doc: &OutlineDocument, parent: Option<&BlockId>, block: &BlockSnapshot) -> Result<BlockId> {
    let id = block.id.clone().unwrap_or_else(BlockId::generate);
    doc.insert_block_with_id(id.clone(), parent, None, block.flavour.clone(), block.text.clone())?;
    for child in &block.children {
        insert_snapshot(doc, Some(&id), child)?;
    }
    if !block.expanded {
        doc.set_expanded(&id, false)?;
    }
    Ok(id)
}
