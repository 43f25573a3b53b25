//! Reference block host: a registry of outline documents.
//!
//! # Concurrency Model
//!
//! - DashMap for per-document concurrent access
//! - Event broadcasting when documents come and go
//! - Each document guards its own tree with a parking_lot lock

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;

use hydra_types::{DocumentId, SourceRef};

use crate::document::OutlineDocument;
use crate::error::HostError;
use crate::host::{BlockHandle, BlockHost};
use crate::Result;

/// Events broadcast when the document set changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    DocumentCreated { document_id: DocumentId },
    DocumentRemoved { document_id: DocumentId },
}

/// In-memory [`BlockHost`] holding every open document.
#[derive(Debug)]
pub struct MemoryHost {
    documents: DashMap<DocumentId, OutlineDocument>,
    event_tx: broadcast::Sender<HostEvent>,
}

impl MemoryHost {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            documents: DashMap::new(),
            event_tx,
        }
    }

    /// Get the event receiver for subscribing to document set changes.
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.event_tx.subscribe()
    }

    /// Create and register an empty document.
    pub fn create_document(&self, id: impl Into<DocumentId>) -> Result<OutlineDocument> {
        let doc = OutlineDocument::new(id);
        self.insert_document(doc.clone())?;
        Ok(doc)
    }

    /// Register an existing document.
    pub fn insert_document(&self, doc: OutlineDocument) -> Result<()> {
        let id = doc.id().clone();
        match self.documents.entry(id.clone()) {
            Entry::Occupied(_) => return Err(HostError::DuplicateDocument(id)),
            Entry::Vacant(slot) => {
                slot.insert(doc);
            }
        }
        tracing::debug!(doc = %id, "document registered");
        let _ = self.event_tx.send(HostEvent::DocumentCreated { document_id: id });
        Ok(())
    }

    pub fn document(&self, id: &DocumentId) -> Option<OutlineDocument> {
        self.documents.get(id).map(|entry| entry.value().clone())
    }

    /// Unregister a document. Its blocks stop resolving.
    pub fn remove_document(&self, id: &DocumentId) -> Result<OutlineDocument> {
        let (_, doc) = self
            .documents
            .remove(id)
            .ok_or_else(|| HostError::DocumentNotFound(id.clone()))?;
        tracing::debug!(doc = %id, "document removed");
        let _ = self.event_tx.send(HostEvent::DocumentRemoved {
            document_id: id.clone(),
        });
        Ok(doc)
    }

    /// Registered document ids, sorted.
    pub fn document_ids(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self.documents.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockHost for MemoryHost {
    fn resolve_block(&self, source: &SourceRef) -> Option<Arc<dyn BlockHandle>> {
        // Clone out of the map so no shard guard outlives the lookup.
        let doc = self.document(&source.document_id)?;
        doc.block(&source.block_id)
    }
}

/// Thread-safe shared host handle.
pub type SharedMemoryHost = Arc<MemoryHost>;

pub fn shared_memory_host() -> SharedMemoryHost {
    Arc::new(MemoryHost::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_block() {
        let host = MemoryHost::new();
        let doc = host.create_document("notes").unwrap();
        let id = doc.append_bullet(None, "Apple").unwrap();

        let block = host.resolve_block(&SourceRef::new("notes", id.clone())).unwrap();
        assert_eq!(block.id(), id);
        assert_eq!(block.text(), "Apple");

        assert!(host.resolve_block(&SourceRef::new("notes", "missing")).is_none());
        assert!(host.resolve_block(&SourceRef::new("other", id)).is_none());
    }

    #[test]
    fn test_removed_document_stops_resolving() {
        let host = MemoryHost::new();
        let doc = host.create_document("notes").unwrap();
        let id = doc.append_bullet(None, "Apple").unwrap();
        let source = SourceRef::new("notes", id);

        host.remove_document(&DocumentId::new("notes")).unwrap();
        assert!(host.resolve_block(&source).is_none());
        assert!(host.remove_document(&DocumentId::new("notes")).is_err());
    }

    #[test]
    fn test_duplicate_document_rejected() {
        let host = MemoryHost::new();
        host.create_document("a").unwrap();
        assert_eq!(
            host.create_document("a").unwrap_err(),
            HostError::DuplicateDocument(DocumentId::new("a"))
        );
    }

    #[tokio::test]
    async fn test_events_broadcast() {
        let host = MemoryHost::new();
        let mut rx = host.subscribe();

        host.create_document("a").unwrap();
        host.remove_document(&DocumentId::new("a")).unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            HostEvent::DocumentCreated { document_id: DocumentId::new("a") }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            HostEvent::DocumentRemoved { document_id: DocumentId::new("a") }
        );
    }
}
