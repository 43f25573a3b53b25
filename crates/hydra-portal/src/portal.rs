//! Live session for one Portal: observe, derive status, propagate edits.
//!
//! # State Machine
//!
//! ```text
//! +----------------+
//! |     Synced     | mirror text == source text
//! +-------+--------+
//!         | source mutated, change event not yet observed
//!         v
//! +----------------+
//! |     Stale      | converges on the next observed change or refresh()
//! +-------+--------+
//!         | source no longer resolves (checked on status() / edits)
//!         v
//! +----------------+
//! |    Orphaned    | not editable; edits are dropped
//! +----------------+
//! ```
//!
//! Nothing polls. Status is re-derived whenever the observer fires and
//! whenever the caller asks for it.

use std::sync::Arc;

use parking_lot::Mutex;

use hydra_blocks::{BlockHost, TextChange};
use hydra_types::{Delta, Portal, SourceRef, SyncStatus};

use crate::observer::{ObserverHandle, observe_source};
use crate::propagate::{PropagationOutcome, propagate_delta};
use crate::sync_state::compute_sync_state;

/// Called with the new status whenever it changes.
pub type StatusListener = Arc<dyn Fn(SyncStatus) + Send + Sync>;

#[derive(Debug, Default)]
struct MirrorState {
    /// Transient copy of the source text, for rendering only.
    mirror_text: String,
    /// Source version the mirror last observed.
    last_known_version: u64,
    status: SyncStatus,
}

struct Shared {
    source: SourceRef,
    state: Mutex<MirrorState>,
    on_status: Option<StatusListener>,
}

impl Shared {
    /// Record a status; notify outside the lock if it changed.
    fn set_status(&self, status: SyncStatus) {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.status, status)
        };
        if previous != status {
            tracing::debug!(source = %self.source, from = %previous, to = %status, "portal status changed");
            if let Some(listener) = &self.on_status {
                listener(status);
            }
        }
    }

    /// Take the text of `change` unless the mirror already saw a newer one.
    ///
    /// Listeners are notified outside the buffer lock, so changes from
    /// concurrent writers can arrive out of order.
    fn adopt(&self, change: &TextChange) {
        {
            let mut state = self.state.lock();
            if change.version < state.last_known_version {
                tracing::trace!(
                    source = %self.source,
                    seen = state.last_known_version,
                    late = change.version,
                    "ignoring out-of-order change"
                );
                return;
            }
            state.mirror_text = change.text.clone();
            state.last_known_version = change.version;
        }
        self.set_status(SyncStatus::Synced);
    }

    /// Forget the last seen version so the next change is taken as is.
    fn reset_version(&self) {
        self.state.lock().last_known_version = 0;
    }
}

/// One open Portal.
///
/// Dropping the session (or calling [`close`](Self::close)) releases the
/// source listener.
pub struct PortalSession {
    portal: Portal,
    host: Arc<dyn BlockHost>,
    shared: Arc<Shared>,
    observer: Mutex<ObserverHandle>,
}

impl PortalSession {
    /// Start observing `portal`'s source.
    ///
    /// An unresolvable source leaves the session `Orphaned` from the start.
    pub fn open(host: Arc<dyn BlockHost>, portal: Portal, on_status: Option<StatusListener>) -> Self {
        let shared = Arc::new(Shared {
            source: portal.source.clone(),
            state: Mutex::new(MirrorState {
                status: portal.sync_status,
                ..MirrorState::default()
            }),
            on_status,
        });
        let observer = Self::observe(host.as_ref(), &shared);

        Self {
            portal,
            host,
            shared,
            observer: Mutex::new(observer),
        }
    }

    fn observe(host: &dyn BlockHost, shared: &Arc<Shared>) -> ObserverHandle {
        let on_change = shared.clone();
        let on_orphaned = shared.clone();
        observe_source(
            host,
            &shared.source,
            move |change: &TextChange| on_change.adopt(change),
            move || on_orphaned.set_status(SyncStatus::Orphaned),
        )
    }

    /// The Portal with its current status filled in.
    pub fn portal(&self) -> Portal {
        let mut portal = self.portal.clone();
        portal.sync_status = self.shared.state.lock().status;
        portal
    }

    pub fn source(&self) -> &SourceRef {
        &self.portal.source
    }

    /// Text the mirror currently shows.
    pub fn mirror_text(&self) -> String {
        self.shared.state.lock().mirror_text.clone()
    }

    pub fn last_known_version(&self) -> u64 {
        self.shared.state.lock().last_known_version
    }

    /// Re-derive the status against the live source.
    pub fn status(&self) -> SyncStatus {
        let buffer = self
            .host
            .resolve_block(&self.portal.source)
            .and_then(|block| block.text_buffer());
        let source_text = buffer.as_ref().map(|buffer| buffer.current_text());
        let cached = self.mirror_text();

        let status = compute_sync_state(source_text.as_deref(), &cached, buffer.is_some());
        self.shared.set_status(status);
        status
    }

    /// Orphaned sources are never editable.
    pub fn is_editable(&self) -> bool {
        self.status().is_editable()
    }

    /// Push a local edit made inside the mirror into the source.
    pub fn apply_local_delta(&self, delta: &Delta) -> PropagationOutcome {
        let last_known_version = self.last_known_version();
        let outcome = propagate_delta(self.host.as_ref(), &self.portal.source, delta, last_known_version);
        if outcome.is_dropped() {
            self.status();
        }
        outcome
    }

    /// Re-read the source and adopt its text.
    ///
    /// Re-attaches the observer if the source resolves again. Returns the
    /// resulting status.
    pub fn refresh(&self) -> SyncStatus {
        if self.is_observing() {
            let buffer = self
                .host
                .resolve_block(&self.portal.source)
                .and_then(|block| block.text_buffer());
            match buffer {
                Some(buffer) => {
                    self.shared.reset_version();
                    self.shared.adopt(&TextChange {
                        text: buffer.current_text(),
                        version: buffer.version(),
                    });
                }
                None => {
                    self.close();
                    self.shared.set_status(SyncStatus::Orphaned);
                }
            }
        } else {
            // observe() delivers the current text, or reports the orphan. A
            // recreated source restarts its version count.
            self.shared.reset_version();
            let fresh = Self::observe(self.host.as_ref(), &self.shared);
            let previous = std::mem::replace(&mut *self.observer.lock(), fresh);
            drop(previous);
        }
        self.shared.state.lock().status
    }

    /// Whether the source listener is still attached.
    pub fn is_observing(&self) -> bool {
        self.observer.lock().is_active()
    }

    /// Release the source listener. Idempotent.
    pub fn close(&self) {
        self.observer.lock().dispose();
    }
}

impl std::fmt::Debug for PortalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalSession")
            .field("portal", &self.portal.id)
            .field("source", &self.portal.source)
            .field("state", &*self.shared.state.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_blocks::{MemoryHost, OutlineDocument};
    use hydra_types::BlockId;

    fn setup(text: &str) -> (Arc<MemoryHost>, OutlineDocument, BlockId) {
        let host = Arc::new(MemoryHost::new());
        let doc = host.create_document("src").unwrap();
        let id = doc.append_bullet(None, text).unwrap();
        (host, doc, id)
    }

    fn recorder() -> (StatusListener, Arc<Mutex<Vec<SyncStatus>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        (Arc::new(move |status: SyncStatus| s.lock().push(status)), seen)
    }

    #[test]
    fn test_open_syncs_immediately() {
        let (host, _doc, id) = setup("Apple");
        let session = PortalSession::open(host, Portal::to_source(SourceRef::new("src", id)), None);

        assert_eq!(session.mirror_text(), "Apple");
        assert_eq!(session.status(), SyncStatus::Synced);
        assert!(session.is_editable());
        assert!(session.is_observing());
    }

    #[test]
    fn test_open_missing_source_is_orphaned() {
        let host = Arc::new(MemoryHost::new());
        let (listener, seen) = recorder();
        let session = PortalSession::open(
            host,
            Portal::to_source(SourceRef::new("gone", "gone")),
            Some(listener),
        );

        assert_eq!(session.portal().sync_status, SyncStatus::Orphaned);
        assert!(!session.is_editable());
        assert!(!session.is_observing());
        assert_eq!(*seen.lock(), vec![SyncStatus::Orphaned]);
    }

    #[test]
    fn test_remote_edits_flow_into_mirror() {
        let (host, doc, id) = setup("Apple");
        let session = PortalSession::open(host, Portal::to_source(SourceRef::new("src", id.clone())), None);

        doc.append_text(&id, " pie").unwrap();
        assert_eq!(session.mirror_text(), "Apple pie");
        assert_eq!(session.last_known_version(), 1);
    }

    #[test]
    fn test_late_older_change_is_ignored() {
        let (host, _doc, id) = setup("Apple");
        let session = PortalSession::open(host, Portal::to_source(SourceRef::new("src", id)), None);

        session.shared.adopt(&TextChange {
            text: "Apple pie".into(),
            version: 2,
        });
        session.shared.adopt(&TextChange {
            text: "Apples".into(),
            version: 1,
        });
        assert_eq!(session.mirror_text(), "Apple pie");
        assert_eq!(session.last_known_version(), 2);

        // Redelivery of the current version is harmless.
        session.shared.adopt(&TextChange {
            text: "Apple pie".into(),
            version: 2,
        });
        assert_eq!(session.mirror_text(), "Apple pie");
        assert_eq!(session.last_known_version(), 2);
    }

    #[test]
    fn test_local_edit_round_trip() {
        let (host, doc, id) = setup("Apple");
        let session = PortalSession::open(host, Portal::to_source(SourceRef::new("src", id.clone())), None);

        let outcome = session.apply_local_delta(&Delta::default().retain(5).insert("s"));
        assert!(matches!(outcome, PropagationOutcome::Applied { conflict: false, version: 1, .. }));
        assert_eq!(doc.block(&id).unwrap().text(), "Apples");
        assert_eq!(session.mirror_text(), "Apples");
        assert_eq!(session.status(), SyncStatus::Synced);
    }

    #[test]
    fn test_unobserved_mutation_is_stale_until_refresh() {
        let (host, doc, id) = setup("Apple");
        let session = PortalSession::open(host, Portal::to_source(SourceRef::new("src", id.clone())), None);

        doc.text_buffer(&id).unwrap().set_text_silently("Pear");
        assert_eq!(session.status(), SyncStatus::Stale);
        // Stale sources stay editable.
        assert!(session.is_editable());

        assert_eq!(session.refresh(), SyncStatus::Synced);
        assert_eq!(session.mirror_text(), "Pear");
    }

    #[test]
    fn test_stale_converges_on_next_observed_change() {
        let (host, doc, id) = setup("Apple");
        let session = PortalSession::open(host, Portal::to_source(SourceRef::new("src", id.clone())), None);

        doc.text_buffer(&id).unwrap().set_text_silently("Pear");
        assert_eq!(session.status(), SyncStatus::Stale);

        doc.append_text(&id, "s").unwrap();
        assert_eq!(session.status(), SyncStatus::Synced);
        assert_eq!(session.mirror_text(), "Pears");
    }

    #[test]
    fn test_deleted_source_orphans_and_drops_edits() {
        let (host, doc, id) = setup("Apple");
        let (listener, seen) = recorder();
        let session = PortalSession::open(
            host,
            Portal::to_source(SourceRef::new("src", id.clone())),
            Some(listener),
        );

        doc.delete_block(&id).unwrap();
        let outcome = session.apply_local_delta(&Delta::default().insert("x"));
        assert!(outcome.is_dropped());
        assert_eq!(session.portal().sync_status, SyncStatus::Orphaned);
        assert!(!session.is_editable());
        assert_eq!(*seen.lock(), vec![SyncStatus::Orphaned]);

        assert_eq!(session.refresh(), SyncStatus::Orphaned);
        assert!(!session.is_observing());
    }

    #[test]
    fn test_refresh_adopts_recreated_source() {
        let (host, doc, id) = setup("Apple");
        let session = PortalSession::open(host, Portal::to_source(SourceRef::new("src", id.clone())), None);
        doc.append_text(&id, " pie").unwrap();
        assert_eq!(session.last_known_version(), 1);

        doc.delete_block(&id).unwrap();
        assert_eq!(session.refresh(), SyncStatus::Orphaned);

        doc.insert_block_with_id(id.clone(), None, None, hydra_types::BULLET_FLAVOUR, "Pear")
            .unwrap();
        assert_eq!(session.refresh(), SyncStatus::Synced);
        assert_eq!(session.mirror_text(), "Pear");
        assert_eq!(session.last_known_version(), 0);
    }

    #[test]
    fn test_status_listener_fires_on_transitions_only() {
        let (host, doc, id) = setup("Apple");
        let (listener, seen) = recorder();
        let session = PortalSession::open(
            host,
            Portal::to_source(SourceRef::new("src", id.clone())),
            Some(listener),
        );

        session.status();
        doc.append_text(&id, "!").unwrap();
        doc.text_buffer(&id).unwrap().set_text_silently("changed");
        session.status();
        session.status();
        session.refresh();

        assert_eq!(*seen.lock(), vec![SyncStatus::Stale, SyncStatus::Synced]);
    }

    #[test]
    fn test_close_and_drop_release_listener() {
        let (host, doc, id) = setup("Apple");
        let buffer = doc.text_buffer(&id).unwrap();

        let session = PortalSession::open(host.clone(), Portal::to_source(SourceRef::new("src", id.clone())), None);
        assert_eq!(buffer.listener_count(), 1);
        session.close();
        session.close();
        assert_eq!(buffer.listener_count(), 0);

        {
            let _session = PortalSession::open(host, Portal::to_source(SourceRef::new("src", id)), None);
            assert_eq!(buffer.listener_count(), 1);
        }
        assert_eq!(buffer.listener_count(), 0);
    }
}
