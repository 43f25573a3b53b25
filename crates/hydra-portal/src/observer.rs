//! Source observation: one listener on one source block's text buffer.

use std::sync::Arc;

use parking_lot::Mutex;

use hydra_blocks::{BlockHost, TextChange, TextListener, Unsubscribe};
use hydra_types::SourceRef;

/// Disposable registration returned by [`observe_source`].
///
/// `dispose()` releases the buffer listener exactly once; later calls (and
/// the implicit call on drop) do nothing. A handle for an orphaned source is
/// inert from the start.
pub struct ObserverHandle {
    source: SourceRef,
    unsubscribe: Mutex<Unsubscribe>,
}

impl ObserverHandle {
    fn inert(source: SourceRef) -> Self {
        Self {
            source,
            unsubscribe: Mutex::new(Unsubscribe::noop()),
        }
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    /// Whether the buffer listener is still registered.
    pub fn is_active(&self) -> bool {
        self.unsubscribe.lock().is_active()
    }

    pub fn dispose(&self) {
        // Take the release out first so the host callback runs unlocked.
        let mut unsubscribe = std::mem::replace(&mut *self.unsubscribe.lock(), Unsubscribe::noop());
        if unsubscribe.is_active() {
            tracing::trace!(source = %self.source, "observer disposed");
        }
        unsubscribe.unsubscribe();
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("source", &self.source)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Watch a source block's text.
///
/// If the source does not resolve, or has no text buffer, `on_orphaned` runs
/// once and the returned handle is inert; `on_text_change` is never called.
/// Otherwise `on_text_change` runs immediately with the current text, then
/// once per buffer mutation, in the order the buffer emits them.
pub fn observe_source<H, F, O>(host: &H, source: &SourceRef, on_text_change: F, on_orphaned: O) -> ObserverHandle
where
    H: BlockHost + ?Sized,
    F: Fn(&TextChange) + Send + Sync + 'static,
    O: FnOnce(),
{
    let Some(buffer) = host.resolve_block(source).and_then(|block| block.text_buffer()) else {
        tracing::debug!(source = %source, "source unresolvable, observer is inert");
        on_orphaned();
        return ObserverHandle::inert(source.clone());
    };

    let on_text_change: TextListener = Arc::new(on_text_change);
    let unsubscribe = buffer.on_change(on_text_change.clone());

    on_text_change(&TextChange {
        text: buffer.current_text(),
        version: buffer.version(),
    });

    tracing::trace!(source = %source, "observing source");
    ObserverHandle {
        source: source.clone(),
        unsubscribe: Mutex::new(unsubscribe),
    }
}
