//! Debounced whole-document watcher.
//!
//! # State Machine
//!
//! ```text
//!            change event                    timer fires
//! +------+ ---------------> +-------------+ -------------> +-------------+
//! | Idle |                  | Debounce    |                | Dispatching |
//! +------+ <--------------- | Pending     | <--+           +------+------+
//!    ^       dispose()      +------+------+    |                  |
//!    |                             | change    |                  |
//!    |                             +-----------+                  |
//!    |                          (timer restarted)                 |
//!    +------------------------------------------------------------+
//!                        trigger callback returned
//! ```
//!
//! Every change bumps a generation counter and restarts the timer. A timer
//! task only dispatches if, under the watcher lock, the handle is not
//! disposed and its generation is still the latest. The context is built at
//! fire time from the live document.
//!
//! The lock is released before the trigger runs. A trigger that has already
//! passed that check runs to completion even if `dispose()` returns in the
//! meantime on another thread; dispose never waits for it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use hydra_blocks::{DocumentChange, Unsubscribe, WatchedDocument};
use hydra_types::AutoReorgContext;

use super::config::AutoReorgConfig;
use super::timer::{Timer, TimerHandle};

/// Receives one context per quiet period.
pub type TriggerCallback = Arc<dyn Fn(AutoReorgContext) + Send + Sync>;

/// Where a watched document is in its debounce cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WatchState {
    #[default]
    Idle,
    DebouncePending,
    Dispatching,
}

/// Counters for one watch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Change events received.
    pub events_seen: u64,
    /// Times a pending timer was replaced by a newer change.
    pub timers_reset: u64,
    /// Trigger callbacks invoked.
    pub triggers_fired: u64,
}

#[derive(Default)]
struct Core {
    disposed: bool,
    generation: u64,
    pending: Option<TimerHandle>,
    state: WatchState,
    stats: WatchStats,
}

struct WatchInner {
    document: Arc<dyn WatchedDocument>,
    timer: Arc<dyn Timer>,
    debounce: Duration,
    on_trigger: TriggerCallback,
    core: Mutex<Core>,
}

impl WatchInner {
    fn on_change(self: &Arc<Self>) {
        let (generation, replaced) = {
            let mut core = self.core.lock();
            if core.disposed {
                return;
            }
            core.generation += 1;
            core.stats.events_seen += 1;
            let replaced = core.pending.take();
            if replaced.is_some() {
                core.stats.timers_reset += 1;
            }
            core.state = WatchState::DebouncePending;
            (core.generation, replaced)
        };
        // Cancels the superseded timer.
        drop(replaced);

        let weak: Weak<WatchInner> = Arc::downgrade(self);
        let handle = self.timer.schedule(
            self.debounce,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fire(generation);
                }
            }),
        );

        let mut core = self.core.lock();
        if !core.disposed && core.generation == generation && core.state == WatchState::DebouncePending {
            core.pending = Some(handle);
        } else {
            // Superseded, disposed, or already fired; dropping cancels.
            drop(core);
            drop(handle);
        }
    }

    fn fire(&self, generation: u64) {
        let own_handle = {
            let mut core = self.core.lock();
            if core.disposed || core.generation != generation {
                return;
            }
            core.state = WatchState::Dispatching;
            core.stats.triggers_fired += 1;
            core.pending.take()
        };
        // This task is the one running; let go of its handle without aborting it.
        if let Some(handle) = own_handle {
            handle.disarm();
        }

        let context = build_context(self.document.as_ref());
        tracing::debug!(
            doc = %context.document_id,
            bullets = context.all_bullet_ids.len(),
            generation,
            "auto-reorg dispatch"
        );
        (self.on_trigger)(context);

        let mut core = self.core.lock();
        if core.generation == generation && core.state == WatchState::Dispatching {
            core.state = WatchState::Idle;
        }
    }

    fn dispose(&self) -> Option<TimerHandle> {
        let mut core = self.core.lock();
        core.disposed = true;
        core.state = WatchState::Idle;
        core.pending.take()
    }
}

/// Snapshot `document` as it is right now.
pub fn build_context<D: WatchedDocument + ?Sized>(document: &D) -> AutoReorgContext {
    AutoReorgContext {
        document_id: document.document_id(),
        document_text: document.document_text(),
        all_bullet_ids: document.all_bullet_ids(),
    }
}

/// Disposable registration returned by [`AutoReorgWatcher::observe`].
///
/// After `dispose()` (or drop) no new trigger starts, even one whose timer
/// was already due. A trigger already dispatching is not interrupted or
/// waited for. Disposing twice is a no-op, and disposing from inside the
/// trigger is allowed.
pub struct WatchHandle {
    inner: Option<Arc<WatchInner>>,
    unsubscribe: Mutex<Unsubscribe>,
}

impl WatchHandle {
    fn inert() -> Self {
        Self {
            inner: None,
            unsubscribe: Mutex::new(Unsubscribe::noop()),
        }
    }

    /// True for the handle of a disabled watcher.
    pub fn is_inert(&self) -> bool {
        self.inner.is_none()
    }

    /// Whether the document listener is still registered.
    pub fn is_active(&self) -> bool {
        self.unsubscribe.lock().is_active()
    }

    pub fn state(&self) -> WatchState {
        self.inner
            .as_ref()
            .map(|inner| inner.core.lock().state)
            .unwrap_or_default()
    }

    pub fn stats(&self) -> WatchStats {
        self.inner
            .as_ref()
            .map(|inner| inner.core.lock().stats)
            .unwrap_or_default()
    }

    pub fn dispose(&self) {
        let pending = self.inner.as_ref().and_then(|inner| inner.dispose());
        drop(pending);

        let mut unsubscribe = std::mem::replace(&mut *self.unsubscribe.lock(), Unsubscribe::noop());
        unsubscribe.unsubscribe();
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("inert", &self.is_inert())
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Builds debounced watches from one validated config and timer.
pub struct AutoReorgWatcher {
    config: AutoReorgConfig,
    timer: Arc<dyn Timer>,
}

impl AutoReorgWatcher {
    /// The config is clamped into range here.
    pub fn new(config: AutoReorgConfig, timer: Arc<dyn Timer>) -> Self {
        Self {
            config: config.validated(),
            timer,
        }
    }

    pub fn config(&self) -> &AutoReorgConfig {
        &self.config
    }

    /// Watch `document`, calling `on_trigger` once per quiet period.
    ///
    /// A disabled watcher returns an inert handle and registers nothing.
    pub fn observe(&self, document: Arc<dyn WatchedDocument>, on_trigger: TriggerCallback) -> WatchHandle {
        if !self.config.enabled {
            tracing::debug!(doc = %document.document_id(), "auto-reorg disabled, not watching");
            return WatchHandle::inert();
        }

        let inner = Arc::new(WatchInner {
            document: document.clone(),
            timer: self.timer.clone(),
            debounce: self.config.debounce(),
            on_trigger,
            core: Mutex::new(Core::default()),
        });

        let weak = Arc::downgrade(&inner);
        let unsubscribe = document.on_change(Arc::new(move |_change: &DocumentChange| {
            if let Some(inner) = weak.upgrade() {
                inner.on_change();
            }
        }));

        tracing::debug!(doc = %document.document_id(), debounce_ms = self.config.debounce_ms, "auto-reorg watching");
        WatchHandle {
            inner: Some(inner),
            unsubscribe: Mutex::new(unsubscribe),
        }
    }
}

/// One-shot form of [`AutoReorgWatcher::observe`].
pub fn create_auto_reorg_observer(
    document: Arc<dyn WatchedDocument>,
    config: AutoReorgConfig,
    timer: Arc<dyn Timer>,
    on_trigger: TriggerCallback,
) -> WatchHandle {
    AutoReorgWatcher::new(config, timer).observe(document, on_trigger)
}
