//! Injectable one-shot timers.
//!
//! The watcher never touches a clock directly. Production code uses
//! [`TokioTimer`]; tests drive [`ManualTimer`] by hand so debounce behavior is
//! checked against virtual time instead of racing real sleeps.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{PortalError, Result};

/// Work to run when a timer fires.
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Schedules one-shot tasks.
pub trait Timer: Send + Sync {
    /// Run `task` once after `delay`, unless the returned handle is
    /// cancelled (or dropped) first.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

/// A scheduled task. Cancelling is idempotent; dropping cancels.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel the task if it has not run. Later calls do nothing.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Let go of the handle without cancelling the task.
    ///
    /// Used by a task that is already running and owns its own handle.
    pub fn disarm(mut self) {
        self.cancel = None;
    }

    pub fn is_armed(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.is_armed())
            .finish()
    }
}

// ============================================================================
// TokioTimer
// ============================================================================

/// Timer backed by `tokio::time::sleep` on a runtime handle.
#[derive(Clone, Debug)]
pub struct TokioTimer {
    runtime: tokio::runtime::Handle,
}

impl TokioTimer {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    /// Timer on the runtime the caller is running in.
    pub fn current() -> Result<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| PortalError::Runtime(e.to_string()))
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        let abort = join.abort_handle();
        TimerHandle::new(move || abort.abort())
    }
}

// ============================================================================
// ManualTimer
// ============================================================================

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    /// Keyed by (deadline, schedule order) so ties fire first-scheduled first.
    pending: BTreeMap<(Duration, u64), TimerTask>,
}

/// Virtual-clock timer. Nothing fires until [`advance`](Self::advance).
///
/// Cheap to clone; clones share one clock.
#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Tasks scheduled and not yet fired or cancelled.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Move the clock forward, firing every task that comes due, in deadline
    /// order. Tasks scheduled while advancing fire too if they fall due
    /// before the new time. Returns how many tasks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut fired = 0;

        loop {
            let task = {
                let mut state = self.state.lock();
                let due = state
                    .pending
                    .first_key_value()
                    .map(|(key, _)| *key)
                    .filter(|(deadline, _)| *deadline <= target);
                match due {
                    Some(key) => {
                        state.now = key.0;
                        state.pending.remove(&key)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            // Run outside the lock: tasks may schedule or cancel timers.
            match task {
                Some(task) => {
                    task();
                    fired += 1;
                }
                None => break,
            }
        }

        fired
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let key = {
            let mut state = self.state.lock();
            let key = (state.now + delay, state.next_seq);
            state.next_seq += 1;
            state.pending.insert(key, task);
            key
        };

        let weak: Weak<Mutex<ManualState>> = Arc::downgrade(&self.state);
        TimerHandle::new(move || {
            if let Some(state) = weak.upgrade() {
                // Drop the task outside the lock.
                let removed = state.lock().pending.remove(&key);
                drop(removed);
            }
        })
    }
}

impl std::fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualTimer")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> TimerTask) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let make = move || {
            let c = c.clone();
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }) as TimerTask
        };
        (count, make)
    }

    #[test]
    fn test_manual_fires_when_due() {
        let timer = ManualTimer::new();
        let (count, task) = counter();
        let _handle = timer.schedule(Duration::from_millis(100), task());

        assert_eq!(timer.advance(Duration::from_millis(99)), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(timer.advance(Duration::from_millis(1)), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.now(), Duration::from_millis(100));
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn test_manual_fires_in_deadline_order() {
        let timer = ManualTimer::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for (label, ms) in [("late", 30u64), ("early", 10), ("mid", 20)] {
            let o = order.clone();
            handles.push(timer.schedule(
                Duration::from_millis(ms),
                Box::new(move || o.lock().push(label)),
            ));
        }

        assert_eq!(timer.advance(Duration::from_secs(1)), 3);
        assert_eq!(*order.lock(), vec!["early", "mid", "late"]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let timer = ManualTimer::new();
        let (count, task) = counter();
        let mut handle = timer.schedule(Duration::from_millis(5), task());

        handle.cancel();
        handle.cancel();
        assert!(!handle.is_armed());
        assert_eq!(timer.advance(Duration::from_millis(10)), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_cancels_and_disarm_does_not() {
        let timer = ManualTimer::new();
        let (count, task) = counter();

        drop(timer.schedule(Duration::from_millis(5), task()));
        assert_eq!(timer.pending(), 0);

        timer.schedule(Duration::from_millis(5), task()).disarm();
        assert_eq!(timer.pending(), 1);
        timer.advance(Duration::from_millis(5));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_task_scheduled_while_advancing() {
        let timer = ManualTimer::new();
        let (count, task) = counter();
        let inner_timer = timer.clone();
        let inner_task = Mutex::new(Some(task()));
        let _outer = timer.schedule(
            Duration::from_millis(10),
            Box::new(move || {
                if let Some(task) = inner_task.lock().take() {
                    inner_timer.schedule(Duration::from_millis(10), task).disarm();
                }
            }),
        );

        assert_eq!(timer.advance(Duration::from_millis(25)), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_fires_and_cancels() {
        let timer = TokioTimer::current().unwrap();
        let (count, task) = counter();

        let _kept = timer.schedule(Duration::from_millis(50), task());
        let mut cancelled = timer.schedule(Duration::from_millis(50), task());
        cancelled.cancel();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tokio_timer_requires_runtime() {
        assert!(matches!(TokioTimer::current(), Err(PortalError::Runtime(_))));
    }
}
