//! Trailing-edge debounce keyed by field group.
//!
//! Each group has at most one pending timer. Scheduling again for the same
//! group aborts the previous timer, so only the last update in a burst
//! commits. The commit callback runs synchronously once the quiet period
//! has elapsed; any fetch it starts must be spawned separately so that a
//! later abort can only ever interrupt the wait, never the commit.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

/// Default quiet period before typed filters are committed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct DebounceCommitter {
    delay: Duration,
    pending: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl DebounceCommitter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the quiet period for `group`; `commit` runs when it elapses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, group: &str, commit: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // Deadline is taken now, not when the timer task is first polled.
        let deadline = Instant::now() + self.delay;
        let label = group.to_string();

        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            tracing::trace!("debounce window elapsed for '{label}'");
            commit();
        });

        if let Some(previous) = self.pending.lock().insert(group.to_string(), handle) {
            previous.abort();
        }
    }

    /// Drop the pending timer for `group` without committing.
    pub fn cancel(&self, group: &str) {
        if let Some(handle) = self.pending.lock().remove(group) {
            handle.abort();
        }
    }

    pub fn cancel_all(&self) {
        for (_, handle) in self.pending.lock().drain() {
            handle.abort();
        }
    }

    /// True while a timer for `group` is waiting to fire.
    pub fn is_pending(&self, group: &str) -> bool {
        self.pending
            .lock()
            .get(group)
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DebounceCommitter {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
