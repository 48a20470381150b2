//! Supervised background tasks.
//!
//! Every asynchronous unit of work runs on its own thread behind
//! `catch_unwind`. A panic is logged with a backtrace and converted into
//! [`PlayerError::Panicked`]; the unit's [`WorkGuard`] is dropped on every
//! exit path so [`WorkGroup::wait`] never hangs on a crashed task.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::PlayerError;

/// Counter of outstanding units of work.
#[derive(Clone, Default)]
pub struct WorkGroup {
    inner: Arc<WorkGroupInner>,
}

#[derive(Default)]
struct WorkGroupInner {
    outstanding: Mutex<usize>,
    cv: Condvar,
}

/// One outstanding unit of work. Completes when dropped.
pub struct WorkGuard {
    inner: Arc<WorkGroupInner>,
}

impl WorkGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new unit of work.
    pub fn add(&self) -> WorkGuard {
        *self.inner.lock() += 1;
        WorkGuard {
            inner: self.inner.clone(),
        }
    }

    pub fn outstanding(&self) -> usize {
        *self.inner.lock()
    }

    /// Block until every unit completes or `timeout` elapses.
    ///
    /// Returns `true` when the group drained.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.inner.lock();
        while *count > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            count = match self.inner.cv.wait_timeout(count, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

impl WorkGroupInner {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.outstanding.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        let mut count = self.inner.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.inner.cv.notify_all();
        }
    }
}

/// Extract a human-readable message from a panic payload.
pub fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

/// Run `f`, converting a panic into [`PlayerError::Panicked`].
pub fn run_guarded<T>(task: &str, f: impl FnOnce() -> T) -> Result<T, PlayerError> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(payload);
        let backtrace = std::backtrace::Backtrace::force_capture();
        tracing::error!(task, %message, %backtrace, "recovered panic in task");
        PlayerError::Panicked {
            task: task.to_string(),
            message,
        }
    })
}

/// Spawn `f` on a named thread holding `guard` until it returns or panics.
pub fn spawn_supervised<F>(name: &str, guard: WorkGuard, f: F)
where
    F: FnOnce() + Send + 'static,
{
    let task = name.to_string();
    let spawned = std::thread::Builder::new()
        .name(task.clone())
        .spawn(move || {
            let _guard = guard;
            let _ = run_guarded(&task, f);
        });
    if let Err(e) = spawned {
        // The closure, and the guard with it, is dropped here.
        tracing::warn!(task = name, error = %e, "thread spawn failed");
    }
}
