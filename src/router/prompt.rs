//! Pending consent-prompt tracking with delayed, best-effort cancellation.
//!
//! The registration itself lives with the presenter (it may outlive the
//! process); this tracker is the single place that mutates it in response to
//! routed actions. Scheduled cancellations have at-least-once semantics:
//! once scheduled they always eventually fire, there is no cancel operation,
//! and firing against an already-cleared registration is a no-op.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::dispatch::presenter::PromptPresenter;

/// One-shot deferred execution. Scheduling is non-blocking and returns
/// immediately; the task runs later on its own callback.
pub trait PromptScheduler: Send + Sync {
    /// Run `task` once after `delay`.
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>);
}

/// Production scheduler: a detached sleeper thread per task.
#[derive(Debug, Default)]
pub struct ThreadScheduler;

impl ThreadScheduler {
    /// Create a scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PromptScheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) {
        thread::spawn(move || {
            thread::sleep(delay);
            task();
        });
    }
}

/// Deterministic scheduler: tasks queue until explicitly fired. Lets tests
/// (and the one-shot CLI) step time by hand instead of sleeping.
#[derive(Default)]
pub struct ManualScheduler {
    #[allow(clippy::type_complexity)]
    pending: Mutex<Vec<(Duration, Box<dyn FnOnce() + Send>)>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks scheduled but not yet fired.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Fire every pending task, in scheduling order.
    pub fn fire_all(&self) {
        let tasks: Vec<_> = self.pending.lock().drain(..).collect();
        for (_, task) in tasks {
            task();
        }
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl PromptScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce() + Send>) {
        self.pending.lock().push((delay, task));
    }
}

/// Tracks the outstanding consent prompt and applies show/cancel actions.
#[derive(Clone)]
pub struct PendingPromptTracker {
    presenter: Arc<dyn PromptPresenter>,
    scheduler: Arc<dyn PromptScheduler>,
}

impl PendingPromptTracker {
    /// Create a tracker over the given registration and scheduler.
    #[must_use]
    pub fn new(presenter: Arc<dyn PromptPresenter>, scheduler: Arc<dyn PromptScheduler>) -> Self {
        Self {
            presenter,
            scheduler,
        }
    }

    /// Whether a prompt registration currently exists.
    ///
    /// Delegates to the presenter rather than any in-process flag: the
    /// registration may have been created by a previous daemon instance.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.presenter.exists()
    }

    /// Register and show the prompt. Idempotent: returns `false` without
    /// side effects when a registration is already outstanding.
    pub fn show(&self) -> bool {
        if self.presenter.exists() {
            return false;
        }
        self.presenter.show();
        true
    }

    /// Schedule a one-shot cancellation of the registration after `delay`.
    ///
    /// Scheduling another cancellation while one is pending is allowed; both
    /// fire, and the net effect is simply "canceled".
    pub fn cancel_after(&self, delay: Duration) {
        let presenter = Arc::clone(&self.presenter);
        self.scheduler
            .schedule(delay, Box::new(move || presenter.cancel()));
    }
}

impl std::fmt::Debug for PendingPromptTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingPromptTracker")
            .field("exists", &self.exists())
            .finish()
    }
}
