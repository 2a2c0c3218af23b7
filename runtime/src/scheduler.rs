//! Tokio-backed [`Scheduler`].

use futures::future::BoxFuture;
use tabbar_core::environment::Scheduler;
use tokio::runtime::Handle;

/// Spawns effect tasks on a Tokio runtime.
///
/// [`TokioScheduler::current`] uses whichever runtime is driving the caller
/// at spawn time; [`TokioScheduler::from_handle`] pins tasks to a specific one.
#[derive(Debug, Clone, Default)]
pub struct TokioScheduler {
    handle: Option<Handle>,
}

impl TokioScheduler {
    /// Spawn on the ambient runtime
    #[must_use]
    pub const fn current() -> Self {
        Self { handle: None }
    }

    /// Spawn on the given runtime
    #[must_use]
    pub const fn from_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        match &self.handle {
            Some(handle) => {
                handle.spawn(task);
            },
            None => {
                tokio::spawn(task);
            },
        }
    }
}
