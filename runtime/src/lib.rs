//! # Tab Bar Framework Runtime
//!
//! Runtime implementation for the Tab Bar Framework.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling. It is the driver of the request lifecycle: it
//! performs the work described by `Effect::Cancellable`, feeds the single
//! resulting `Response` back through the reducer, and suppresses responses of
//! units that were cancelled first.
//!
//! ## Core Components
//!
//! - **Store**: Owns state, runs the reducer, executes effects
//! - **Cancellation**: Generation bookkeeping for cancellable effects
//! - **Driver**: Request deadlines
//! - **Retry**: Backoff policies for request work
//!
//! ## Example
//!
//! ```ignore
//! use tabbar_runtime::Store;
//!
//! let store = Store::new(TabBarState::default(), TabBarReducer::new(), TabBarEnvironment);
//!
//! store.send(TabBarAction::FeedIsSelected).await?;
//! let feed_selected = store.state(|s| s.feed_selected).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tabbar_core::environment::Scheduler;
use tabbar_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{RwLock, watch};

mod cancellation;

/// Driver-level request deadlines
pub mod driver;

/// Retry logic with exponential backoff
pub mod retry;

/// Tokio-backed scheduler
pub mod scheduler;

pub use error::StoreError;
pub use scheduler::TokioScheduler;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tabbar_runtime::{StoreConfig, TokioScheduler};
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(64)
///     .with_shutdown_timeout(Duration::from_secs(5))
///     .with_scheduler(Arc::new(TokioScheduler::current()));
/// assert_eq!(config.broadcast_capacity, 64);
/// ```
#[derive(Clone)]
pub struct StoreConfig {
    /// Capacity of the action broadcast channel
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
    /// Execution context effects are spawned on
    pub scheduler: Arc<dyn Scheduler>,
}

impl StoreConfig {
    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }

    /// Set the scheduler effects run on
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
            scheduler: Arc::new(TokioScheduler::current()),
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("broadcast_capacity", &self.broadcast_capacity)
            .field("default_shutdown_timeout", &self.default_shutdown_timeout)
            .finish_non_exhaustive()
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects started by
/// that action. Effects of actions fed back later are not included.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(FeedAction::Load(RequestAction::Request)).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the effect is
/// aborted or panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::cancellation::{CancelScope, CancellationRegistry, ScopeGuard};
    use super::{
        Arc, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect, EffectHandle,
        EffectTracking, Ordering, Reducer, RwLock, Scheduler, StoreConfig, StoreError,
    };
    use futures::future::{abortable, BoxFuture};
    use std::sync::atomic::AtomicBool;
    use tokio::sync::broadcast;

    /// Where an action entered the store
    enum Origin {
        /// Sent by a caller (rendering layer, tests)
        Dispatch,
        /// Produced by an effect, possibly within a cancellable unit
        Effect(Option<CancelScope>),
    }

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`, written only by the reducer)
    /// 2. Reducer (business logic)
    /// 3. Environment (read-only collaborators)
    /// 4. Effect execution (with feedback loop and cancellation)
    ///
    /// Actions are applied one at a time in the order they acquire the state
    /// lock. Effects returned by the reducer are scheduled before the lock is
    /// released, so `Cancel` effects take hold before any later action is
    /// reduced.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        scheduler: Arc<dyn Scheduler>,
        cancellations: Arc<CancellationRegistry>,
        shutdown: Arc<AtomicBool>,
        shutdown_timeout: Duration,
        pending_effects: Arc<AtomicUsize>,
        /// Actions produced by effects, for observers
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        ///
        /// # Example
        ///
        /// ```ignore
        /// let config = StoreConfig::default()
        ///     .with_scheduler(Arc::clone(&env.feed.scheduler));
        ///
        /// let store = Store::with_config(AppState::default(), app_reducer(), env, config);
        /// ```
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                scheduler: config.scheduler,
                cancellations: Arc::new(CancellationRegistry::default()),
                shutdown: Arc::new(AtomicBool::new(false)),
                shutdown_timeout: config.default_shutdown_timeout,
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Schedules returned effects
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// `send()` returns after scheduling effects, not after they complete.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.send_internal(action, Origin::Dispatch).await
        }

        /// Send an action and wait for a matching result action
        ///
        /// Designed for request-response flows: subscribe, send the `Request`,
        /// then wait for the `Response` produced by the effect.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before matching action received
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        ///
        /// # Example
        ///
        /// ```ignore
        /// let response = store.send_and_wait_for(
        ///     FeedAction::Load(RequestAction::Request),
        ///     |a| matches!(a, FeedAction::Load(RequestAction::Response(_))),
        ///     Duration::from_secs(10),
        /// ).await?;
        /// ```
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            // Subscribe BEFORE sending to avoid race condition
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged, {} actions skipped", skipped);
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Actions sent by callers are not broadcast. Responses of cancelled
        /// units are never broadcast either.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let feed_selected = store.state(|s| s.feed_selected).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Number of cancellable units currently in flight
        #[must_use]
        pub fn in_flight(&self) -> usize {
            self.cancellations.in_flight()
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Sets the shutdown flag (rejecting new actions), then waits for
        /// pending effects to complete.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout: {} effects still running", pending);
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Graceful shutdown using the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_gracefully(&self) -> Result<(), StoreError> {
            self.shutdown(self.shutdown_timeout).await
        }

        #[tracing::instrument(skip(self, action, origin), name = "store_send_internal")]
        async fn send_internal(&self, action: A, origin: Origin) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            let (handle, tracking) = EffectHandle::new();
            let mut state = self.state.write().await;
            tracing::trace!("Acquired write lock on state");

            if let Origin::Effect(scope) = &origin {
                if let Some(scope) = scope.as_ref().filter(|scope| !self.cancellations.is_live(scope)) {
                    tracing::debug!(effect_id = %scope.id(), "Dropping action from cancelled effect");
                    metrics::counter!("store.effects.suppressed").increment(1);
                    return Ok(EffectHandle::completed());
                }
                // Broadcast to observers (request-response callers, tests)
                let _ = self.action_broadcast.send(action.clone());
            }

            metrics::counter!("store.commands.total").increment(1);

            let effects = {
                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds").record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect_internal(effect, &tracking, None);
            }
            drop(state);

            Ok(handle)
        }

        /// Spawn a task on the scheduler, tying it to `scope` when present
        fn spawn_task<F>(&self, task: F, scope: Option<&CancelScope>)
        where
            F: std::future::Future<Output = ()> + Send + 'static,
        {
            let task: BoxFuture<'static, ()> = match scope {
                Some(scope) => {
                    let (task, abort) = abortable(task);
                    self.cancellations.attach(scope, abort);
                    Box::pin(async move {
                        if task.await.is_err() {
                            tracing::trace!("Effect task aborted");
                        }
                    })
                },
                None => Box::pin(task),
            };
            self.scheduler.spawn(task);
        }

        /// Count a new task for tracking, shutdown and its cancellation scope.
        ///
        /// Returns `None` if the scope was already cancelled.
        fn start_task(
            &self,
            tracking: &EffectTracking,
            scope: Option<&CancelScope>,
        ) -> Option<(DecrementGuard, AtomicCounterGuard, Option<ScopeGuard>)> {
            let scope_guard = match scope {
                Some(scope) => {
                    if !self.cancellations.begin(scope) {
                        tracing::trace!(effect_id = %scope.id(), "Skipping effect of cancelled unit");
                        return None;
                    }
                    Some(ScopeGuard::new(Arc::clone(&self.cancellations), scope.clone()))
                },
                None => None,
            };

            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);

            Some((
                DecrementGuard(tracking.clone()),
                AtomicCounterGuard(Arc::clone(&self.pending_effects)),
                scope_guard,
            ))
        }

        /// Execute an effect with tracking
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        /// - `Delay`: Waits for duration, then sends action
        /// - `Parallel`: Executes effects concurrently
        /// - `Sequential`: Executes effects in order, waiting for each to complete
        /// - `Cancellable`: Opens a new generation for the id and runs the inner effect in it
        /// - `Cancel`: Retires the id's generation and aborts its tasks
        ///
        /// # Error Handling Strategy
        ///
        /// Effect tasks are isolated: a panicking task is confined to its
        /// spawned task and the guards still release their counters.
        #[allow(clippy::too_many_lines)]
        #[tracing::instrument(skip(self, effect, tracking, scope), name = "execute_effect")]
        fn execute_effect_internal(
            &self,
            effect: Effect<A>,
            tracking: &EffectTracking,
            scope: Option<CancelScope>,
        ) {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                    let Some(guards) = self.start_task(tracking, scope.as_ref()) else {
                        return;
                    };
                    let store = self.clone();
                    let task_scope = scope.clone();

                    self.spawn_task(
                        async move {
                            let _guards = guards;
                            if let Some(action) = fut.await {
                                tracing::trace!("Effect::Future produced an action, sending to store");
                                let _ = store.send_internal(action, Origin::Effect(task_scope)).await;
                            } else {
                                tracing::trace!("Effect::Future completed with no action");
                            }
                        },
                        scope.as_ref(),
                    );
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);

                    let Some(guards) = self.start_task(tracking, scope.as_ref()) else {
                        return;
                    };
                    let store = self.clone();
                    let task_scope = scope.clone();

                    self.spawn_task(
                        async move {
                            let _guards = guards;
                            tokio::time::sleep(duration).await;
                            tracing::trace!("Effect::Delay completed, sending action");
                            let _ = store.send_internal(*action, Origin::Effect(task_scope)).await;
                        },
                        scope.as_ref(),
                    );
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);

                    for effect in effects {
                        self.execute_effect_internal(effect, tracking, scope.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    let effect_count = effects.len();
                    tracing::trace!("Executing Effect::Sequential with {} effects", effect_count);
                    metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);

                    let Some(guards) = self.start_task(tracking, scope.as_ref()) else {
                        return;
                    };
                    let store = self.clone();
                    let task_scope = scope.clone();

                    self.spawn_task(
                        async move {
                            let _guards = guards;

                            for (idx, effect) in effects.into_iter().enumerate() {
                                tracing::trace!("Executing sequential effect {} of {}", idx + 1, effect_count);

                                let (mut sub_handle, sub_tracking) = EffectHandle::new();
                                store.execute_effect_internal(effect, &sub_tracking, task_scope.clone());
                                drop(sub_tracking);

                                // Wait for this effect to complete before continuing
                                sub_handle.wait().await;
                            }
                            tracing::trace!("Effect::Sequential completed");
                        },
                        scope.as_ref(),
                    );
                },
                Effect::Cancellable { id, effect } => {
                    tracing::trace!(effect_id = %id, "Executing Effect::Cancellable");
                    metrics::counter!("store.effects.executed", "type" => "cancellable").increment(1);

                    let unit = self.cancellations.register(id);
                    self.execute_effect_internal(*effect, tracking, Some(unit.clone()));
                    self.cancellations.settle(&unit);
                },
                Effect::Cancel(id) => {
                    metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);

                    if self.cancellations.cancel(&id) {
                        tracing::debug!(effect_id = %id, "Cancelled in-flight effect");
                        metrics::counter!("store.effects.cancelled", "reason" => "requested").increment(1);
                    } else {
                        tracing::trace!(effect_id = %id, "Nothing in flight to cancel");
                    }
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                scheduler: Arc::clone(&self.scheduler),
                cancellations: Arc::clone(&self.cancellations),
                shutdown: Arc::clone(&self.shutdown),
                shutdown_timeout: self.shutdown_timeout,
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
