//! # Tab Bar Framework Testing
//!
//! Testing utilities and helpers for the Tab Bar Framework.
//!
//! This crate provides:
//! - Mock implementations of environment collaborators
//! - A Given-When-Then harness for reducers
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use tabbar_testing::mocks::MockTransport;
//! use tabbar_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_feed_load() {
//!     let transport = MockTransport::new(Ok(vec![FeedItem::new(1, "hello")]));
//!     let store = Store::new(FeedState::default(), FeedReducer::new(), feed_environment(transport));
//!
//!     store.send(FeedAction::Load(RequestAction::Request)).await?;
//! }
//! ```


pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations for testing.
pub mod mocks {
    use futures::future::BoxFuture;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;
    use tabbar_core::environment::Scheduler;
    use tabbar_runtime::TokioScheduler;

    /// Scripted stand-in for a remote service
    ///
    /// Each call pops the next queued result, falling back to the default
    /// once the queue is empty. An optional delay makes calls slow enough
    /// to cancel or time out.
    ///
    /// # Example
    ///
    /// ```
    /// use tabbar_testing::mocks::MockTransport;
    ///
    /// # tokio_test::block_on(async {
    /// let transport = MockTransport::<u32, String>::new(Ok(1));
    /// transport.respond_with(Err("offline".to_string()));
    ///
    /// assert_eq!(transport.call().await, Err("offline".to_string()));
    /// assert_eq!(transport.call().await, Ok(1));
    /// assert_eq!(transport.call_count(), 2);
    /// # });
    /// ```
    #[derive(Debug, Clone)]
    pub struct MockTransport<S, F> {
        fallback: Result<S, F>,
        queued: Arc<Mutex<VecDeque<Result<S, F>>>>,
        delay: Option<Duration>,
        calls: Arc<AtomicUsize>,
        completed: Arc<AtomicUsize>,
    }

    impl<S, F> MockTransport<S, F>
    where
        S: Clone + Send + 'static,
        F: Clone + Send + 'static,
    {
        /// Transport answering every call with `fallback`
        #[must_use]
        pub fn new(fallback: Result<S, F>) -> Self {
            Self {
                fallback,
                queued: Arc::new(Mutex::new(VecDeque::new())),
                delay: None,
                calls: Arc::new(AtomicUsize::new(0)),
                completed: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Wait `delay` before answering
        #[must_use]
        pub const fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Queue a result for the next call
        pub fn respond_with(&self, result: Result<S, F>) {
            self.queued
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(result);
        }

        /// Number of calls started
        #[must_use]
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Number of calls that ran to completion (not dropped mid-flight)
        #[must_use]
        pub fn completed_count(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }

        /// Perform one call
        pub fn call(&self) -> BoxFuture<'static, Result<S, F>> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let result = self
                .queued
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            let delay = self.delay;
            let completed = Arc::clone(&self.completed);

            Box::pin(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                completed.fetch_add(1, Ordering::SeqCst);
                result
            })
        }
    }

    /// Scheduler that counts spawned tasks and runs them on Tokio
    #[derive(Debug, Clone, Default)]
    pub struct RecordingScheduler {
        inner: TokioScheduler,
        spawned: Arc<AtomicUsize>,
    }

    impl RecordingScheduler {
        /// Create a scheduler on the ambient runtime
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of tasks spawned so far
        #[must_use]
        pub fn spawned(&self) -> usize {
            self.spawned.load(Ordering::SeqCst)
        }
    }

    impl Scheduler for RecordingScheduler {
        fn spawn(&self, task: BoxFuture<'static, ()>) {
            self.spawned.fetch_add(1, Ordering::SeqCst);
            self.inner.spawn(task);
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use tabbar_core::error::{
        NetworkError, ResourceLimitError, TokenFormatError, TransportError,
    };
    use tabbar_core::request::RequestAction;

    /// Any [`TransportError`], including the well-known codes
    pub fn transport_error() -> impl Strategy<Value = TransportError> {
        prop_oneof![
            Just(TransportError::timed_out()),
            Just(TransportError::cancelled()),
            (any::<i32>(), ".{0,24}").prop_map(|(code, message)| TransportError::new(code, message)),
        ]
    }

    /// Any [`NetworkError`]
    pub fn network_error() -> impl Strategy<Value = NetworkError> {
        prop_oneof![
            Just(NetworkError::RequestCreation),
            Just(NetworkError::InvalidAccessToken),
            Just(NetworkError::BlobImageDecodingFailed),
            ".{0,32}".prop_map(NetworkError::NetworkFailure),
            transport_error().prop_map(NetworkError::Transport),
            Just(NetworkError::TokenFormat(TokenFormatError::InvalidSikToken)),
            Just(NetworkError::ResourceLimit(ResourceLimitError::MaxEstimateExceeded)),
        ]
    }

    /// Any [`RequestAction`] whose success payload is drawn from `success`
    pub fn request_action<S>(
        success: impl Strategy<Value = S> + 'static,
    ) -> impl Strategy<Value = RequestAction<S, NetworkError>>
    where
        S: std::fmt::Debug + Clone + 'static,
    {
        prop_oneof![
            Just(RequestAction::Request),
            Just(RequestAction::CancelRequest),
            success.prop_map(RequestAction::success),
            network_error().prop_map(RequestAction::failure),
        ]
    }
}
