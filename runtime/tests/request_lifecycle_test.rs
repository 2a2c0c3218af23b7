//! Integration tests for the request lifecycle: one response per request,
//! cancellation, superseding and deadlines.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::time::Duration;
use tabbar_core::effect::{Effect, EffectId};
use tabbar_core::error::{NetworkError, TransportError};
use tabbar_core::request::{cancel, perform, RequestAction};
use tabbar_core::{reducer::Reducer, smallvec, SmallVec};
use tabbar_runtime::driver::bounded;
use tabbar_runtime::Store;
use tabbar_testing::mocks::MockTransport;

type LoadAction = RequestAction<u32, NetworkError>;

const LOAD: EffectId = EffectId::from_static("test.load");

#[derive(Debug, Clone, Default, PartialEq)]
struct LoadState {
    value: Option<u32>,
    error: Option<String>,
    is_loading: bool,
    responses: usize,
}

struct LoadEnvironment {
    transport: MockTransport<u32, NetworkError>,
    timeout: Option<Duration>,
}

struct LoadReducer;

impl Reducer for LoadReducer {
    type State = LoadState;
    type Action = LoadAction;
    type Environment = LoadEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            RequestAction::Request => {
                state.is_loading = true;
                state.error = None;
                let work = bounded(env.transport.call(), env.timeout, || {
                    NetworkError::Transport(TransportError::timed_out())
                });
                smallvec![perform(LOAD, work, std::convert::identity)]
            },
            RequestAction::Response(result) => {
                state.is_loading = false;
                state.responses += 1;
                match result {
                    Ok(value) => state.value = Some(value),
                    Err(error) => state.error = Some(error.description()),
                }
                smallvec![Effect::None]
            },
            RequestAction::CancelRequest => {
                state.is_loading = false;
                smallvec![cancel(LOAD)]
            },
        }
    }
}

type LoadStore = Store<LoadState, LoadAction, LoadEnvironment, LoadReducer>;

fn load_store(transport: &MockTransport<u32, NetworkError>) -> LoadStore {
    Store::new(
        LoadState::default(),
        LoadReducer,
        LoadEnvironment {
            transport: transport.clone(),
            timeout: None,
        },
    )
}

#[tokio::test]
async fn test_request_delivers_exactly_one_response() {
    let transport = MockTransport::new(Ok(7));
    let store = load_store(&transport);

    let response = store
        .send_and_wait_for(RequestAction::Request, LoadAction::is_response, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(response, RequestAction::success(7));

    // Give a stray second response the chance to show up
    tokio::time::sleep(Duration::from_millis(20)).await;

    let state = store.state(Clone::clone).await;
    assert_eq!(state.value, Some(7));
    assert_eq!(state.responses, 1);
    assert!(!state.is_loading);
    assert_eq!(store.in_flight(), 0);
}

#[tokio::test]
async fn test_failed_request_surfaces_description() {
    let transport = MockTransport::new(Err(NetworkError::NetworkFailure("timeout".to_string())));
    let store = load_store(&transport);

    store
        .send_and_wait_for(RequestAction::Request, LoadAction::is_response, Duration::from_secs(1))
        .await
        .unwrap();

    let state = store.state(Clone::clone).await;
    assert_eq!(state.error.as_deref(), Some("timeout"));
    assert_eq!(state.value, None);
}

/// A request cancelled right after it was issued never reaches the reducer.
#[tokio::test]
async fn test_cancelled_request_never_responds() {
    let transport = MockTransport::new(Ok(1)).with_delay(Duration::from_millis(50));
    let store = load_store(&transport);
    let mut observed = store.subscribe_actions();

    store.send(RequestAction::Request).await.unwrap();
    store.send(RequestAction::CancelRequest).await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    let state = store.state(Clone::clone).await;
    assert_eq!(state.responses, 0);
    assert_eq!(state.value, None);
    assert!(!state.is_loading);

    // The work itself was dropped, not merely ignored
    assert_eq!(transport.call_count(), 1);
    assert_eq!(transport.completed_count(), 0);
    assert_eq!(store.in_flight(), 0);
    assert!(observed.try_recv().is_err());
}

#[tokio::test]
async fn test_cancel_with_nothing_in_flight_is_noop() {
    let transport = MockTransport::new(Ok(1));
    let store = load_store(&transport);

    let mut handle = store.send(RequestAction::CancelRequest).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(store.state(Clone::clone).await, LoadState::default());
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_after_response_changes_nothing() {
    let transport = MockTransport::new(Ok(3));
    let store = load_store(&transport);

    store
        .send_and_wait_for(RequestAction::Request, LoadAction::is_response, Duration::from_secs(1))
        .await
        .unwrap();
    store.send(RequestAction::CancelRequest).await.unwrap();

    let state = store.state(Clone::clone).await;
    assert_eq!(state.value, Some(3));
    assert_eq!(state.responses, 1);
}

/// A second request under the same id supersedes the first.
#[tokio::test]
async fn test_new_request_supersedes_in_flight_one() {
    let transport = MockTransport::new(Ok(0)).with_delay(Duration::from_millis(40));
    transport.respond_with(Ok(1));
    transport.respond_with(Ok(2));
    let store = load_store(&transport);

    store.send(RequestAction::Request).await.unwrap();
    store.send(RequestAction::Request).await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    let state = store.state(Clone::clone).await;
    assert_eq!(state.responses, 1);
    assert_eq!(state.value, Some(2));
    assert_eq!(transport.completed_count(), 1);
}

#[tokio::test]
async fn test_request_timeout_becomes_failed_response() {
    let transport = MockTransport::new(Ok(1)).with_delay(Duration::from_secs(5));
    let store = Store::new(
        LoadState::default(),
        LoadReducer,
        LoadEnvironment {
            transport: transport.clone(),
            timeout: Some(Duration::from_millis(20)),
        },
    );

    let response = store
        .send_and_wait_for(RequestAction::Request, LoadAction::is_response, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(
        response.into_response(),
        Some(Err(NetworkError::Transport(TransportError::timed_out())))
    );
    let state = store.state(Clone::clone).await;
    assert_eq!(state.responses, 1);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn test_shutdown_after_cancel_completes() {
    let transport = MockTransport::new(Ok(1)).with_delay(Duration::from_secs(5));
    let store = load_store(&transport);

    store.send(RequestAction::Request).await.unwrap();
    store.send(RequestAction::CancelRequest).await.unwrap();

    store.shutdown(Duration::from_secs(1)).await.unwrap();
}
