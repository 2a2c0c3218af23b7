//! Integration tests for Store effect execution and action observation

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use tabbar_core::{async_effect, delay, effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tabbar_runtime::{Store, StoreConfig, StoreError};
use tabbar_testing::mocks::RecordingScheduler;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum BadgeAction {
    /// Start a multi-step badge sync
    Sync { id: u64 },
    /// One sync step finished
    StepSynced { id: u64, step: u32 },
    /// Sync finished (terminal action)
    Synced { id: u64 },
    /// Bump the unread count
    Bump,
    /// Unread count changed
    Bumped { value: u32 },
    /// Clear after a delay
    ClearLater,
    /// Clear the count
    Clear,
    /// Run steps in order
    Chain,
    /// Record a step of a chain
    Record(u32),
}

#[derive(Debug, Clone, Default)]
struct BadgeState {
    unread: u32,
    steps: Vec<u32>,
    recorded: Vec<u32>,
}

#[derive(Clone)]
struct BadgeEnvironment;

#[derive(Clone)]
struct BadgeReducer;

impl Reducer for BadgeReducer {
    type State = BadgeState;
    type Action = BadgeAction;
    type Environment = BadgeEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            BadgeAction::Sync { id } => {
                state.steps.clear();
                smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Some(BadgeAction::StepSynced { id, step: 1 })
                }))]
            },
            BadgeAction::StepSynced { id, step } => {
                state.steps.push(step);
                if step < 3 {
                    smallvec![Effect::Future(Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Some(BadgeAction::StepSynced { id, step: step + 1 })
                    }))]
                } else {
                    smallvec![Effect::Future(Box::pin(async move { Some(BadgeAction::Synced { id }) }))]
                }
            },
            BadgeAction::Bump => {
                state.unread += 1;
                let value = state.unread;
                smallvec![async_effect! { Some(BadgeAction::Bumped { value }) }]
            },
            BadgeAction::ClearLater => smallvec![delay! {
                duration: Duration::from_millis(20),
                action: BadgeAction::Clear
            }],
            BadgeAction::Clear => {
                state.unread = 0;
                smallvec![Effect::None]
            },
            BadgeAction::Chain => smallvec![Effect::chain(vec![
                Effect::Future(Box::pin(async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Some(BadgeAction::Record(1))
                })),
                Effect::Future(Box::pin(async { Some(BadgeAction::Record(2)) })),
            ])],
            BadgeAction::Record(step) => {
                state.recorded.push(step);
                smallvec![Effect::None]
            },
            BadgeAction::Synced { .. } | BadgeAction::Bumped { .. } => smallvec![Effect::None],
        }
    }
}

fn badge_store() -> Store<BadgeState, BadgeAction, BadgeEnvironment, BadgeReducer> {
    Store::new(BadgeState::default(), BadgeReducer, BadgeEnvironment)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_send_updates_state() {
    let store = badge_store();

    store.send(BadgeAction::Bump).await.unwrap();
    store.send(BadgeAction::Bump).await.unwrap();

    assert_eq!(store.state(|s| s.unread).await, 2);
}

/// Verifies that we can send an action and wait for the action its
/// effect feeds back.
#[tokio::test]
async fn test_send_and_wait_for_immediate() {
    let store = badge_store();

    let result = store
        .send_and_wait_for(
            BadgeAction::Bump,
            |action| matches!(action, BadgeAction::Bumped { .. }),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result.unwrap(), BadgeAction::Bumped { value: 1 });
}

#[tokio::test]
async fn test_send_and_wait_for_multi_step_flow() {
    let store = badge_store();

    let result = store
        .send_and_wait_for(
            BadgeAction::Sync { id: 42 },
            |action| matches!(action, BadgeAction::Synced { id: 42 }),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result.unwrap(), BadgeAction::Synced { id: 42 });
    assert_eq!(store.state(|s| s.steps.clone()).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_send_and_wait_for_timeout() {
    let store = badge_store();

    let result = store
        .send_and_wait_for(
            BadgeAction::Sync { id: 99 },
            |action| matches!(action, BadgeAction::Clear),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

/// Subscribers receive every action produced by effects, in order.
#[tokio::test]
async fn test_subscribe_actions_streaming() {
    let store = badge_store();
    let mut rx = store.subscribe_actions();

    store.send(BadgeAction::Sync { id: 100 }).await.unwrap();

    let mut received = Vec::new();
    while received.len() < 4 {
        let action = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for action")
            .expect("channel closed");
        received.push(action);
    }

    assert_eq!(
        received,
        vec![
            BadgeAction::StepSynced { id: 100, step: 1 },
            BadgeAction::StepSynced { id: 100, step: 2 },
            BadgeAction::StepSynced { id: 100, step: 3 },
            BadgeAction::Synced { id: 100 },
        ]
    );
}

#[tokio::test]
async fn test_concurrent_senders() {
    let store = Arc::new(badge_store());
    let mut handles = vec![];

    for _ in 0..10 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move { store.send(BadgeAction::Bump).await.map(|_| ()) }));
    }

    for handle in handles {
        handle.await.expect("Task panicked").unwrap();
    }

    assert_eq!(store.state(|s| s.unread).await, 10);
}

#[tokio::test]
async fn test_delay_effect_dispatches_later() {
    let store = badge_store();
    store.send(BadgeAction::Bump).await.unwrap();

    let mut handle = store.send(BadgeAction::ClearLater).await.unwrap();
    assert_eq!(store.state(|s| s.unread).await, 1);

    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
    assert_eq!(store.state(|s| s.unread).await, 0);
}

#[tokio::test]
async fn test_sequential_effects_run_in_order() {
    let store = badge_store();

    let mut handle = store.send(BadgeAction::Chain).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(store.state(|s| s.recorded.clone()).await, vec![1, 2]);
}

#[tokio::test]
async fn test_effects_run_on_configured_scheduler() {
    let scheduler = RecordingScheduler::new();
    let config = StoreConfig::default().with_scheduler(Arc::new(scheduler.clone()));
    let store = Store::with_config(BadgeState::default(), BadgeReducer, BadgeEnvironment, config);

    let mut handle = store.send(BadgeAction::Bump).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(scheduler.spawned(), 1);
}

#[tokio::test]
async fn test_shutdown_rejects_new_actions() {
    let store = badge_store();

    store.shutdown(Duration::from_secs(1)).await.unwrap();

    let result = store.send(BadgeAction::Bump).await;
    assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
}

#[tokio::test]
async fn test_shutdown_times_out_with_running_effects() {
    let store = badge_store();
    store.send(BadgeAction::Sync { id: 1 }).await.unwrap();

    let result = store.shutdown(Duration::ZERO).await;
    assert!(matches!(result, Err(StoreError::ShutdownTimeout(n)) if n > 0));
}
