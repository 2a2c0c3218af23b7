//! Activity feed.
//!
//! Loads feed items from a remote service through the request lifecycle.
//! Failures are shown as an error message until dismissed or the next load.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabbar_core::effect::{Effect, EffectId};
use tabbar_core::environment::{NetworkEnvironment, SettableAccessToken};
use tabbar_core::error::{NetworkError, TransportError};
use tabbar_core::request::{self, RequestAction};
use tabbar_core::{reducer::Reducer, smallvec, SmallVec};
use tabbar_runtime::driver;

/// Id of the in-flight feed load
pub const FEED_LOAD: EffectId = EffectId::from_static("feed.load");

/// One entry of the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Server-side id
    pub id: u64,
    /// Headline shown in the list
    pub title: String,
}

impl FeedItem {
    /// Create a feed item
    #[must_use]
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// Feed state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedState {
    /// Items of the last successful load
    pub items: Vec<FeedItem>,
    /// A load is in flight
    pub is_loading: bool,
    /// Description of the last failure, until dismissed
    pub error: Option<String>,
    /// A load was requested at least once
    #[serde(default)]
    pub requested: bool,
}

/// Request lifecycle of a feed load
pub type FeedRequest = RequestAction<Vec<FeedItem>, NetworkError>;

/// Feed actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedAction {
    /// Load lifecycle
    Load(FeedRequest),
    /// Hand a new access token to the client
    SetAccessToken(String),
    /// Hide the error message
    DismissError,
}

/// Client for the feed service
///
/// Returned futures must not start any work until polled.
pub trait FeedClient: SettableAccessToken + Send + Sync {
    /// Fetch the current feed
    fn fetch_feed(&self) -> BoxFuture<'static, Result<Vec<FeedItem>, NetworkError>>;
}

/// Feed environment
pub type FeedEnvironment = NetworkEnvironment<Arc<dyn FeedClient>>;

/// Feed reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedReducer;

impl FeedReducer {
    /// Create a new feed reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for FeedReducer {
    type State = FeedState;
    type Action = FeedAction;
    type Environment = FeedEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            FeedAction::Load(RequestAction::Request) => {
                state.is_loading = true;
                state.requested = true;
                state.error = None;

                let work = driver::bounded(env.client.fetch_feed(), env.request_timeout, || {
                    NetworkError::Transport(TransportError::timed_out())
                });
                smallvec![request::perform(FEED_LOAD, work, FeedAction::Load)]
            },
            FeedAction::Load(RequestAction::Response(Ok(items))) => {
                state.is_loading = false;
                state.items = items;
                smallvec![Effect::None]
            },
            FeedAction::Load(RequestAction::Response(Err(error))) => {
                tracing::debug!(error = %error, "Feed load failed");
                state.is_loading = false;
                state.error = Some(error.description());
                smallvec![Effect::None]
            },
            FeedAction::Load(RequestAction::CancelRequest) => {
                state.is_loading = false;
                smallvec![request::cancel(FEED_LOAD)]
            },
            FeedAction::SetAccessToken(token) => {
                smallvec![env.client.set_access_token(token).fire_and_forget()]
            },
            FeedAction::DismissError => {
                state.error = None;
                smallvec![Effect::None]
            },
        }
    }
}
