//! App composition.
//!
//! Runs the tab bar and the feed as one feature. The feed loads itself the
//! first time its tab is opened.

use crate::feed::{FeedAction, FeedEnvironment, FeedReducer, FeedState};
use crate::tab_bar::{TabBarAction, TabBarEnvironment, TabBarReducer, TabBarState};
use serde::{Deserialize, Serialize};
use tabbar_core::composition::{combine_reducers, pullback, CombinedReducer};
use tabbar_core::request::RequestAction;
use tabbar_core::{effect::Effect, reducer::Reducer, SmallVec};

/// App state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// Tab selection
    pub tab_bar: TabBarState,
    /// Feed contents
    pub feed: FeedState,
}

/// App actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppAction {
    /// Tab selection
    TabBar(TabBarAction),
    /// Feed
    Feed(FeedAction),
}

/// App environment
#[derive(Clone)]
pub struct AppEnvironment {
    /// Tab bar collaborators
    pub tab_bar: TabBarEnvironment,
    /// Feed collaborators
    pub feed: FeedEnvironment,
}

impl AppEnvironment {
    /// Create an app environment around a feed environment
    #[must_use]
    pub const fn new(feed: FeedEnvironment) -> Self {
        Self {
            tab_bar: TabBarEnvironment,
            feed,
        }
    }
}

/// The composed app reducer
pub type AppReducer = CombinedReducer<AppState, AppAction, AppEnvironment>;

/// Reducer type accepted by [`combine_reducers`] for the app
type BoxedAppReducer = Box<dyn Reducer<State = AppState, Action = AppAction, Environment = AppEnvironment> + Send + Sync>;

fn tab_bar_state(state: &mut AppState) -> &mut TabBarState {
    &mut state.tab_bar
}

fn tab_bar_action(action: AppAction) -> Option<TabBarAction> {
    match action {
        AppAction::TabBar(action) => Some(action),
        AppAction::Feed(_) => None,
    }
}

const fn tab_bar_environment(env: &AppEnvironment) -> &TabBarEnvironment {
    &env.tab_bar
}

fn feed_state(state: &mut AppState) -> &mut FeedState {
    &mut state.feed
}

fn feed_action(action: AppAction) -> Option<FeedAction> {
    match action {
        AppAction::Feed(action) => Some(action),
        AppAction::TabBar(_) => None,
    }
}

const fn feed_environment(env: &AppEnvironment) -> &FeedEnvironment {
    &env.feed
}

/// Starts the first feed load when the feed tab is opened
///
/// Runs after the tab bar reducer, so it sees the updated selection. The
/// load is reduced in place, so a second selection already sees it.
#[derive(Debug, Clone, Copy, Default)]
struct FirstLoad;

impl Reducer for FirstLoad {
    type State = AppState;
    type Action = AppAction;
    type Environment = AppEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AppAction::TabBar(TabBarAction::FeedIsSelected) if !state.feed.requested => {
                tracing::debug!("Feed opened for the first time, loading");
                FeedReducer::new()
                    .reduce(&mut state.feed, FeedAction::Load(RequestAction::Request), &env.feed)
                    .into_iter()
                    .map(|effect| effect.map(AppAction::Feed))
                    .collect()
            },
            AppAction::TabBar(_) | AppAction::Feed(_) => SmallVec::new(),
        }
    }
}

/// Build the app reducer
#[must_use]
pub fn app_reducer() -> AppReducer {
    let reducers: Vec<BoxedAppReducer> = vec![
        Box::new(pullback(
            TabBarReducer::new(),
            tab_bar_state,
            tab_bar_action,
            AppAction::TabBar,
            tab_bar_environment,
        )),
        Box::new(pullback(
            FeedReducer::new(),
            feed_state,
            feed_action,
            AppAction::Feed,
            feed_environment,
        )),
        Box::new(FirstLoad),
    ];
    combine_reducers(reducers)
}
