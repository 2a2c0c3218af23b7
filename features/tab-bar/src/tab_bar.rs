//! Tab selection.
//!
//! A two-tab selector: selecting one tab deselects the other. The feature has
//! no collaborators and never produces side effects.

use serde::{Deserialize, Serialize};
use tabbar_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};

/// The tabs of the bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tab {
    /// The user's profile
    Profile,
    /// The activity feed
    Feed,
}

/// Tab bar state
///
/// At most one of the flags is `true`. Both are `false` until the first
/// selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabBarState {
    /// Profile tab is selected
    pub profile_selected: bool,
    /// Feed tab is selected
    pub feed_selected: bool,
}

impl TabBarState {
    /// The currently selected tab, if any
    #[must_use]
    pub const fn selected_tab(&self) -> Option<Tab> {
        match (self.profile_selected, self.feed_selected) {
            (true, false) => Some(Tab::Profile),
            (false, true) => Some(Tab::Feed),
            _ => None,
        }
    }
}

/// Tab bar actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TabBarAction {
    /// The user tapped the profile tab
    ProfileIsSelected,
    /// The user tapped the feed tab
    FeedIsSelected,
}

impl TabBarAction {
    /// The action selecting `tab`
    #[must_use]
    pub const fn select(tab: Tab) -> Self {
        match tab {
            Tab::Profile => Self::ProfileIsSelected,
            Tab::Feed => Self::FeedIsSelected,
        }
    }
}

/// Tab bar environment
///
/// The feature declares no dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabBarEnvironment;

/// Tab bar reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct TabBarReducer;

impl TabBarReducer {
    /// Create a new tab bar reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for TabBarReducer {
    type State = TabBarState;
    type Action = TabBarAction;
    type Environment = TabBarEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _environment: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        // Both flags are always written, even when the tab is already selected
        match action {
            TabBarAction::ProfileIsSelected => {
                state.profile_selected = true;
                state.feed_selected = false;
            },
            TabBarAction::FeedIsSelected => {
                state.profile_selected = false;
                state.feed_selected = true;
            },
        }

        smallvec![Effect::None]
    }
}
