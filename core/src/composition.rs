//! Reducer composition utilities
//!
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`pullback`**: Lift a child feature's reducer into a parent feature
//!
//! # Example
//!
//! ```
//! use tabbar_core::{smallvec, SmallVec};
//! use tabbar_core::composition::{combine_reducers, pullback};
//! use tabbar_core::effect::Effect;
//! use tabbar_core::reducer::Reducer;
//!
//! #[derive(Clone, Debug, Default)]
//! struct BadgeState { unread: u32 }
//!
//! #[derive(Clone, Debug)]
//! enum BadgeAction { Bump }
//!
//! struct BadgeReducer;
//!
//! impl Reducer for BadgeReducer {
//!     type State = BadgeState;
//!     type Action = BadgeAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut BadgeState, action: BadgeAction, _env: &()) -> SmallVec<[Effect<BadgeAction>; 4]> {
//!         match action {
//!             BadgeAction::Bump => state.unread += 1,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! #[derive(Clone, Debug, Default)]
//! struct AppState { badge: BadgeState }
//!
//! #[derive(Clone, Debug)]
//! enum AppAction { Badge(BadgeAction), Ignored }
//!
//! fn badge(state: &mut AppState) -> &mut BadgeState {
//!     &mut state.badge
//! }
//!
//! fn badge_action(action: AppAction) -> Option<BadgeAction> {
//!     match action {
//!         AppAction::Badge(action) => Some(action),
//!         AppAction::Ignored => None,
//!     }
//! }
//!
//! fn unit(env: &()) -> &() {
//!     env
//! }
//!
//! let app = combine_reducers(vec![Box::new(pullback(
//!     BadgeReducer,
//!     badge,
//!     badge_action,
//!     AppAction::Badge,
//!     unit,
//! ))]);
//!
//! let mut state = AppState::default();
//! let _ = app.reduce(&mut state, AppAction::Badge(BadgeAction::Bump), &());
//! let _ = app.reduce(&mut state, AppAction::Ignored, &());
//! assert_eq!(state.badge.unread, 1);
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, and all effects are collected and concatenated.
///
/// # Type Parameters
///
/// - `S`: The state type
/// - `A`: The action type
/// - `E`: The environment type
#[must_use]
pub fn combine_reducers<S, A, E>(
    reducers: Vec<Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>>,
) -> CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    reducers: Vec<Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>>,
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects);
        }

        all_effects
    }
}

/// Lifts a child reducer into a parent state, action and environment.
///
/// - `state`: focuses the parent state on the child's state
/// - `extract`: returns the child action if the parent action targets the child
/// - `embed`: wraps child actions produced by child effects back into parent actions
/// - `environment`: projects the parent environment onto the child's
///
/// Parent actions the child does not handle produce no effects.
pub fn pullback<R, S, A, E>(
    reducer: R,
    state: fn(&mut S) -> &mut R::State,
    extract: fn(A) -> Option<R::Action>,
    embed: fn(R::Action) -> A,
    environment: fn(&E) -> &R::Environment,
) -> Pullback<R, S, A, E>
where
    R: Reducer,
{
    Pullback {
        reducer,
        state,
        extract,
        embed,
        environment,
    }
}

/// A child reducer running inside a parent feature.
///
/// Created by [`pullback`].
pub struct Pullback<R, S, A, E>
where
    R: Reducer,
{
    reducer: R,
    state: fn(&mut S) -> &mut R::State,
    extract: fn(A) -> Option<R::Action>,
    embed: fn(R::Action) -> A,
    environment: fn(&E) -> &R::Environment,
}

impl<R, S, A, E> Reducer for Pullback<R, S, A, E>
where
    R: Reducer,
    R::Action: Send + 'static,
    A: Send + 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let Some(child_action) = (self.extract)(action) else {
            return SmallVec::new();
        };

        let child_state = (self.state)(state);
        let child_env = (self.environment)(env);
        let embed = self.embed;

        self.reducer
            .reduce(child_state, child_action, child_env)
            .into_iter()
            .map(|effect| effect.map(embed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{smallvec, SmallVec};

    #[derive(Clone, Default)]
    struct TestState {
        counter: i32,
        name: String,
    }

    #[derive(Clone)]
    enum TestAction {
        Increment,
        Decrement,
        SetName(String),
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.counter += 1;
                    smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.counter -= 1;
                    smallvec![Effect::None]
                },
                TestAction::SetName(_) => smallvec![Effect::None],
            }
        }
    }

    struct NameReducer;

    impl Reducer for NameReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            if let TestAction::SetName(name) = action {
                state.name = name;
            }
            smallvec![Effect::None]
        }
    }

    #[test]
    fn test_combine_reducers() {
        let combined = combine_reducers(vec![Box::new(CounterReducer), Box::new(NameReducer)]);

        let mut state = TestState::default();

        let effects = combined.reduce(&mut state, TestAction::Increment, &());
        assert_eq!(state.counter, 1);
        assert_eq!(effects.len(), 2); // one Effect::None per reducer

        let _ = combined.reduce(&mut state, TestAction::SetName("Alice".to_string()), &());
        assert_eq!(state.name, "Alice");

        let _ = combined.reduce(&mut state, TestAction::Decrement, &());
        assert_eq!(state.counter, 0);
        assert_eq!(state.name, "Alice");
    }

    // Pullback tests
    #[derive(Clone, Default)]
    struct SubState {
        value: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum SubAction {
        Add(i32),
        Echo(i32),
    }

    struct SubEnv {
        factor: i32,
    }

    struct SubReducer;

    impl Reducer for SubReducer {
        type State = SubState;
        type Action = SubAction;
        type Environment = SubEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                SubAction::Add(n) => {
                    state.value += n * env.factor;
                    smallvec![Effect::Delay {
                        duration: std::time::Duration::ZERO,
                        action: Box::new(SubAction::Echo(state.value)),
                    }]
                },
                SubAction::Echo(_) => smallvec![Effect::None],
            }
        }
    }

    #[derive(Default)]
    struct ParentState {
        sub: SubState,
        other: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum ParentAction {
        Sub(SubAction),
        Rename(String),
    }

    struct ParentEnv {
        sub: SubEnv,
    }

    fn sub_state(parent: &mut ParentState) -> &mut SubState {
        &mut parent.sub
    }

    fn sub_action(action: ParentAction) -> Option<SubAction> {
        match action {
            ParentAction::Sub(sub) => Some(sub),
            ParentAction::Rename(_) => None,
        }
    }

    fn sub_env(env: &ParentEnv) -> &SubEnv {
        &env.sub
    }

    fn parent_reducer() -> Pullback<SubReducer, ParentState, ParentAction, ParentEnv> {
        pullback(SubReducer, sub_state, sub_action, ParentAction::Sub, sub_env)
    }

    #[test]
    fn test_pullback_focuses_state_and_environment() {
        let reducer = parent_reducer();
        let env = ParentEnv {
            sub: SubEnv { factor: 3 },
        };
        let mut state = ParentState {
            sub: SubState { value: 5 },
            other: "test".to_string(),
        };

        let effects = reducer.reduce(&mut state, ParentAction::Sub(SubAction::Add(2)), &env);

        assert_eq!(state.sub.value, 11);
        assert_eq!(state.other, "test");
        assert_eq!(effects.len(), 1);
        assert!(matches!(
            &effects[0],
            Effect::Delay { action, .. } if **action == ParentAction::Sub(SubAction::Echo(11))
        ));
    }

    #[test]
    fn test_pullback_ignores_foreign_actions() {
        let reducer = parent_reducer();
        let env = ParentEnv {
            sub: SubEnv { factor: 1 },
        };
        let mut state = ParentState::default();

        let effects = reducer.reduce(&mut state, ParentAction::Rename("x".to_string()), &env);

        assert!(effects.is_empty());
        assert_eq!(state.sub.value, 0);
    }
}
