//! # Tab Bar Framework Core
//!
//! Core traits and types for the Tab Bar Framework.
//!
//! This crate provides the abstractions every feature of the framework is built
//! from: a unidirectional state-management pattern plus a reusable action type
//! for modeling asynchronous requests.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature
//! - **Action**: Discrete events applied to state, consumed exactly once
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Immutable collaborator handles injected into the reducer
//! - **`RequestAction`**: The `Request` / `Response` / `CancelRequest` lifecycle of
//!   one unit of asynchronous work
//!
//! ## Example
//!
//! ```
//! use tabbar_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct ToggleState {
//!     on: bool,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum ToggleAction {
//!     Toggle,
//! }
//!
//! struct ToggleReducer;
//!
//! impl Reducer for ToggleReducer {
//!     type State = ToggleState;
//!     type Action = ToggleAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ToggleState,
//!         action: ToggleAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<ToggleAction>; 4]> {
//!         match action {
//!             ToggleAction::Toggle => state.on = !state.on,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = ToggleState::default();
//! let _ = ToggleReducer.reduce(&mut state, ToggleAction::Toggle, &());
//! assert!(state.on);
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer composition (`combine_reducers`, `pullback`)
pub mod composition;

/// Declarative macros for building effects
pub mod effect_macros;

/// Error taxonomy shared by network-backed features
pub mod error;

/// Generic request-lifecycle action
pub mod request;

/// Access-token validation
pub mod token;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Contract
    ///
    /// - The reducer is the only writer of `State`.
    /// - It performs no I/O and never blocks. Asynchronous work is returned as
    ///   [`Effect`] descriptions and executed by a driver.
    /// - Identical inputs produce identical state changes and effects.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable and cancellable.
pub mod effect {
    use serde::{Deserialize, Serialize};
    use std::borrow::Cow;
    use std::convert::Infallible;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identifier of a cancellable unit of work.
    ///
    /// Two [`Effect::Cancellable`] effects sharing an id are the same logical
    /// request: the newer one supersedes the older.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct EffectId(Cow<'static, str>);

    impl EffectId {
        /// Create an id from a static name (usable in `const` items)
        #[must_use]
        pub const fn from_static(name: &'static str) -> Self {
            Self(Cow::Borrowed(name))
        }

        /// Create an id from any string
        #[must_use]
        pub fn new(name: impl Into<String>) -> Self {
            Self(Cow::Owned(name.into()))
        }

        /// The id as a string slice
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl std::fmt::Display for EffectId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<&'static str> for EffectId {
        fn from(name: &'static str) -> Self {
            Self::from_static(name)
        }
    }

    /// Boxed future carried by [`Effect::Future`]
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(EffectFuture<Action>),

        /// Run `effect` as the in-flight unit named `id`
        ///
        /// Starting a new unit under an id that is still in flight cancels the
        /// older one. Actions produced after the unit was cancelled never reach
        /// the reducer.
        Cancellable {
            /// Name of the unit of work
            id: EffectId,
            /// The work itself
            effect: Box<Effect<Action>>,
        },

        /// Cancel the in-flight unit named by the id
        ///
        /// A no-op when nothing with that id is in flight.
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Run this effect as the cancellable unit `id`
        #[must_use]
        pub fn cancellable(self, id: impl Into<EffectId>) -> Effect<Action> {
            Effect::Cancellable {
                id: id.into(),
                effect: Box::new(self),
            }
        }

        /// True for `Effect::None`
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// Transform every action this effect can produce
        ///
        /// Used to lift a child feature's effects into a parent action type.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            F: Fn(Action) -> B + Clone + Send + Sync + 'static,
            Action: Send + 'static,
            B: Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => {
                    Effect::Parallel(effects.into_iter().map(|e| e.map(f.clone())).collect())
                },
                Effect::Sequential(effects) => {
                    Effect::Sequential(effects.into_iter().map(|e| e.map(f.clone())).collect())
                },
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
                Effect::Cancellable { id, effect } => Effect::Cancellable {
                    id,
                    effect: Box::new(effect.map(f)),
                },
                Effect::Cancel(id) => Effect::Cancel(id),
            }
        }
    }

    impl Effect<Infallible> {
        /// Re-type an effect that never produces an action
        #[must_use]
        pub fn fire_and_forget<B: Send + 'static>(self) -> Effect<B> {
            self.map(|never: Infallible| match never {})
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[derive(Debug, Clone, PartialEq)]
        enum Child {
            Done(u32),
        }

        #[derive(Debug, Clone, PartialEq)]
        enum Parent {
            Child(Child),
        }

        #[test]
        fn test_map_preserves_structure() {
            let effect: Effect<Child> = Effect::Parallel(vec![
                Effect::None,
                Effect::Delay {
                    duration: Duration::from_millis(5),
                    action: Box::new(Child::Done(1)),
                },
                Effect::Cancel(EffectId::from_static("child.load")),
            ]);

            let mapped = effect.map(Parent::Child);

            let Effect::Parallel(effects) = mapped else {
                unreachable!("map must keep the Parallel shape");
            };
            assert!(effects[0].is_none());
            assert!(matches!(
                &effects[1],
                Effect::Delay { action, .. } if **action == Parent::Child(Child::Done(1))
            ));
            assert!(matches!(&effects[2], Effect::Cancel(id) if id.as_str() == "child.load"));
        }

        #[test]
        fn test_map_future_output() {
            let effect: Effect<Child> = Effect::Future(Box::pin(async { Some(Child::Done(7)) }))
                .cancellable("child.load");

            let Effect::Cancellable { id, effect } = effect.map(Parent::Child) else {
                unreachable!("map must keep the Cancellable shape");
            };
            assert_eq!(id, EffectId::from_static("child.load"));

            let Effect::Future(fut) = *effect else {
                unreachable!("inner effect must stay a Future");
            };
            assert_eq!(
                tokio_test::block_on(fut),
                Some(Parent::Child(Child::Done(7)))
            );
        }

        #[test]
        fn test_fire_and_forget_produces_no_action() {
            let effect: Effect<Infallible> = Effect::Future(Box::pin(async { None }));
            let Effect::Future(fut) = effect.fire_and_forget::<Parent>() else {
                unreachable!("fire_and_forget keeps the Future shape");
            };
            assert_eq!(tokio_test::block_on(fut), None);
        }

        #[test]
        fn test_effect_id_display() {
            assert_eq!(EffectId::new("feed.load").to_string(), "feed.load");
            assert_eq!(EffectId::from("a"), EffectId::new("a"));
        }
    }
}

/// Environment module - Dependency injection
///
/// All external collaborators are abstracted behind traits and injected
/// via the Environment parameter. Environments are immutable: reconfiguring
/// means building a new one.
pub mod environment {
    use super::effect::Effect;
    use futures::future::BoxFuture;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::time::Duration;

    /// Execution context that effects are spawned on
    ///
    /// Passed explicitly instead of relying on a process-wide queue.
    pub trait Scheduler: Send + Sync {
        /// Run a task to completion in the background
        fn spawn(&self, task: BoxFuture<'static, ()>);
    }

    /// A client that accepts an access token out of band
    ///
    /// Setting the token is fire-and-forget: the returned effect never
    /// produces an action.
    pub trait SettableAccessToken {
        /// Describe storing the token for subsequent requests
        fn set_access_token(&self, token: String) -> Effect<Infallible>;
    }

    /// Environment shape shared by features that talk to an external service
    ///
    /// Bundles a client, the scheduler results are delivered on and an
    /// optional request timeout enforced by the driver.
    pub struct NetworkEnvironment<C> {
        /// Service client
        pub client: C,
        /// Execution context for effects
        pub scheduler: Arc<dyn Scheduler>,
        /// Upper bound for one request; `None` waits indefinitely
        pub request_timeout: Option<Duration>,
    }

    impl<C> NetworkEnvironment<C> {
        /// Create an environment without a request timeout
        #[must_use]
        pub fn new(client: C, scheduler: Arc<dyn Scheduler>) -> Self {
            Self {
                client,
                scheduler,
                request_timeout: None,
            }
        }

        /// Set the request timeout
        #[must_use]
        pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
            self.request_timeout = Some(timeout);
            self
        }
    }

    impl<C: Clone> Clone for NetworkEnvironment<C> {
        fn clone(&self) -> Self {
            Self {
                client: self.client.clone(),
                scheduler: Arc::clone(&self.scheduler),
                request_timeout: self.request_timeout,
            }
        }
    }

    impl<C: std::fmt::Debug> std::fmt::Debug for NetworkEnvironment<C> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("NetworkEnvironment")
                .field("client", &self.client)
                .field("request_timeout", &self.request_timeout)
                .finish_non_exhaustive()
        }
    }
}
