//! The request lifecycle of one unit of asynchronous work.
//!
//! [`RequestAction`] is the action every feature embeds to model
//! "start a request, receive exactly one typed result, or cancel".
//!
//! ```text
//! Request ──► (driver performs work) ──► Response(Ok | Err)
//!    │
//!    └──► CancelRequest ──► driver aborts, no Response follows
//! ```
//!
//! The reducer handling `Request` returns [`perform`]; the reducer handling
//! `CancelRequest` returns [`cancel`]. The driver guarantees a cancelled unit
//! never delivers its `Response`. Delivering a second `Response` for a unit
//! that already resolved is a contract violation of the work itself and is
//! not checked at runtime.
//!
//! # Example
//!
//! ```
//! use tabbar_core::effect::{Effect, EffectId};
//! use tabbar_core::error::NetworkError;
//! use tabbar_core::request::{self, RequestAction};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum ProfileAction {
//!     Fetch(RequestAction<String, NetworkError>),
//! }
//!
//! const FETCH: EffectId = EffectId::from_static("profile.fetch");
//!
//! let effect: Effect<ProfileAction> = request::perform(
//!     FETCH,
//!     async { Ok::<_, NetworkError>("Ada".to_string()) },
//!     ProfileAction::Fetch,
//! );
//! assert!(matches!(effect, Effect::Cancellable { .. }));
//! ```

use crate::effect::{Effect, EffectId};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Capabilities required of a request's failure type: describable and comparable.
pub trait RequestFailure: std::error::Error + PartialEq + Clone + Send + 'static {}

impl<F> RequestFailure for F where F: std::error::Error + PartialEq + Clone + Send + 'static {}

/// Lifecycle of a single asynchronous unit of work.
///
/// # Type Parameters
///
/// - `S`: Value produced by a successful call
/// - `F`: Failure reported when the call fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestAction<S, F> {
    /// Begin the work
    Request,

    /// The unique completion of the in-flight work
    Response(Result<S, F>),

    /// Abandon the in-flight work; no `Response` follows
    CancelRequest,
}

impl<S, F> RequestAction<S, F> {
    /// A successful response
    #[must_use]
    pub const fn success(value: S) -> Self {
        Self::Response(Ok(value))
    }

    /// A failed response
    #[must_use]
    pub const fn failure(error: F) -> Self {
        Self::Response(Err(error))
    }

    /// True for `Request`
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(self, Self::Request)
    }

    /// True for `Response`
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// True for `CancelRequest`
    #[must_use]
    pub const fn is_cancel(&self) -> bool {
        matches!(self, Self::CancelRequest)
    }

    /// Borrow the outcome carried by a `Response`
    #[must_use]
    pub const fn as_response(&self) -> Option<&Result<S, F>> {
        match self {
            Self::Response(result) => Some(result),
            Self::Request | Self::CancelRequest => None,
        }
    }

    /// Take the outcome carried by a `Response`
    #[must_use]
    pub fn into_response(self) -> Option<Result<S, F>> {
        match self {
            Self::Response(result) => Some(result),
            Self::Request | Self::CancelRequest => None,
        }
    }

    /// The success payload, if this is a successful `Response`
    #[must_use]
    pub fn success_value(self) -> Option<S> {
        self.into_response().and_then(Result::ok)
    }

    /// The failure payload, if this is a failed `Response`
    #[must_use]
    pub fn failure_value(self) -> Option<F> {
        self.into_response().and_then(Result::err)
    }

    /// Transform the success type, keeping the lifecycle stage
    #[must_use]
    pub fn map_success<T>(self, f: impl FnOnce(S) -> T) -> RequestAction<T, F> {
        match self {
            Self::Request => RequestAction::Request,
            Self::Response(result) => RequestAction::Response(result.map(f)),
            Self::CancelRequest => RequestAction::CancelRequest,
        }
    }
}

impl<S, F: RequestFailure> RequestAction<S, F> {
    /// Description of the failure carried by a failed `Response`
    #[must_use]
    pub fn failure_description(&self) -> Option<String> {
        match self.as_response() {
            Some(Err(error)) => Some(error.to_string()),
            Some(Ok(_)) | None => None,
        }
    }
}

/// Describe performing `work` as the cancellable unit `id`.
///
/// The effect resolves to exactly one action: `embed(Response(result))`.
/// Issuing another `perform` with the same id while this one is in flight
/// supersedes it.
pub fn perform<S, F, A, Fut, E>(id: EffectId, work: Fut, embed: E) -> Effect<A>
where
    Fut: Future<Output = Result<S, F>> + Send + 'static,
    S: Send + 'static,
    F: RequestFailure,
    E: FnOnce(RequestAction<S, F>) -> A + Send + 'static,
    A: Send + 'static,
{
    crate::cancellable! {
        id: id,
        effect: crate::async_effect! {
            let result = work.await;
            Some(embed(RequestAction::Response(result)))
        }
    }
}

/// Describe cancelling the unit `id`; a no-op when nothing is in flight.
#[must_use]
pub const fn cancel<A>(id: EffectId) -> Effect<A> {
    Effect::Cancel(id)
}
