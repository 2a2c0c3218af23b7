//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants inside
//! reducers.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use tabbar_core::async_effect;
///
/// async_effect! {
///     let items = client.fetch_feed().await.ok()?;
///     Some(FeedAction::Refreshed { count: items.len() })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use tabbar_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(30),
///     action: FeedAction::Load(RequestAction::CancelRequest)
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Wrap an effect into an `Effect::Cancellable` unit
///
/// # Example
///
/// ```rust,ignore
/// use tabbar_core::cancellable;
///
/// cancellable! {
///     id: "feed.load",
///     effect: async_effect! { Some(FeedAction::DismissError) }
/// }
/// ```
#[macro_export]
macro_rules! cancellable {
    (
        id: $id:expr,
        effect: $effect:expr
    ) => {
        $crate::effect::Effect::Cancellable {
            id: ::std::convert::Into::<$crate::effect::EffectId>::into($id),
            effect: ::std::boxed::Box::new($effect),
        }
    };
}
