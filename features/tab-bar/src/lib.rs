//! # Tab Bar
//!
//! A tab bar with a profile tab and a feed tab, built on the Tab Bar Framework.
//!
//! This crate showcases:
//! - A pure state machine with no side effects ([`tab_bar`])
//! - A network-backed feature driven by the request lifecycle ([`feed`])
//! - Composing features with `pullback` and `combine_reducers` ([`app`])
//!
//! ## Example
//!
//! ```no_run
//! use tab_bar::{TabBarAction, TabBarEnvironment, TabBarReducer, TabBarState};
//! use tabbar_runtime::Store;
//!
//! # async fn example() -> Result<(), tabbar_runtime::StoreError> {
//! let store = Store::new(TabBarState::default(), TabBarReducer::new(), TabBarEnvironment);
//!
//! store.send(TabBarAction::FeedIsSelected).await?;
//! let feed_selected = store.state(|s| s.feed_selected).await;
//! assert!(feed_selected);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod feed;
pub mod tab_bar;

pub use app::{app_reducer, AppAction, AppEnvironment, AppReducer, AppState};
pub use feed::{FeedAction, FeedClient, FeedEnvironment, FeedItem, FeedReducer, FeedState, FEED_LOAD};
pub use tab_bar::{Tab, TabBarAction, TabBarEnvironment, TabBarReducer, TabBarState};
