//! Tab bar demo binary
//!
//! Drives the composed app against an in-memory feed service: selecting
//! tabs, the first feed load (with a retried transient failure), and a
//! cancelled reload.

use futures::future::BoxFuture;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tab_bar::{app_reducer, AppAction, AppEnvironment, AppState, FeedAction, FeedClient, FeedItem, TabBarAction};
use tabbar_core::async_effect;
use tabbar_core::effect::Effect;
use tabbar_core::environment::{NetworkEnvironment, SettableAccessToken};
use tabbar_core::error::NetworkError;
use tabbar_core::request::RequestAction;
use tabbar_core::token::SikToken;
use tabbar_runtime::retry::{retry_transient, RetryPolicy};
use tabbar_runtime::{Store, StoreConfig, TokioScheduler};
use tabbar_testing::mocks::MockTransport;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Feed client backed by a scripted transport
struct DemoFeedClient {
    transport: MockTransport<Vec<FeedItem>, NetworkError>,
    token: Arc<Mutex<Option<SikToken>>>,
    retry: RetryPolicy,
}

impl SettableAccessToken for DemoFeedClient {
    fn set_access_token(&self, token: String) -> Effect<Infallible> {
        let slot = Arc::clone(&self.token);
        async_effect! {
            match SikToken::parse(&token) {
                Ok(token) => {
                    tracing::info!(data_center = token.data_center(), "Access token stored");
                    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
                },
                Err(error) => tracing::warn!(%error, "Rejected access token"),
            }
            None
        }
    }
}

impl FeedClient for DemoFeedClient {
    fn fetch_feed(&self) -> BoxFuture<'static, Result<Vec<FeedItem>, NetworkError>> {
        let token = Arc::clone(&self.token);
        let transport = self.transport.clone();
        let policy = self.retry.clone();

        Box::pin(async move {
            if token.lock().unwrap_or_else(PoisonError::into_inner).is_none() {
                return Err(NetworkError::InvalidAccessToken);
            }
            retry_transient(policy, || transport.call()).await
        })
    }
}

fn is_load_response(action: &AppAction) -> bool {
    matches!(action, AppAction::Feed(FeedAction::Load(load)) if load.is_response())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tab_bar=debug,tabbar_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Tab Bar Example ===\n");

    // The first call fails transiently and is retried
    let transport = MockTransport::new(Ok(vec![
        FeedItem::new(1, "Welcome to your feed"),
        FeedItem::new(2, "Three new estimates are ready"),
    ]))
    .with_delay(Duration::from_millis(50));
    transport.respond_with(Err(NetworkError::NetworkFailure("connection reset".to_string())));

    let client = DemoFeedClient {
        transport: transport.clone(),
        token: Arc::new(Mutex::new(None)),
        retry: RetryPolicy::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(20))
            .build(),
    };

    let feed = NetworkEnvironment::new(
        Arc::new(client) as Arc<dyn FeedClient>,
        Arc::new(TokioScheduler::current()),
    )
    .with_request_timeout(Duration::from_secs(2));
    let env = AppEnvironment::new(feed);

    let config = StoreConfig::default().with_scheduler(Arc::clone(&env.feed.scheduler));
    let store = Store::with_config(AppState::default(), app_reducer(), env, config);

    let selected = store.state(|s| s.tab_bar.selected_tab()).await;
    println!("Initial selection: {selected:?}");

    println!("\n>>> Sending: SetAccessToken");
    let mut handle = store
        .send(AppAction::Feed(FeedAction::SetAccessToken(
            "/dc1/_T197/54babd3f-72ca-4776-99df-048969f764bc-106149_570492940".to_string(),
        )))
        .await?;
    handle.wait_with_timeout(Duration::from_secs(1)).await?;

    println!("\n>>> Sending: ProfileIsSelected");
    store.send(AppAction::TabBar(TabBarAction::ProfileIsSelected)).await?;
    let tab_bar = store.state(|s| s.tab_bar).await;
    println!("Tab bar: {tab_bar:?}");

    println!("\n>>> Sending: FeedIsSelected (first visit loads the feed)");
    let response = store
        .send_and_wait_for(
            AppAction::TabBar(TabBarAction::FeedIsSelected),
            is_load_response,
            Duration::from_secs(5),
        )
        .await?;
    println!("Response: {response:?}");
    let feed = store.state(|s| s.feed.clone()).await;
    println!("Feed: {} items, error: {:?}", feed.items.len(), feed.error);
    println!("Transport calls so far: {}", transport.call_count());

    println!("\n>>> Sending: Load(Request) then Load(CancelRequest)");
    store.send(AppAction::Feed(FeedAction::Load(RequestAction::Request))).await?;
    store.send(AppAction::Feed(FeedAction::Load(RequestAction::CancelRequest))).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let is_loading = store.state(|s| s.feed.is_loading).await;
    println!("Loading after cancel: {is_loading}, in flight: {}", store.in_flight());

    let snapshot = store.state(Clone::clone).await;
    println!("\nFinal state:\n{}", serde_json::to_string_pretty(&snapshot)?);

    store.shutdown_gracefully().await?;

    println!("\n=== Done ===");
    Ok(())
}
