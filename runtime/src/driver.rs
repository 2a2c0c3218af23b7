//! Driver-level policies for request work.
//!
//! The core defines no timeouts: a deadline is a timer owned by the driver
//! that turns slow work into a failed response.

use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;

/// Resolve `work`, or `Err(on_timeout())` if it does not finish within `timeout`.
///
/// The work future is dropped on timeout.
///
/// # Errors
///
/// Returns the work's own error, or the synthesized timeout failure.
///
/// # Example
///
/// ```rust
/// use tabbar_core::error::NetworkError;
/// use tabbar_runtime::driver::with_timeout;
/// use std::time::Duration;
///
/// # async fn example() {
/// let result = with_timeout(
///     std::future::pending::<Result<(), NetworkError>>(),
///     Duration::from_millis(10),
///     || NetworkError::NetworkFailure("timeout".to_string()),
/// )
/// .await;
/// assert_eq!(result, Err(NetworkError::NetworkFailure("timeout".to_string())));
/// # }
/// ```
pub async fn with_timeout<T, F, Fut, O>(work: Fut, timeout: Duration, on_timeout: O) -> Result<T, F>
where
    Fut: Future<Output = Result<T, F>>,
    O: FnOnce() -> F,
{
    if let Ok(result) = tokio::time::timeout(timeout, work).await {
        result
    } else {
        tracing::warn!(timeout_ms = timeout.as_millis(), "Request exceeded its deadline");
        metrics::counter!("store.requests.timed_out").increment(1);
        Err(on_timeout())
    }
}

/// Box `work`, bounding it with [`with_timeout`] when a timeout is configured.
pub fn bounded<T, F, Fut, O>(work: Fut, timeout: Option<Duration>, on_timeout: O) -> BoxFuture<'static, Result<T, F>>
where
    Fut: Future<Output = Result<T, F>> + Send + 'static,
    O: FnOnce() -> F + Send + 'static,
    T: Send + 'static,
    F: Send + 'static,
{
    match timeout {
        Some(timeout) => Box::pin(with_timeout(work, timeout, on_timeout)),
        None => Box::pin(work),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabbar_core::error::{NetworkError, TransportError};

    #[tokio::test]
    async fn test_fast_work_passes_through() {
        let result = with_timeout(
            async { Ok::<_, NetworkError>(5) },
            Duration::from_secs(1),
            || NetworkError::Transport(TransportError::timed_out()),
        )
        .await;
        assert_eq!(result, Ok(5));
    }

    #[tokio::test]
    async fn test_slow_work_synthesizes_failure() {
        let result = with_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<u8, NetworkError>(1)
            },
            Duration::from_millis(10),
            || NetworkError::NetworkFailure("timeout".to_string()),
        )
        .await;

        let error = result.err();
        assert_eq!(error.as_ref().map(NetworkError::description).as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_bounded_without_timeout_waits_for_work() {
        let work = bounded(
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, NetworkError>("done")
            },
            None,
            || NetworkError::Transport(TransportError::timed_out()),
        );
        assert_eq!(work.await, Ok("done"));
    }
}
