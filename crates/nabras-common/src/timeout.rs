//! Timeout helper for async operations.

use std::future::Future;
use std::time::Duration;

use crate::NabrasError;

/// Run an operation with a timeout.
///
/// `None` waits indefinitely.
pub async fn with_timeout<T, F, Fut>(
    timeout: Option<Duration>,
    operation: F,
) -> Result<T, NabrasError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, operation())
            .await
            .map_err(|_| NabrasError::Timeout(limit)),
        None => Ok(operation().await),
    }
}
