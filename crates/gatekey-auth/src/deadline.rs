//! Bounded waits for store and mail calls.

use std::future::Future;
use std::time::Duration;

use crate::{AuthError, AuthResult};

/// Awaits `fut`, failing with `AuthError::Timeout` once `limit` elapses.
///
/// The inner future is dropped on timeout, which cancels the call.
pub async fn within<T, F>(limit: Duration, operation: &'static str, fut: F) -> AuthResult<T>
where
    F: Future<Output = AuthResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(operation, limit_ms = limit.as_millis() as u64, "Deadline exceeded");
            Err(AuthError::timeout(operation))
        }
    }
}
