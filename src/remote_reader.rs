use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Batched read access to the router.
///
/// Implementations perform one round-trip per call. Timeouts are enforced
/// by the caller, so an implementation may simply await its transport.
#[async_trait]
pub trait RemoteReader: Send + Sync {
    /// Reads the current value of every key in `keys`.
    ///
    /// Must accept an empty or single-key set. Keys the router does not know
    /// may be left out of the result.
    async fn fetch(&self, keys: &[String]) -> Result<HashMap<String, String>, FetchError>;

    /// Reads the router's display name. Not part of the batch path.
    async fn resolve_device_name(&self) -> Result<String, FetchError>;
}

/// Bounds a reader call; an expired call is abandoned and reported as a timeout.
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| FetchError::Timeout { timeout })?
}
