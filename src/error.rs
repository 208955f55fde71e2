use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The catalog document could not be read. Fatal to setup, never retried.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("cannot read key catalog at {}: {source}", .path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key catalog is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("key catalog has no section named `{0}`")]
    MissingSection(String),

    #[error("key `{key}` appears more than once in section `{section}`")]
    DuplicateKey { section: String, key: String },
}

/// One remote read failed. Failure is all-or-nothing for a call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no router connection configured")]
    NotConfigured,

    #[error("router did not answer within {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("router unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected router response: {0}")]
    Malformed(String),
}

/// An explicitly awaited refresh failed; the device is not ready yet.
#[derive(Debug, Error)]
#[error("refresh of `{coordinator}` failed")]
pub struct RefreshFailed {
    pub coordinator: String,
    #[source]
    pub source: FetchError,
}

/// A consumer asked for a key outside the active key set.
#[derive(Debug, Error)]
#[error("key `{key}` is not part of the active key set")]
pub struct ConfigurationMismatchError {
    pub key: String,
}

/// Everything that can abort device setup.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),

    #[error("could not resolve device information")]
    DeviceUnavailable(#[source] FetchError),

    #[error("device not ready")]
    NotReady(#[from] RefreshFailed),

    #[error(transparent)]
    Mismatch(#[from] ConfigurationMismatchError),
}

impl SetupError {
    /// Transient failures the host may retry later. A broken deployment is not one of them.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady(_) | Self::DeviceUnavailable(_))
    }
}
