use async_trait::async_trait;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::error::FetchError;
use crate::remote_reader::RemoteReader;

/// HTTP client for the router's JSON gateway
pub struct EasyBoxApi {
    endpoint_url: String,
    client: reqwest::Client,
}

impl EasyBoxApi {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn ensure_configured(&self) -> Result<(), FetchError> {
        if self.endpoint_url.is_empty() {
            return Err(FetchError::NotConfigured);
        }
        Ok(())
    }

    fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(FetchError::Unavailable(format!(
            "{} returned {}",
            response.url().path(),
            status
        )))
    }
}

#[async_trait]
impl RemoteReader for EasyBoxApi {
    async fn fetch(&self, keys: &[String]) -> Result<HashMap<String, String>, FetchError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        self.ensure_configured()?;

        debug!("Requesting {} keys from {}", keys.len(), self.endpoint_url);
        let response = self
            .client
            .post(format!("{}/api/v1/values", self.endpoint_url))
            .json(&ValuesRequest { keys })
            .send()
            .await?;
        let body: ValuesResponse = Self::check_status(response)?.json().await?;

        Ok(body
            .values
            .into_iter()
            .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key, v)))
            .collect())
    }

    async fn resolve_device_name(&self) -> Result<String, FetchError> {
        self.ensure_configured()?;

        let response = self
            .client
            .get(format!("{}/api/v1/router/name", self.endpoint_url))
            .send()
            .await?;
        let body: RouterName = Self::check_status(response)?.json().await?;
        if body.name.is_empty() {
            return Err(FetchError::Malformed("empty router name".to_string()));
        }
        Ok(body.name)
    }
}

#[derive(Debug, Serialize)]
struct ValuesRequest<'a> {
    keys: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    values: HashMap<String, Value>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
struct RouterName {
    name: String,
}

/// Flattens a JSON scalar into the opaque string value consumers see.
/// `null` means the router has no value for the key.
fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
