// In-memory reader for unit tests. Answers are replayed in push order.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::FetchError;
use crate::remote_reader::RemoteReader;

pub(crate) struct ScriptedReader {
    device_name: String,
    answers: Mutex<VecDeque<Result<HashMap<String, String>, FetchError>>>,
    requests: Mutex<Vec<Vec<String>>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedReader {
    pub(crate) fn new(device_name: &str) -> Self {
        Self {
            device_name: device_name.to_string(),
            answers: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    pub(crate) fn push_ok(&self, values: HashMap<String, String>) {
        self.answers.lock().unwrap().push_back(Ok(values));
    }

    pub(crate) fn push_err(&self, err: FetchError) {
        self.answers.lock().unwrap().push_back(Err(err));
    }

    /// Makes every following fetch sleep before answering
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn requested_keys(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteReader for ScriptedReader {
    async fn fetch(&self, keys: &[String]) -> Result<HashMap<String, String>, FetchError> {
        self.requests.lock().unwrap().push(keys.to_vec());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Unavailable("no scripted answer".to_string())))
    }

    async fn resolve_device_name(&self) -> Result<String, FetchError> {
        Ok(self.device_name.clone())
    }
}

pub(crate) fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
