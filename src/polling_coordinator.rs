use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::PollSettings;
use crate::consumer::SnapshotSink;
use crate::consumer_registry::ConsumerRegistry;
use crate::error::{CatalogLoadError, ConfigurationMismatchError, FetchError, RefreshFailed};
use crate::key_catalog::KeyCatalog;
use crate::remote_reader::{with_timeout, RemoteReader};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Refreshing,
    Ready,
    Failed,
}

/// Outcome of the most recent refresh cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshStatus {
    pub state: CoordinatorState,
    pub last_update_success: bool,
    pub last_success_at: Option<Instant>,
    pub last_error: Option<String>,
    /// Number of completed cycles, successful or not
    pub cycles: u64,
}

impl Default for RefreshStatus {
    fn default() -> Self {
        Self {
            state: CoordinatorState::Idle,
            last_update_success: false,
            last_success_at: None,
            last_error: None,
            cycles: 0,
        }
    }
}

/// Polls one router for a fixed key set and fans each result out to the
/// registered consumers.
///
/// All consumers share one batched fetch per cycle. At most one cycle runs
/// at a time; a failed cycle keeps the previous snapshot.
pub struct PollingCoordinator {
    name: String,
    reader: Arc<dyn RemoteReader>,
    active_keys: Vec<String>,
    settings: PollSettings,
    snapshot: ArcSwapOption<Snapshot>,
    consumers: Mutex<ConsumerRegistry>,
    refresh_gate: Mutex<()>,
    status: watch::Sender<RefreshStatus>,
}

impl PollingCoordinator {
    /// Creates an idle coordinator. Duplicate keys are collapsed, order is kept.
    pub fn new(
        name: impl Into<String>,
        reader: Arc<dyn RemoteReader>,
        active_keys: Vec<String>,
        settings: PollSettings,
    ) -> Self {
        let mut keys: Vec<String> = Vec::with_capacity(active_keys.len());
        for key in active_keys {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        let name = name.into();
        info!("Coordinator `{}` manages keys {:?}", name, keys);

        let (status, _) = watch::channel(RefreshStatus::default());
        Self {
            name,
            reader,
            active_keys: keys,
            settings,
            snapshot: ArcSwapOption::empty(),
            consumers: Mutex::new(ConsumerRegistry::new()),
            refresh_gate: Mutex::new(()),
            status,
        }
    }

    /// Creates a coordinator polling the catalog's `queryKeys`
    pub fn from_catalog(
        name: impl Into<String>,
        catalog: &KeyCatalog,
        reader: Arc<dyn RemoteReader>,
        settings: PollSettings,
    ) -> Result<Self, CatalogLoadError> {
        Ok(Self::new(name, reader, catalog.query_keys()?, settings))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    pub fn active_keys(&self) -> &[String] {
        &self.active_keys
    }

    pub fn is_active_key(&self, key: &str) -> bool {
        self.active_keys.iter().any(|k| k == key)
    }

    pub fn ensure_active_key(&self, key: &str) -> Result<(), ConfigurationMismatchError> {
        if self.is_active_key(key) {
            Ok(())
        } else {
            Err(ConfigurationMismatchError {
                key: key.to_string(),
            })
        }
    }

    /// The snapshot of the last successful cycle
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    pub fn current_value(&self, key: &str) -> Option<String> {
        self.snapshot
            .load_full()
            .and_then(|s| s.get(key).map(str::to_string))
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<RefreshStatus> {
        self.status.subscribe()
    }

    pub fn last_update_success(&self) -> bool {
        self.status.borrow().last_update_success
    }

    /// Adds a consumer at the end of the notification order
    pub async fn register(
        &self,
        consumer: Arc<dyn SnapshotSink>,
    ) -> Result<(), ConfigurationMismatchError> {
        self.ensure_active_key(consumer.key())?;
        self.consumers.lock().await.register(consumer);
        Ok(())
    }

    /// Registers all consumers or none of them
    pub async fn register_all(
        &self,
        consumers: Vec<Arc<dyn SnapshotSink>>,
    ) -> Result<(), ConfigurationMismatchError> {
        for consumer in &consumers {
            self.ensure_active_key(consumer.key())?;
        }
        let mut registry = self.consumers.lock().await;
        for consumer in consumers {
            registry.register(consumer);
        }
        Ok(())
    }

    pub async fn consumer_count(&self) -> usize {
        self.consumers.lock().await.len()
    }

    /// Keys derived from the live registrations. Diagnostic only: polling
    /// always uses the configured key set.
    pub async fn registered_keys(&self) -> Vec<String> {
        self.consumers.lock().await.keys()
    }

    /// Runs one cycle now, waiting for any cycle already in flight.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, RefreshFailed> {
        let _gate = self.refresh_gate.lock().await;
        self.run_cycle().await.map_err(|source| RefreshFailed {
            coordinator: self.name.clone(),
            source,
        })
    }

    /// Runs one background cycle. Failures are logged, never returned.
    ///
    /// Returns false if another cycle was still in flight and this tick was skipped.
    pub async fn scheduled_tick(&self) -> bool {
        let Ok(_gate) = self.refresh_gate.try_lock() else {
            debug!("Coordinator `{}` still refreshing, skipping tick", self.name);
            return false;
        };
        if let Err(e) = self.run_cycle().await {
            warn!(
                "Scheduled refresh of `{}` failed, keeping previous data: {}",
                self.name, e
            );
        }
        true
    }

    /// Spawns the interval loop. The first tick fires one interval from now,
    /// since setup performs the initial refresh itself.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        let period = self.settings.update_interval;
        info!("Polling `{}` every {:?}", self.name, period);

        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if self.consumers.lock().await.is_empty() {
                debug!("No consumers registered on `{}`, not polling", self.name);
                continue;
            }
            self.scheduled_tick().await;
        }
    }

    async fn run_cycle(&self) -> Result<Arc<Snapshot>, FetchError> {
        self.status.send_modify(|s| s.state = CoordinatorState::Refreshing);
        debug!(
            "Fetching {} keys for `{}`",
            self.active_keys.len(),
            self.name
        );

        match with_timeout(self.settings.fetch_timeout, self.reader.fetch(&self.active_keys)).await
        {
            Ok(values) => {
                let snapshot = Arc::new(Snapshot::new(values));
                let missing = snapshot.missing(&self.active_keys);
                if !missing.is_empty() {
                    debug!("Router sent no value for {:?}", missing);
                }

                // Registry stays locked across the swap and the fan-out
                let consumers = self.consumers.lock().await;
                self.snapshot.store(Some(snapshot.clone()));
                let delivered = consumers.notify_all(&snapshot);
                drop(consumers);
                debug!(
                    "Refresh of `{}` delivered {} values",
                    self.name, delivered
                );

                self.status.send_modify(|s| {
                    s.state = CoordinatorState::Ready;
                    s.last_update_success = true;
                    s.last_success_at = Some(snapshot.fetched_at());
                    s.last_error = None;
                    s.cycles += 1;
                });
                Ok(snapshot)
            }
            Err(e) => {
                self.status.send_modify(|s| {
                    s.state = CoordinatorState::Failed;
                    s.last_update_success = false;
                    s.last_error = Some(e.to_string());
                    s.cycles += 1;
                });
                Err(e)
            }
        }
    }
}
