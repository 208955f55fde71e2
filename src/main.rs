use easybox_connect::{
    setup_device, AttributeConsumer, CoordinatorState, EasyBoxApi, Integration, RefreshStatus,
    RemoteReader, SetupError, Settings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting EasyBox connector");
    let settings = Settings::from_env();
    let reader: Arc<dyn RemoteReader> = Arc::new(EasyBoxApi::new(settings.router_url.clone()));

    let integration = setup_with_retry(&settings, reader).await?;
    report_fresh_values(&integration.consumers);

    let poller = integration.start_polling();
    let reporter = tokio::spawn(report_updates(
        integration.coordinator.subscribe_status(),
        integration.consumers.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    poller.abort();
    reporter.abort();

    Ok(())
}

/// Retries transient setup failures with exponential backoff. A broken
/// catalog or key mismatch fails immediately.
async fn setup_with_retry(
    settings: &Settings,
    reader: Arc<dyn RemoteReader>,
) -> Result<Integration, SetupError> {
    let max_attempts = settings.setup_retries;
    let mut attempt = 1;

    loop {
        match setup_device(settings, reader.clone()).await {
            Ok(integration) => return Ok(integration),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                warn!(
                    "Setup attempt {}/{} failed: {}. Retrying...",
                    attempt, max_attempts, e
                );
                sleep(Duration::from_secs(1 << (attempt - 1).min(6))).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Logs the consumers that got a new value after every successful cycle
async fn report_updates(
    mut status: watch::Receiver<RefreshStatus>,
    consumers: Vec<Arc<AttributeConsumer>>,
) {
    while status.changed().await.is_ok() {
        let current = status.borrow_and_update().clone();
        match current.state {
            CoordinatorState::Ready => report_fresh_values(&consumers),
            CoordinatorState::Failed => warn!(
                "Router unreachable, showing stale values: {}",
                current.last_error.unwrap_or_default()
            ),
            CoordinatorState::Idle | CoordinatorState::Refreshing => {}
        }
    }
}

fn report_fresh_values(consumers: &[Arc<AttributeConsumer>]) {
    for consumer in consumers.iter().filter(|c| c.take_fresh()) {
        let unit = consumer.unit().map(|u| u.symbol()).unwrap_or_default();
        info!(
            "{} ({}): {} {}",
            consumer.name(),
            consumer.unique_id(),
            consumer.last_value().unwrap_or_default(),
            unit
        );
    }
}
