use std::sync::Arc;
use tracing::debug;

use crate::consumer::SnapshotSink;
use crate::snapshot::Snapshot;

/// Ordered set of consumers fed by one coordinator.
///
/// Duplicate keys are allowed; every registration is notified on its own.
#[derive(Default)]
pub struct ConsumerRegistry {
    consumers: Vec<Arc<dyn SnapshotSink>>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, consumer: Arc<dyn SnapshotSink>) {
        debug!("Registering consumer for `{}`", consumer.key());
        self.consumers.push(consumer);
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    /// Keys of the registered consumers, in registration order
    pub fn keys(&self) -> Vec<String> {
        self.consumers.iter().map(|c| c.key().to_string()).collect()
    }

    /// Hands `snapshot` to every consumer in registration order.
    ///
    /// A consumer whose key is absent from the snapshot is skipped and keeps
    /// its previous value. Returns how many consumers received a value.
    pub fn notify_all(&self, snapshot: &Snapshot) -> usize {
        let mut delivered = 0;
        for consumer in &self.consumers {
            match snapshot.get(consumer.key()) {
                Some(value) => {
                    consumer.on_snapshot_updated(value);
                    delivered += 1;
                }
                None => debug!("No value for `{}` this cycle", consumer.key()),
            }
        }
        delivered
    }
}
