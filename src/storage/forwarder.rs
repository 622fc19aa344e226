use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::debug;
use tracing::warn;

use super::OffsetFact;
use super::StorageRequest;
use crate::metrics::DROPPED_OFFSETS;
use crate::metrics::FORWARDED_OFFSETS;

/// Hands offset facts to the storage channel without ever blocking the
/// watch tree for longer than `send_timeout`.
#[derive(Debug, Clone)]
pub struct OffsetForwarder {
    storage_tx: mpsc::Sender<StorageRequest>,
    send_timeout: Duration,
}

impl OffsetForwarder {
    pub fn new(
        storage_tx: mpsc::Sender<StorageRequest>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            storage_tx,
            send_timeout,
        }
    }

    /// Best-effort delivery. Returns `false` when the fact was dropped because
    /// the channel stayed full for the whole timeout or the receiver is gone.
    pub async fn forward(
        &self,
        fact: OffsetFact,
    ) -> bool {
        let cluster = fact.cluster.clone();
        let request = StorageRequest::from(fact);

        match self.storage_tx.send_timeout(request, self.send_timeout).await {
            Ok(()) => {
                FORWARDED_OFFSETS.with_label_values(&[&cluster]).inc();
                true
            }
            Err(SendTimeoutError::Timeout(request)) => {
                warn!(
                    group = %request.group,
                    topic = %request.topic,
                    partition = request.partition,
                    offset = request.offset,
                    timeout = ?self.send_timeout,
                    "storage channel full, dropping offset"
                );
                DROPPED_OFFSETS.with_label_values(&[&cluster]).inc();
                false
            }
            Err(SendTimeoutError::Closed(request)) => {
                debug!(
                    group = %request.group,
                    topic = %request.topic,
                    partition = request.partition,
                    "storage channel closed, dropping offset"
                );
                DROPPED_OFFSETS.with_label_values(&[&cluster]).inc();
                false
            }
        }
    }
}
