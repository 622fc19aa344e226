//! One task per watched node: arm, scan, wait, repeat.
//!
//! Every iteration re-registers the watch (reading the current children or
//! payload in the same call) before the scan runs, so a change landing while
//! the scan is in progress fires the fresh watch instead of being lost.

use async_trait::async_trait;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::metrics::ACTIVE_WATCHES;
use crate::EventType;
use crate::Result;
use crate::WatchReceiver;

#[async_trait]
pub(crate) trait WatchLevel: Send + Sync + 'static {
    /// Whatever the arming read returned (children, or payload and stat)
    type Snapshot: Send + 'static;

    /// Label used in spans and metrics
    const NAME: &'static str;

    fn path(&self) -> &str;

    /// The event that means "something under me changed". Any other event
    /// only re-arms the watch.
    fn rescan_on(&self) -> EventType;

    /// Registers a fresh one-shot watch and reads the node in the same call.
    async fn arm(&self) -> Result<(Self::Snapshot, WatchReceiver)>;

    /// Discovery and forwarding for this level. `reset_only` means the fire
    /// that led here was not a `rescan_on` event.
    async fn scan(
        &self,
        snapshot: Self::Snapshot,
        reset_only: bool,
    );
}

/// Drives `level` until its watch closes or re-arming fails.
pub(crate) async fn run_watch_loop<L: WatchLevel>(level: L) {
    let active = ACTIVE_WATCHES.with_label_values(&[L::NAME]);
    active.inc();

    let mut reset_only = false;
    loop {
        let (snapshot, watch) = match level.arm().await {
            Ok(armed) => armed,
            Err(e) => {
                warn!(path = level.path(), error = %e, "failed to read node, no longer watching it");
                break;
            }
        };

        level.scan(snapshot, reset_only).await;

        match watch.await {
            Ok(event) if event.event_type != EventType::NotWatching => {
                trace!(path = level.path(), event = ?event.event_type, "watch fired");
                reset_only = event.event_type != level.rescan_on();
            }
            _ => {
                debug!(path = level.path(), "watch closed");
                break;
            }
        }
    }

    active.dec();
}
