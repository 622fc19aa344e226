//! Lifecycle of one consumer-offset module: configure, start, stop.


use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::ConsumerConfig;
use crate::Connector;
use crate::Coordinator;
use crate::Error;
use crate::ForwarderConfig;
use crate::GroupFilter;
use crate::HierarchicalWatcher;
use crate::OffsetForwarder;
use crate::Result;
use crate::SessionMonitor;
use crate::StorageRequest;

struct Running {
    coordinator: Arc<dyn Coordinator>,
    watcher: Arc<HierarchicalWatcher>,
}

/// Owns the connection, the watch tree and every task spawned for it.
///
/// All watch tasks and the session monitor run on a single [`TaskTracker`];
/// [`ModuleController::stop`] closes the connection and joins the tracker,
/// so nothing spawned by the module outlives `stop()`.
pub struct ModuleController {
    name: String,
    consumer: ConsumerConfig,
    filter: GroupFilter,
    forwarder: OffsetForwarder,
    connector: Arc<dyn Connector>,
    tracker: TaskTracker,
    running: Option<Running>,
}

impl std::fmt::Debug for ModuleController {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ModuleController")
            .field("name", &self.name)
            .field("cluster", &self.consumer.cluster)
            .field("running", &self.running.is_some())
            .field("outstanding_tasks", &self.tracker.len())
            .finish()
    }
}

impl ModuleController {
    /// Validates both config sections and compiles the group filter.
    ///
    /// # Errors
    /// `Error::InvalidConfig` naming the offending field. Nothing is connected
    /// yet, so every error here is a startup failure.
    pub fn configure(
        name: impl Into<String>,
        consumer: ConsumerConfig,
        forwarder: ForwarderConfig,
        storage_tx: mpsc::Sender<StorageRequest>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        consumer.validate()?;
        forwarder.validate()?;
        let filter = GroupFilter::from_config(&consumer)?;

        Ok(Self {
            name: name.into(),
            filter,
            forwarder: OffsetForwarder::new(storage_tx, forwarder.send_timeout()),
            consumer,
            connector,
            tracker: TaskTracker::new(),
            running: None,
        })
    }

    /// Connects, starts the initial scan and launches the session monitor.
    ///
    /// # Errors
    /// - `Error::AlreadyStarted` if the module is running
    /// - `Error::Coordination` if the initial connection fails
    pub async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(Error::AlreadyStarted);
        }
        info!(module = %self.name, cluster = %self.consumer.cluster, "starting");

        let (coordinator, session_events) = self
            .connector
            .connect(
                &self.consumer.servers,
                self.consumer.session_timeout(),
                &self.tracker,
            )
            .await?;

        let watcher = HierarchicalWatcher::new(
            coordinator.clone(),
            self.consumer.cluster.clone(),
            self.consumer.offsets_path(),
            self.filter.clone(),
            self.forwarder.clone(),
            self.tracker.clone(),
        );
        // The first Connected event may already be gone; scan unconditionally.
        watcher.watch_groups();
        self.tracker
            .spawn(SessionMonitor::new(watcher.clone()).run(session_events));

        self.running = Some(Running {
            coordinator,
            watcher,
        });
        Ok(())
    }

    /// Closes the connection and waits until every spawned task has exited.
    ///
    /// # Errors
    /// `Error::NotStarted` if the module is not running.
    pub async fn stop(&mut self) -> Result<()> {
        let running = self.running.take().ok_or(Error::NotStarted)?;
        info!(module = %self.name, cluster = %self.consumer.cluster, "stopping");

        running.coordinator.close();
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();

        info!(
            module = %self.name,
            finished_watches = running.watcher.finished_watches(),
            "stopped"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Watch tasks plus the session monitor that have not exited yet.
    pub fn outstanding_tasks(&self) -> usize {
        self.tracker.len()
    }

    pub fn watcher(&self) -> Option<Arc<HierarchicalWatcher>> {
        self.running.as_ref().map(|running| running.watcher.clone())
    }
}
