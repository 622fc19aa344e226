//! ZooKeeper ensemble adapter built on `zookeeper-client`.

#[cfg(test)]
#[path = "zookeeper_test.rs"]
mod zookeeper_test;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::error;
use tracing::info;
use zookeeper_client as zk;

use super::CoordinationEvent;
use super::Connector;
use super::Coordinator;
use super::EventType;
use super::NodeStat;
use super::SessionEvents;
use super::SessionState;
use super::WatchReceiver;
use crate::async_task::task_with_timeout_and_exponential_backoff;
use crate::BackoffPolicy;
use crate::CoordinationError;
use crate::Result;

/// Connects to a ZooKeeper ensemble and re-establishes the session, with
/// `reconnect` backoff, whenever the ensemble expires it.
#[derive(Debug, Clone)]
pub struct ZookeeperConnector {
    reconnect: BackoffPolicy,
}

impl ZookeeperConnector {
    pub fn new(reconnect: BackoffPolicy) -> Self {
        Self { reconnect }
    }
}

/// Every task it spawns runs on `tasks` and ends once `cancel` fires.
struct ZookeeperCoordinator {
    client: RwLock<Option<zk::Client>>,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

#[async_trait]
impl Connector for ZookeeperConnector {
    async fn connect(
        &self,
        servers: &[String],
        session_timeout: Duration,
        tasks: &TaskTracker,
    ) -> Result<(Arc<dyn Coordinator>, SessionEvents)> {
        let cluster = servers.join(",");
        let client = connect_client(&cluster, session_timeout).await?;
        info!(cluster = %cluster, "connected to zookeeper");

        let coordinator = Arc::new(ZookeeperCoordinator {
            client: RwLock::new(Some(client)),
            cancel: CancellationToken::new(),
            tasks: tasks.clone(),
        });

        let (session_tx, session_rx) = mpsc::unbounded_channel();
        tasks.spawn(pump_session_states(
            coordinator.clone(),
            cluster,
            session_timeout,
            self.reconnect,
            session_tx,
        ));

        Ok((coordinator as Arc<dyn Coordinator>, session_rx))
    }
}

/// Opens a session whose timeout is `session_timeout`. Establishing it is
/// bounded by the same duration.
async fn connect_client(
    cluster: &str,
    session_timeout: Duration,
) -> Result<zk::Client> {
    let mut connector = zk::Client::connector();
    connector.session_timeout(session_timeout);
    match tokio::time::timeout(session_timeout, connector.connect(cluster)).await {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(e)) => Err(CoordinationError::ConnectFailed(e.to_string()).into()),
        Err(_) => Err(CoordinationError::ConnectTimeout(session_timeout).into()),
    }
}

/// Relays session transitions. An expired session is replaced by a fresh one
/// before `Connected` is emitted, so watchers rebuild against a live client.
async fn pump_session_states(
    coordinator: Arc<ZookeeperCoordinator>,
    cluster: String,
    session_timeout: Duration,
    reconnect: BackoffPolicy,
    session_tx: mpsc::UnboundedSender<CoordinationEvent>,
) {
    let Ok(client) = coordinator.client() else {
        return;
    };
    let mut state_watcher = client.state_watcher();
    drop(client);

    loop {
        let state = tokio::select! {
            _ = coordinator.cancel.cancelled() => break,
            state = state_watcher.changed() => map_session_state(state),
        };

        match state {
            SessionState::Expired => {
                error!("zookeeper session expired, reconnecting");
                let _ = session_tx.send(CoordinationEvent::session(SessionState::Expired));

                let attempt = || connect_client(&cluster, session_timeout);
                let client = tokio::select! {
                    _ = coordinator.cancel.cancelled() => break,
                    result = task_with_timeout_and_exponential_backoff(attempt, reconnect) => match result {
                        Ok(client) => client,
                        Err(e) => {
                            error!(error = %e, "giving up reconnecting to zookeeper");
                            break;
                        }
                    },
                };

                state_watcher = client.state_watcher();
                *coordinator.client.write() = Some(client);
                let _ = session_tx.send(CoordinationEvent::session(SessionState::Connected));
            }
            SessionState::Closed => break,
            SessionState::AuthFailed => {
                error!("zookeeper authentication failed");
                let _ = session_tx.send(CoordinationEvent::session(SessionState::AuthFailed));
                break;
            }
            other => {
                let _ = session_tx.send(CoordinationEvent::session(other));
            }
        }
    }
}

impl ZookeeperCoordinator {
    fn client(&self) -> Result<zk::Client> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| CoordinationError::ConnectionClosed.into())
    }

    /// Bridges a zookeeper one-shot watcher onto our watch channel. Closing the
    /// coordinator drops the sender so the waiting side sees a closed watch.
    fn forward_watch(
        &self,
        watcher: zk::OneshotWatcher,
    ) -> WatchReceiver {
        let (tx, rx) = oneshot::channel();
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                event = watcher.changed() => {
                    let _ = tx.send(map_watched_event(event));
                }
            }
        });
        rx
    }
}

#[async_trait]
impl Coordinator for ZookeeperCoordinator {
    async fn children_w(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, WatchReceiver)> {
        let client = self.client()?;
        let (children, _stat, watcher) = client
            .get_and_watch_children(path)
            .await
            .map_err(|e| map_error(e, path))?;
        Ok((children, self.forward_watch(watcher)))
    }

    async fn get_w(
        &self,
        path: &str,
    ) -> Result<(Vec<u8>, NodeStat, WatchReceiver)> {
        let client = self.client()?;
        let (data, stat, watcher) = client
            .get_and_watch_data(path)
            .await
            .map_err(|e| map_error(e, path))?;
        Ok((
            data,
            NodeStat { mtime: stat.mtime },
            self.forward_watch(watcher),
        ))
    }

    fn close(&self) {
        self.cancel.cancel();
        self.client.write().take();
        info!("zookeeper connection closed");
    }
}

fn map_error(
    error: zk::Error,
    path: &str,
) -> crate::Error {
    match error {
        zk::Error::NoNode => CoordinationError::NoNode {
            path: path.to_string(),
        }
        .into(),
        zk::Error::SessionExpired => CoordinationError::SessionExpired.into(),
        other => CoordinationError::Backend(other.to_string()).into(),
    }
}

fn map_session_state(state: zk::SessionState) -> SessionState {
    match state {
        zk::SessionState::SyncConnected | zk::SessionState::ConnectedReadOnly => {
            SessionState::Connected
        }
        zk::SessionState::Disconnected => SessionState::Disconnected,
        zk::SessionState::Expired => SessionState::Expired,
        zk::SessionState::AuthFailed => SessionState::AuthFailed,
        zk::SessionState::Closed => SessionState::Closed,
        #[allow(unreachable_patterns)]
        _ => SessionState::Unknown,
    }
}

fn map_watched_event(event: zk::WatchedEvent) -> CoordinationEvent {
    let state = map_session_state(event.session_state);
    let event_type = match event.event_type {
        zk::EventType::NodeCreated => EventType::NodeCreated,
        zk::EventType::NodeDeleted => EventType::NodeDeleted,
        zk::EventType::NodeDataChanged => EventType::NodeDataChanged,
        zk::EventType::NodeChildrenChanged => EventType::NodeChildrenChanged,
        // A session event on a one-shot watcher means the ensemble dropped it
        _ if matches!(
            state,
            SessionState::Expired | SessionState::Closed | SessionState::AuthFailed
        ) =>
        {
            EventType::NotWatching
        }
        _ => EventType::Session,
    };
    CoordinationEvent {
        event_type,
        state,
        path: event.path,
    }
}
