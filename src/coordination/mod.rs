//! Coordination-service contract.
//!
//! The watch tree talks to the ensemble only through [`Coordinator`] and
//! [`Connector`]. A watch is a one-shot channel: it yields exactly one
//! [`CoordinationEvent`] and is then spent. A dropped sender means the
//! connection was closed and the watch will never fire.
//!
//! Implementations:
//! - [`MemCoordinator`]: in-process tree with one-shot watches and session
//!   control, used by tests and embeddings
//! - `ZookeeperConnector` (feature `zookeeper`): a real ZooKeeper ensemble

mod memory;
pub use memory::*;

#[cfg(feature = "zookeeper")]
mod zookeeper;
#[cfg(feature = "zookeeper")]
pub use zookeeper::*;


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Session,
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
    NodeChildrenChanged,
    /// The watch was removed by the service (session loss); it will not fire again
    NotWatching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unknown,
    Disconnected,
    Connecting,
    Connected,
    Expired,
    AuthFailed,
    Closed,
}

/// A watch fire or a session state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinationEvent {
    pub event_type: EventType,
    pub state: SessionState,
    pub path: String,
}

impl CoordinationEvent {
    pub fn node(
        event_type: EventType,
        path: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            state: SessionState::Connected,
            path: path.into(),
        }
    }

    pub fn session(state: SessionState) -> Self {
        Self {
            event_type: EventType::Session,
            state,
            path: String::new(),
        }
    }
}

/// Node metadata returned with a data read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeStat {
    /// Last-modified time, milliseconds since epoch
    pub mtime: i64,
}

/// One-shot watch registration.
pub type WatchReceiver = oneshot::Receiver<CoordinationEvent>;

/// Stream of session state transitions; ends when the connection is closed.
pub type SessionEvents = mpsc::UnboundedReceiver<CoordinationEvent>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Coordinator: Send + Sync + 'static {
    /// Lists the children of `path` and leaves a watch for the next change
    /// to that child list.
    ///
    /// # Errors
    /// - `CoordinationError::NoNode` if `path` does not exist
    /// - `CoordinationError::SessionExpired` / `ConnectionClosed` when the
    ///   session cannot serve requests
    async fn children_w(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, WatchReceiver)>;

    /// Reads the payload of `path` and leaves a watch for the next change to
    /// that node.
    async fn get_w(
        &self,
        path: &str,
    ) -> Result<(Vec<u8>, NodeStat, WatchReceiver)>;

    /// Closes the connection. Every outstanding watch resolves as closed and
    /// the session stream ends.
    fn close(&self);
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a session with `session_timeout`. Background work the
    /// connection needs is spawned on `tasks`, so joining `tasks` after
    /// [`Coordinator::close`] also joins the connection.
    async fn connect(
        &self,
        servers: &[String],
        session_timeout: Duration,
        tasks: &TaskTracker,
    ) -> Result<(Arc<dyn Coordinator>, SessionEvents)>;
}
