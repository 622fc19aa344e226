use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;
use tracing::debug;

use super::CoordinationEvent;
use super::Connector;
use super::Coordinator;
use super::EventType;
use super::NodeStat;
use super::SessionEvents;
use super::SessionState;
use super::WatchReceiver;
use crate::time::timestamp_millis;
use crate::CoordinationError;
use crate::Result;

type WatchSender = oneshot::Sender<CoordinationEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Connected,
    Expired,
    Closed,
}

#[derive(Debug, Default)]
struct MemNode {
    data: Vec<u8>,
    mtime: i64,
    children: BTreeSet<String>,
}

struct MemState {
    nodes: BTreeMap<String, MemNode>,
    data_watches: HashMap<String, Vec<WatchSender>>,
    child_watches: HashMap<String, Vec<WatchSender>>,
    session_tx: Option<mpsc::UnboundedSender<CoordinationEvent>>,
    session_rx: Option<SessionEvents>,
    status: Status,
    refuse_connections: bool,
}

/// In-process coordination tree with ZooKeeper watch semantics.
///
/// Watches are one-shot and fire on the first matching change after
/// registration. [`MemCoordinator::expire_session`] invalidates every watch
/// the way an ensemble does on session loss, and [`MemCoordinator::close`]
/// drops them all. Clones share the same tree.
#[derive(Clone)]
pub struct MemCoordinator {
    state: Arc<Mutex<MemState>>,
}

impl Default for MemCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemCoordinator {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemCoordinator")
            .field("nodes", &state.nodes.len())
            .field("status", &state.status)
            .finish()
    }
}

impl MemCoordinator {
    pub fn new() -> Self {
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), MemNode::default());

        Self {
            state: Arc::new(Mutex::new(MemState {
                nodes,
                data_watches: HashMap::new(),
                child_watches: HashMap::new(),
                session_tx: Some(session_tx),
                session_rx: Some(session_rx),
                status: Status::Connected,
                refuse_connections: false,
            })),
        }
    }

    /// Creates `path` with `data`, creating missing ancestors with empty payloads.
    ///
    /// # Errors
    /// `CoordinationError::Backend` if `path` already exists or is not absolute.
    pub fn create(
        &self,
        path: &str,
        data: impl Into<Vec<u8>>,
    ) -> Result<()> {
        if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') {
            return Err(CoordinationError::Backend(format!("bad path: {path}")).into());
        }

        let mut state = self.state.lock();
        if state.nodes.contains_key(path) {
            return Err(CoordinationError::Backend(format!("node exists: {path}")).into());
        }

        let mut missing = vec![path.to_string()];
        let mut current = parent_of(path);
        while !state.nodes.contains_key(&current) {
            missing.push(current.clone());
            current = parent_of(&current);
        }

        let data = data.into();
        for node_path in missing.into_iter().rev() {
            let parent = parent_of(&node_path);
            let name = node_path.rsplit('/').next().unwrap_or_default().to_string();
            let payload = if node_path == path { data.clone() } else { Vec::new() };
            state.nodes.insert(
                node_path.clone(),
                MemNode {
                    data: payload,
                    mtime: timestamp_millis(),
                    children: BTreeSet::new(),
                },
            );
            if let Some(parent_node) = state.nodes.get_mut(&parent) {
                parent_node.children.insert(name);
            }
            state.fire_child_watches(&parent, EventType::NodeChildrenChanged);
        }
        Ok(())
    }

    /// Replaces the payload of `path` and fires its data watches.
    pub fn set_data(
        &self,
        path: &str,
        data: impl Into<Vec<u8>>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let node = state.nodes.get_mut(path).ok_or_else(|| CoordinationError::NoNode {
            path: path.to_string(),
        })?;
        node.data = data.into();
        node.mtime = timestamp_millis().max(node.mtime + 1);
        state.fire_data_watches(path, EventType::NodeDataChanged);
        Ok(())
    }

    /// Deletes a leaf node.
    ///
    /// # Errors
    /// `NoNode` if missing, `Backend` if the node still has children.
    pub fn delete(
        &self,
        path: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let node = state.nodes.get(path).ok_or_else(|| CoordinationError::NoNode {
            path: path.to_string(),
        })?;
        if !node.children.is_empty() || path == "/" {
            return Err(CoordinationError::Backend(format!("node not empty: {path}")).into());
        }

        state.nodes.remove(path);
        let parent = parent_of(path);
        if let Some(parent_node) = state.nodes.get_mut(&parent) {
            if let Some(name) = path.rsplit('/').next() {
                parent_node.children.remove(name);
            }
        }
        state.fire_data_watches(path, EventType::NodeDeleted);
        state.fire_child_watches(path, EventType::NodeDeleted);
        state.fire_child_watches(&parent, EventType::NodeChildrenChanged);
        Ok(())
    }

    /// Simulates the ensemble expiring the session: every outstanding watch
    /// receives `NotWatching`, requests fail until [`Self::reconnect`], and a
    /// session `Expired` event is emitted.
    pub fn expire_session(&self) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.status != Status::Connected {
            return;
        }
        state.status = Status::Expired;

        let watches: Vec<(String, WatchSender)> = state
            .data_watches
            .drain()
            .chain(state.child_watches.drain())
            .flat_map(|(path, senders)| senders.into_iter().map(move |tx| (path.clone(), tx)))
            .collect();
        for (path, tx) in watches {
            let _ = tx.send(CoordinationEvent {
                event_type: EventType::NotWatching,
                state: SessionState::Expired,
                path,
            });
        }

        state.emit_session(SessionState::Expired);
        debug!("in-memory session expired");
    }

    /// Establishes a new session after an expiry and emits `Connected`.
    pub fn reconnect(&self) {
        let mut state = self.state.lock();
        if state.status != Status::Expired {
            return;
        }
        state.status = Status::Connected;
        state.emit_session(SessionState::Connected);
    }

    /// Emits an arbitrary session transition without changing the tree.
    pub fn emit_session_event(
        &self,
        session_state: SessionState,
    ) {
        self.state.lock().emit_session(session_state);
    }

    /// Makes subsequent [`Connector::connect`] calls fail.
    pub fn refuse_connections(
        &self,
        refuse: bool,
    ) {
        self.state.lock().refuse_connections = refuse;
    }

    /// Number of live watches (data and child) registered on `path`.
    pub fn watch_count(
        &self,
        path: &str,
    ) -> usize {
        let state = self.state.lock();
        let live = |map: &HashMap<String, Vec<WatchSender>>| {
            map.get(path)
                .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
                .unwrap_or(0)
        };
        live(&state.data_watches) + live(&state.child_watches)
    }

    /// Number of live watches across the whole tree.
    pub fn outstanding_watches(&self) -> usize {
        let state = self.state.lock();
        state
            .data_watches
            .values()
            .chain(state.child_watches.values())
            .flatten()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().status == Status::Closed
    }

    fn check_session(state: &MemState) -> Result<()> {
        match state.status {
            Status::Connected => Ok(()),
            Status::Expired => Err(CoordinationError::SessionExpired.into()),
            Status::Closed => Err(CoordinationError::ConnectionClosed.into()),
        }
    }
}

impl MemState {
    fn fire_data_watches(
        &mut self,
        path: &str,
        event_type: EventType,
    ) {
        if let Some(senders) = self.data_watches.remove(path) {
            fire(senders, event_type, path);
        }
    }

    fn fire_child_watches(
        &mut self,
        path: &str,
        event_type: EventType,
    ) {
        if let Some(senders) = self.child_watches.remove(path) {
            fire(senders, event_type, path);
        }
    }

    fn emit_session(
        &self,
        session_state: SessionState,
    ) {
        if let Some(tx) = &self.session_tx {
            let _ = tx.send(CoordinationEvent::session(session_state));
        }
    }
}

fn fire(
    senders: Vec<WatchSender>,
    event_type: EventType,
    path: &str,
) {
    for tx in senders {
        let _ = tx.send(CoordinationEvent::node(event_type, path));
    }
}

fn register(
    map: &mut HashMap<String, Vec<WatchSender>>,
    path: &str,
) -> WatchReceiver {
    let (tx, rx) = oneshot::channel();
    let senders = map.entry(path.to_string()).or_default();
    senders.retain(|s| !s.is_closed());
    senders.push(tx);
    rx
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

#[async_trait]
impl Coordinator for MemCoordinator {
    async fn children_w(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, WatchReceiver)> {
        let mut state = self.state.lock();
        Self::check_session(&state)?;
        let children: Vec<String> = state
            .nodes
            .get(path)
            .ok_or_else(|| CoordinationError::NoNode {
                path: path.to_string(),
            })?
            .children
            .iter()
            .cloned()
            .collect();
        let rx = register(&mut state.child_watches, path);
        Ok((children, rx))
    }

    async fn get_w(
        &self,
        path: &str,
    ) -> Result<(Vec<u8>, NodeStat, WatchReceiver)> {
        let mut state = self.state.lock();
        Self::check_session(&state)?;
        let node = state.nodes.get(path).ok_or_else(|| CoordinationError::NoNode {
            path: path.to_string(),
        })?;
        let data = node.data.clone();
        let stat = NodeStat { mtime: node.mtime };
        let rx = register(&mut state.data_watches, path);
        Ok((data, stat, rx))
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.status = Status::Closed;
        state.data_watches.clear();
        state.child_watches.clear();
        state.session_tx = None;
        debug!("in-memory coordinator closed");
    }
}

#[async_trait]
impl Connector for MemCoordinator {
    async fn connect(
        &self,
        _servers: &[String],
        _session_timeout: Duration,
        _tasks: &TaskTracker,
    ) -> Result<(Arc<dyn Coordinator>, SessionEvents)> {
        let mut state = self.state.lock();
        if state.refuse_connections {
            return Err(CoordinationError::ConnectFailed("connection refused".to_string()).into());
        }
        let session_events = state.session_rx.take().ok_or_else(|| {
            CoordinationError::ConnectFailed("session already handed out".to_string())
        })?;
        Ok((Arc::new(self.clone()) as Arc<dyn Coordinator>, session_events))
    }
}
