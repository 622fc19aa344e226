//! Self-healing mirror of the consumer offset tree.
//!
//! The coordination service only offers one-shot watches, so every watched
//! node gets its own long-lived task (see [`watch_loop`]) that re-arms its
//! watch after each fire and spawns tasks for newly discovered children.
//! Closing the connection resolves every pending watch as closed, which ends
//! every task; [`HierarchicalWatcher::live_watches`] drops back to zero.

mod levels;
mod tree;
mod watch_loop;

pub use tree::*;


use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio_util::task::TaskTracker;
use tracing::info_span;
use tracing::Instrument;

use self::levels::GroupListLevel;
use self::watch_loop::run_watch_loop;
use self::watch_loop::WatchLevel;
use crate::Coordinator;
use crate::GroupFilter;
use crate::OffsetForwarder;

pub struct HierarchicalWatcher {
    coordinator: Arc<dyn Coordinator>,
    tree: ArcSwap<OffsetTree>,
    filter: GroupFilter,
    forwarder: OffsetForwarder,
    tracker: TaskTracker,
    cluster: String,
    /// `<zookeeper_path>/consumers`
    root_path: String,
    spawned: AtomicUsize,
    finished: AtomicUsize,
}

impl std::fmt::Debug for HierarchicalWatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("HierarchicalWatcher")
            .field("cluster", &self.cluster)
            .field("root_path", &self.root_path)
            .field("live_watches", &self.live_watches())
            .finish()
    }
}

impl HierarchicalWatcher {
    /// Watch tasks are spawned on `tracker`; the owner joins them there.
    pub fn new(
        coordinator: Arc<dyn Coordinator>,
        cluster: impl Into<String>,
        root_path: impl Into<String>,
        filter: GroupFilter,
        forwarder: OffsetForwarder,
        tracker: TaskTracker,
    ) -> Arc<Self> {
        Arc::new(Self {
            coordinator,
            tree: ArcSwap::from_pointee(OffsetTree::default()),
            filter,
            forwarder,
            tracker,
            cluster: cluster.into(),
            root_path: root_path.into(),
            spawned: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        })
    }

    /// Starts the group-list watch, which cascades discovery down to every
    /// offset node.
    pub fn watch_groups(self: &Arc<Self>) {
        self.spawn_level(GroupListLevel {
            watcher: self.clone(),
            path: self.root_path.clone(),
        });
    }

    /// Swaps in an empty tree. Entries are rediscovered by the next
    /// [`Self::watch_groups`].
    pub fn reset_tree(&self) {
        self.tree.store(Arc::new(OffsetTree::default()));
    }

    /// Current tree snapshot.
    pub fn tree(&self) -> Arc<OffsetTree> {
        self.tree.load_full()
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Watch tasks spawned and not yet exited.
    pub fn live_watches(&self) -> usize {
        self.spawned
            .load(Ordering::Acquire)
            .saturating_sub(self.finished.load(Ordering::Acquire))
    }

    /// Watch tasks that have exited since creation.
    pub fn finished_watches(&self) -> usize {
        self.finished.load(Ordering::Acquire)
    }

    pub(crate) fn group_path(
        &self,
        group: &str,
    ) -> String {
        format!("{}/{}", self.root_path, group)
    }

    pub(crate) fn spawn_level<L: WatchLevel>(
        self: &Arc<Self>,
        level: L,
    ) {
        let span = info_span!("watch", level = L::NAME, path = level.path());
        let watcher = self.clone();
        self.spawned.fetch_add(1, Ordering::AcqRel);
        self.tracker.spawn(
            async move {
                run_watch_loop(level).await;
                watcher.finished.fetch_add(1, Ordering::AcqRel);
            }
            .instrument(span),
        );
    }
}
