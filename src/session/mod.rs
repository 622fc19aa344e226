//! Session lifecycle handling.
//!
//! Session expiry silently drops every watch on the ensemble side. Once the
//! client is connected again the whole tree is rediscovered from scratch.


use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::info;

use crate::metrics::TREE_REBUILDS;
use crate::CoordinationEvent;
use crate::EventType;
use crate::HierarchicalWatcher;
use crate::SessionEvents;
use crate::SessionState;

/// What [`SessionMonitor::handle_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Ignored,
    /// Watches were marked lost; the next `Connected` rebuilds.
    Invalidated,
    /// Tree cleared and group-list watch re-established.
    Rebuilt,
}

pub struct SessionMonitor {
    watcher: Arc<HierarchicalWatcher>,
    /// False between an expiry and the rebuild that follows it
    watches_set: AtomicBool,
}

impl std::fmt::Debug for SessionMonitor {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("cluster", &self.watcher.cluster())
            .field("watches_set", &self.watches_set.load(Ordering::Acquire))
            .finish()
    }
}

impl SessionMonitor {
    /// Expects the initial group-list watch to be in place already.
    pub fn new(watcher: Arc<HierarchicalWatcher>) -> Self {
        Self {
            watcher,
            watches_set: AtomicBool::new(true),
        }
    }

    pub fn handle_event(
        &self,
        event: &CoordinationEvent,
    ) -> SessionAction {
        if event.event_type != EventType::Session {
            return SessionAction::Ignored;
        }

        match event.state {
            SessionState::Expired => {
                error!(cluster = self.watcher.cluster(), "session expired");
                self.watches_set.store(false, Ordering::Release);
                SessionAction::Invalidated
            }
            SessionState::Connected => {
                if self
                    .watches_set
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    return SessionAction::Ignored;
                }
                info!(cluster = self.watcher.cluster(), "reinitializing watches");
                self.watcher.reset_tree();
                TREE_REBUILDS.with_label_values(&[self.watcher.cluster()]).inc();
                self.watcher.watch_groups();
                SessionAction::Rebuilt
            }
            state => {
                debug!(cluster = self.watcher.cluster(), ?state, "session state change");
                SessionAction::Ignored
            }
        }
    }

    /// Consumes session transitions until the stream ends, which happens when
    /// the connection is closed.
    pub async fn run(
        self,
        mut events: SessionEvents,
    ) {
        while let Some(event) = events.recv().await {
            self.handle_event(&event);
        }
        debug!(cluster = self.watcher.cluster(), "session event stream ended");
    }
}
