//! The four watched levels of the consumer tree:
//!
//! ```text
//! <root>                      children: groups          GroupListLevel
//! <root>/<group>/0            payload: topic record     TopicLevel
//! <root>/<group>              children: partitions      PartitionListLevel
//! <root>/<group>/<partition>  payload: offset record    OffsetLevel
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::error;

use super::tree::GroupEntry;
use super::tree::TopicEntry;
use super::watch_loop::WatchLevel;
use super::HierarchicalWatcher;
use crate::metrics::PAYLOAD_DECODE_FAILURES;
use crate::EventType;
use crate::NodeStat;
use crate::OffsetFact;
use crate::OffsetRecord;
use crate::Result;
use crate::WatchReceiver;

/// Child of every group node whose payload names the group's topic.
pub(crate) const TOPIC_RECORD_NODE: &str = "0";

pub(crate) struct GroupListLevel {
    pub(crate) watcher: Arc<HierarchicalWatcher>,
    pub(crate) path: String,
}

pub(crate) struct TopicLevel {
    pub(crate) watcher: Arc<HierarchicalWatcher>,
    pub(crate) group: Arc<GroupEntry>,
    pub(crate) path: String,
}

pub(crate) struct PartitionListLevel {
    pub(crate) watcher: Arc<HierarchicalWatcher>,
    pub(crate) group: Arc<GroupEntry>,
    pub(crate) topic: Arc<TopicEntry>,
    pub(crate) path: String,
}

pub(crate) struct OffsetLevel {
    pub(crate) watcher: Arc<HierarchicalWatcher>,
    pub(crate) group: String,
    pub(crate) topic: String,
    pub(crate) partition: i32,
    pub(crate) path: String,
}

#[async_trait]
impl WatchLevel for GroupListLevel {
    type Snapshot = Vec<String>;
    const NAME: &'static str = "group_list";

    fn path(&self) -> &str {
        &self.path
    }

    fn rescan_on(&self) -> EventType {
        EventType::NodeChildrenChanged
    }

    async fn arm(&self) -> Result<(Vec<String>, WatchReceiver)> {
        self.watcher.coordinator.children_w(&self.path).await
    }

    async fn scan(
        &self,
        groups: Vec<String>,
        reset_only: bool,
    ) {
        if reset_only {
            return;
        }

        let tree = self.watcher.tree();
        for group in groups {
            if !self.watcher.filter.accept(&group) {
                debug!(group = %group, reason = "filter", "skip group");
                continue;
            }
            if let Some(entry) = tree.insert_group(&group) {
                debug!(group = %group, "add group");
                self.watcher.spawn_level(TopicLevel {
                    watcher: self.watcher.clone(),
                    path: format!("{}/{}/{}", self.path, group, TOPIC_RECORD_NODE),
                    group: entry,
                });
            }
        }
    }
}

#[async_trait]
impl WatchLevel for TopicLevel {
    type Snapshot = Vec<u8>;
    const NAME: &'static str = "topic";

    fn path(&self) -> &str {
        &self.path
    }

    /// The topic is fixed once discovered; a rewrite of the record only re-arms.
    fn rescan_on(&self) -> EventType {
        EventType::NodeChildrenChanged
    }

    async fn arm(&self) -> Result<(Vec<u8>, WatchReceiver)> {
        let (payload, _stat, watch) = self.watcher.coordinator.get_w(&self.path).await?;
        Ok((payload, watch))
    }

    async fn scan(
        &self,
        payload: Vec<u8>,
        reset_only: bool,
    ) {
        if reset_only {
            return;
        }

        let topic = match OffsetRecord::decode_topic(&payload) {
            Ok(topic) => topic,
            Err(e) => {
                PAYLOAD_DECODE_FAILURES.with_label_values(&[Self::NAME]).inc();
                debug!(group = self.group.name(), error = %e, "failed to decode topic record");
                return;
            }
        };

        if let Some(entry) = self.group.insert_topic(&topic) {
            debug!(group = self.group.name(), topic = %topic, "add topic");
            self.watcher.spawn_level(PartitionListLevel {
                watcher: self.watcher.clone(),
                path: self.watcher.group_path(self.group.name()),
                group: self.group.clone(),
                topic: entry,
            });
        }
    }
}

#[async_trait]
impl WatchLevel for PartitionListLevel {
    type Snapshot = Vec<String>;
    const NAME: &'static str = "partition_list";

    fn path(&self) -> &str {
        &self.path
    }

    fn rescan_on(&self) -> EventType {
        EventType::NodeChildrenChanged
    }

    async fn arm(&self) -> Result<(Vec<String>, WatchReceiver)> {
        self.watcher.coordinator.children_w(&self.path).await
    }

    async fn scan(
        &self,
        partitions: Vec<String>,
        reset_only: bool,
    ) {
        if reset_only {
            return;
        }

        let live = i32::try_from(partitions.len()).unwrap_or(i32::MAX);
        for partition in self.topic.grow_to(live) {
            debug!(
                group = self.group.name(),
                topic = self.topic.name(),
                partition,
                "add partition"
            );
            self.watcher.spawn_level(OffsetLevel {
                watcher: self.watcher.clone(),
                path: format!("{}/{}", self.path, partition),
                group: self.group.name().to_string(),
                topic: self.topic.name().to_string(),
                partition,
            });
        }
    }
}

#[async_trait]
impl WatchLevel for OffsetLevel {
    type Snapshot = (Vec<u8>, NodeStat);
    const NAME: &'static str = "offset";

    fn path(&self) -> &str {
        &self.path
    }

    fn rescan_on(&self) -> EventType {
        EventType::NodeDataChanged
    }

    async fn arm(&self) -> Result<((Vec<u8>, NodeStat), WatchReceiver)> {
        let (payload, stat, watch) = self.watcher.coordinator.get_w(&self.path).await?;
        Ok(((payload, stat), watch))
    }

    async fn scan(
        &self,
        snapshot: (Vec<u8>, NodeStat),
        reset_only: bool,
    ) {
        if reset_only {
            return;
        }

        let (payload, stat) = snapshot;

        let offset = match OffsetRecord::decode_offset(&payload) {
            Ok(offset) => offset,
            Err(e) => {
                PAYLOAD_DECODE_FAILURES.with_label_values(&[Self::NAME]).inc();
                error!(
                    group = %self.group,
                    topic = %self.topic,
                    partition = self.partition,
                    offset_string = %String::from_utf8_lossy(&payload),
                    error = %e,
                    "badly formatted offset"
                );
                return;
            }
        };

        debug!(
            group = %self.group,
            topic = %self.topic,
            partition = self.partition,
            offset,
            timestamp = stat.mtime,
            "consumer offset"
        );
        self.watcher
            .forwarder
            .forward(OffsetFact {
                cluster: self.watcher.cluster.clone(),
                topic: self.topic.clone(),
                partition: self.partition,
                group: self.group.clone(),
                offset,
                timestamp: stat.mtime,
            })
            .await;
    }
}
