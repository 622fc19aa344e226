use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

/// In-memory mirror of the tracked groups. Entries are only ever added; the
/// whole tree is replaced after a session expiry.
#[derive(Debug, Default)]
pub struct OffsetTree {
    groups: DashMap<String, Arc<GroupEntry>>,
}

#[derive(Debug)]
pub struct GroupEntry {
    name: String,
    topics: DashMap<String, Arc<TopicEntry>>,
}

#[derive(Debug)]
pub struct TopicEntry {
    name: String,
    /// Highest live partition count seen so far
    partition_count: Mutex<i32>,
}

impl OffsetTree {
    /// Inserts `group` unless present. Returns the new entry only when it was
    /// created by this call.
    pub(crate) fn insert_group(
        &self,
        group: &str,
    ) -> Option<Arc<GroupEntry>> {
        match self.groups.entry(group.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let entry = Arc::new(GroupEntry::new(group));
                slot.insert(entry.clone());
                Some(entry)
            }
        }
    }

    pub fn group(
        &self,
        group: &str,
    ) -> Option<Arc<GroupEntry>> {
        self.groups.get(group).map(|entry| entry.value().clone())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Sorted names of the tracked groups.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}

impl GroupEntry {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            topics: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn insert_topic(
        &self,
        topic: &str,
    ) -> Option<Arc<TopicEntry>> {
        match self.topics.entry(topic.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let entry = Arc::new(TopicEntry::new(topic));
                slot.insert(entry.clone());
                Some(entry)
            }
        }
    }

    pub fn topic(
        &self,
        topic: &str,
    ) -> Option<Arc<TopicEntry>> {
        self.topics.get(topic).map(|entry| entry.value().clone())
    }

    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}

impl TopicEntry {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            partition_count: Mutex::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_count(&self) -> i32 {
        *self.partition_count.lock()
    }

    /// Raises the count to `live` and returns the partitions that became
    /// visible, `[previous, live)`. A shrinking child list changes nothing:
    /// partitions are never un-tracked.
    pub(crate) fn grow_to(
        &self,
        live: i32,
    ) -> std::ops::Range<i32> {
        let mut count = self.partition_count.lock();
        let previous = *count;
        if live < previous {
            return previous..previous;
        }
        *count = live;
        previous..live
    }
}
