//! Boundary to the downstream storage subsystem.
//!
//! The watch tree only produces [`OffsetFact`]s; [`OffsetForwarder`] turns them
//! into [`StorageRequest`]s on a bounded channel owned by the storage side.

mod forwarder;
pub use forwarder::*;

#[cfg(test)]
mod forwarder_test;

/// Kind of request delivered to the storage subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageRequestType {
    SetConsumerOffset,
}

/// A request consumed by the storage subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRequest {
    pub request_type: StorageRequestType,
    pub cluster: String,
    pub topic: String,
    pub partition: i32,
    pub group: String,
    /// Last-modified time of the offset node, milliseconds since epoch
    pub timestamp: i64,
    pub offset: i64,
}

/// A committed offset read from one offset node. Never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFact {
    pub cluster: String,
    pub topic: String,
    pub partition: i32,
    pub group: String,
    pub offset: i64,
    pub timestamp: i64,
}

impl From<OffsetFact> for StorageRequest {
    fn from(fact: OffsetFact) -> Self {
        StorageRequest {
            request_type: StorageRequestType::SetConsumerOffset,
            cluster: fact.cluster,
            topic: fact.topic,
            partition: fact.partition,
            group: fact.group,
            timestamp: fact.timestamp,
            offset: fact.offset,
        }
    }
}
