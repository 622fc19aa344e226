//! Live mirror of ZooKeeper-stored consumer group offsets.
//!
//! Consumer groups that commit offsets to ZooKeeper keep them under
//! `<zookeeper_path>/consumers/<group>/<partition>`. [`ModuleController`]
//! connects to the ensemble, discovers every group, topic and partition
//! through one-shot watches and forwards each committed offset to a storage
//! channel as a [`StorageRequest`]. Session expiry is detected by
//! [`SessionMonitor`], which rebuilds the tree from scratch.
//!
//! ```text
//! Connector ──► Coordinator ◄── HierarchicalWatcher ──► OffsetForwarder ──► storage
//!                   │                   ▲
//!                   └─ session events ─► SessionMonitor
//! ```

mod config;
mod coordination;
mod errors;
mod filter;
mod module;
mod payload;
mod session;
mod storage;
mod watcher;

pub mod metrics;
pub mod utils;

pub use config::*;
pub use coordination::*;
pub use errors::*;
pub use filter::*;
pub use module::*;
pub use payload::*;
pub use session::*;
pub use storage::*;
pub use utils::*;
pub use watcher::*;

#[cfg(test)]
mod payload_test;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
