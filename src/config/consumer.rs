use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::BackoffPolicy;
use crate::validation::is_valid_coordination_path;
use crate::validation::is_valid_host_list;
use crate::Error;
use crate::Result;

/// Sub-path under `zookeeper_path` holding the consumer group tree.
pub const CONSUMERS_SUBPATH: &str = "/consumers";

/// Coordination-service consumer settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConsumerConfig {
    /// Module name used in log spans
    #[serde(default = "default_name")]
    pub name: String,

    /// Kafka cluster these consumer groups belong to
    #[serde(default)]
    pub cluster: String,

    /// Ensemble members as `host:port`
    #[serde(default)]
    pub servers: Vec<String>,

    /// Session timeout in seconds
    #[serde(default = "default_zookeeper_timeout")]
    pub zookeeper_timeout: u64,

    /// Chroot of the Kafka metadata; offsets live under `<zookeeper_path>/consumers`
    #[serde(default)]
    pub zookeeper_path: String,

    /// Only groups matching this pattern are tracked
    #[serde(default)]
    pub group_allowlist: Option<String>,

    /// Groups matching this pattern are never tracked
    #[serde(default)]
    pub group_denylist: Option<String>,

    /// Reconnect policy after a session expiry
    #[serde(default)]
    pub reconnect: BackoffPolicy,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            cluster: String::new(),
            servers: vec![],
            zookeeper_timeout: default_zookeeper_timeout(),
            zookeeper_path: String::new(),
            group_allowlist: None,
            group_denylist: None,
            reconnect: BackoffPolicy::default(),
        }
    }
}

impl ConsumerConfig {
    /// Root of the group tree: `zookeeper_path` + `/consumers`.
    pub fn offsets_path(&self) -> String {
        format!("{}{}", self.zookeeper_path, CONSUMERS_SUBPATH)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.zookeeper_timeout)
    }

    /// Validates consumer configuration
    /// # Errors
    /// Returns `Error::InvalidConfig` naming the offending field when:
    /// - `cluster` is empty
    /// - `servers` is empty or holds an entry that is not `host:port`
    /// - `zookeeper_timeout` is 0
    /// - the resulting offsets path is not a valid coordination path
    ///
    /// Group patterns are compiled by [`crate::GroupFilter::from_config`].
    pub fn validate(&self) -> Result<()> {
        if self.cluster.trim().is_empty() {
            return Err(Error::invalid_config(
                "consumer.cluster",
                format!("no cluster name given for consumer '{}'", self.name),
            ));
        }

        if self.servers.is_empty() {
            return Err(Error::invalid_config(
                "consumer.servers",
                format!("no Zookeeper servers specified for consumer '{}'", self.name),
            ));
        }
        if !is_valid_host_list(&self.servers) {
            return Err(Error::invalid_config(
                "consumer.servers",
                format!(
                    "consumer '{}' has one or more improperly formatted servers (must be host:port)",
                    self.name
                ),
            ));
        }

        if self.zookeeper_timeout == 0 {
            return Err(Error::invalid_config(
                "consumer.zookeeper_timeout",
                "must be greater than 0",
            ));
        }

        if !is_valid_coordination_path(&self.offsets_path()) {
            return Err(Error::invalid_config(
                "consumer.zookeeper_path",
                format!(
                    "consumer '{}' has a bad zookeeper path: {}",
                    self.name,
                    self.offsets_path()
                ),
            ));
        }

        self.reconnect.validate("consumer.reconnect")
    }
}

fn default_name() -> String {
    "zk-offsets".to_string()
}
fn default_zookeeper_timeout() -> u64 {
    30
}
