//! Consumer group admission by allow/deny pattern.


use regex::Regex;

use crate::ConsumerConfig;
use crate::Error;
use crate::Result;

/// Decides which consumer groups are tracked.
///
/// With neither pattern set every group is accepted. The deny pattern is
/// checked after the allow pattern and always wins.
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    allow: Option<Regex>,
    deny: Option<Regex>,
}

impl GroupFilter {
    /// Compiles the optional patterns. An empty pattern counts as unset.
    ///
    /// # Errors
    /// `Error::InvalidConfig` naming `consumer.group_allowlist` or
    /// `consumer.group_denylist` when a pattern does not compile.
    pub fn new(
        allow: Option<&str>,
        deny: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            allow: compile("consumer.group_allowlist", allow)?,
            deny: compile("consumer.group_denylist", deny)?,
        })
    }

    pub fn from_config(config: &ConsumerConfig) -> Result<Self> {
        Self::new(
            config.group_allowlist.as_deref(),
            config.group_denylist.as_deref(),
        )
    }

    pub fn accept(
        &self,
        group: &str,
    ) -> bool {
        if let Some(allow) = &self.allow {
            if !allow.is_match(group) {
                return false;
            }
        }
        if let Some(deny) = &self.deny {
            if deny.is_match(group) {
                return false;
            }
        }
        true
    }
}

fn compile(
    field: &'static str,
    pattern: Option<&str>,
) -> Result<Option<Regex>> {
    match pattern {
        None | Some("") => Ok(None),
        Some(p) => Regex::new(p)
            .map(Some)
            .map_err(|e| Error::invalid_config(field, format!("failed to compile '{p}': {e}"))),
    }
}
