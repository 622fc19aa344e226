use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            file_name: default_file_name(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_dir.as_os_str().is_empty() {
            return Err(Error::invalid_config("logging.log_dir", "path cannot be empty"));
        }
        if self.file_name.is_empty() {
            return Err(Error::invalid_config("logging.file_name", "cannot be empty"));
        }
        Ok(())
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp/zk-offset-tracker/logs")
}
fn default_file_name() -> String {
    "tracker.log".to_string()
}
