//! Payload stored in topic-record and offset nodes.
//!
//! Both node kinds carry the same JSON record:
//! `{"topic": "t1", "partitionId": 0, "offset": 42}`. Absent fields decode to
//! their zero value; each tree level only consults the fields it needs.

use serde::Deserialize;
use serde::Serialize;

use crate::PayloadError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetRecord {
    pub topic: String,
    #[serde(rename = "partitionId")]
    pub partition_id: i32,
    pub offset: i64,
}

impl OffsetRecord {
    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Topic-record view: the record must name a topic.
    pub fn decode_topic(bytes: &[u8]) -> Result<String, PayloadError> {
        let record = Self::decode(bytes)?;
        if record.topic.is_empty() {
            return Err(PayloadError::MissingTopic);
        }
        Ok(record.topic)
    }

    /// Offset-node view.
    pub fn decode_offset(bytes: &[u8]) -> Result<i64, PayloadError> {
        Ok(Self::decode(bytes)?.offset)
    }

    pub fn encode(&self) -> Vec<u8> {
        // Serializing a plain struct of strings and integers cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
