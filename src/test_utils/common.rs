use std::time::Duration;

use tokio::time::sleep;
use tokio::time::Instant;

use crate::MemCoordinator;
use crate::OffsetRecord;

pub(crate) const ROOT: &str = "/consumers";

/// Polls `condition` every few milliseconds until it holds or `timeout` passes.
pub(crate) async fn wait_until<F: Fn() -> bool>(
    timeout: Duration,
    condition: F,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(5)).await;
    }
}

pub(crate) fn offset_payload(
    topic: &str,
    partition: i32,
    offset: i64,
) -> Vec<u8> {
    OffsetRecord {
        topic: topic.to_string(),
        partition_id: partition,
        offset,
    }
    .encode()
}

/// Creates `<ROOT>/<group>/<i>` for every offset, each carrying the full
/// record; node `0` doubles as the topic record.
pub(crate) fn seed_group(
    zk: &MemCoordinator,
    group: &str,
    topic: &str,
    offsets: &[i64],
) {
    for (partition, offset) in offsets.iter().enumerate() {
        zk.create(
            &format!("{ROOT}/{group}/{partition}"),
            offset_payload(topic, partition as i32, *offset),
        )
        .expect("seed node");
    }
}
