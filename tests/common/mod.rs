use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio::time::timeout;
use tokio::time::Instant;
use zk_offset_tracker::ConsumerConfig;
use zk_offset_tracker::ForwarderConfig;
use zk_offset_tracker::MemCoordinator;
use zk_offset_tracker::ModuleController;
use zk_offset_tracker::OffsetRecord;
use zk_offset_tracker::StorageRequest;

pub const CLUSTER: &str = "local";
pub const ROOT: &str = "/kafka/consumers";
pub const WAIT: Duration = Duration::from_secs(3);

pub fn consumer_config() -> ConsumerConfig {
    ConsumerConfig {
        cluster: CLUSTER.to_string(),
        servers: vec!["zk1:2181".to_string(), "zk2:2181".to_string()],
        zookeeper_path: "/kafka".to_string(),
        ..Default::default()
    }
}

pub fn offset_payload(
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

/// Creates one offset node per entry under `ROOT/<group>`; node `0` is also
/// the group's topic record.
pub fn seed_group(
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

pub async fn start_module(
    zk: &MemCoordinator,
    consumer: ConsumerConfig,
) -> (ModuleController, mpsc::Receiver<StorageRequest>) {
    let (storage_tx, storage_rx) = mpsc::channel(256);
    let mut module = ModuleController::configure(
        "zk-offsets",
        consumer,
        ForwarderConfig::default(),
        storage_tx,
        Arc::new(zk.clone()),
    )
    .expect("configure module");
    module.start().await.expect("start module");
    (module, storage_rx)
}

/// Receives `n` requests, sorted by group and partition.
pub async fn recv_requests(
    storage_rx: &mut mpsc::Receiver<StorageRequest>,
    n: usize,
) -> Vec<StorageRequest> {
    let mut requests = Vec::with_capacity(n);
    for _ in 0..n {
        let request = timeout(WAIT, storage_rx.recv())
            .await
            .expect("storage request within timeout")
            .expect("storage channel open");
        requests.push(request);
    }
    requests.sort_by(|a, b| (&a.group, a.partition).cmp(&(&b.group, b.partition)));
    requests
}

/// Gives in-flight watch tasks time to settle, then asserts nothing more
/// was forwarded.
pub async fn assert_no_more_requests(storage_rx: &mut mpsc::Receiver<StorageRequest>) {
    sleep(Duration::from_millis(100)).await;
    if let Ok(request) = storage_rx.try_recv() {
        panic!("unexpected storage request: {request:?}");
    }
}

pub async fn wait_until<F: Fn() -> bool>(
    limit: Duration,
    condition: F,
) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }
    condition()
}
