use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::task::TaskTracker;
use zk_offset_tracker::Coordinator;
use zk_offset_tracker::GroupFilter;
use zk_offset_tracker::HierarchicalWatcher;
use zk_offset_tracker::MemCoordinator;
use zk_offset_tracker::OffsetForwarder;

use crate::common::consumer_config;
use crate::common::recv_requests;
use crate::common::seed_group;
use crate::common::start_module;
use crate::common::wait_until;
use crate::common::CLUSTER;
use crate::common::ROOT;
use crate::common::WAIT;

#[tokio::test]
async fn test_close_completes_exactly_every_spawned_task() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "g1", "t1", &[1, 2, 3]);
    seed_group(&zk, "g2", "t2", &[4, 5]);
    seed_group(&zk, "g3", "t3", &[6]);
    let (storage_tx, mut storage_rx) = mpsc::channel(64);
    let tracker = TaskTracker::new();
    let watcher = HierarchicalWatcher::new(
        Arc::new(zk.clone()),
        CLUSTER,
        ROOT,
        GroupFilter::default(),
        OffsetForwarder::new(storage_tx, Duration::from_millis(100)),
        tracker.clone(),
    );

    watcher.watch_groups();
    recv_requests(&mut storage_rx, 6).await;
    // 1 group list + 3 x (topic + partition list) + 6 offsets
    let spawned = 1 + 3 * 2 + 6;
    assert!(wait_until(WAIT, || watcher.live_watches() == spawned).await);
    assert_eq!(tracker.len(), spawned);

    zk.close();
    tracker.close();
    timeout(WAIT, tracker.wait()).await.unwrap();

    assert!(tracker.is_empty());
    assert_eq!(watcher.finished_watches(), spawned);
    assert_eq!(watcher.live_watches(), 0);
}

#[tokio::test]
async fn test_stop_returns_with_zero_outstanding_tasks() {
    let zk = MemCoordinator::new();
    for group in 0..10 {
        seed_group(&zk, &format!("group-{group}"), "events", &[1, 2, 3, 4]);
    }
    let (mut module, mut storage_rx) = start_module(&zk, consumer_config()).await;
    recv_requests(&mut storage_rx, 40).await;
    assert!(module.outstanding_tasks() > 0);

    timeout(WAIT, module.stop()).await.unwrap().unwrap();

    assert_eq!(module.outstanding_tasks(), 0);
    assert_eq!(zk.outstanding_watches(), 0);
}

#[tokio::test]
async fn test_stop_with_blocked_storage_still_returns() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "g1", "t1", &[1, 2, 3, 4, 5, 6, 7, 8]);
    let (storage_tx, _storage_rx) = mpsc::channel(1);
    let mut module = zk_offset_tracker::ModuleController::configure(
        "zk-offsets",
        consumer_config(),
        zk_offset_tracker::ForwarderConfig {
            send_timeout_ms: 20,
            ..Default::default()
        },
        storage_tx,
        Arc::new(zk.clone()),
    )
    .unwrap();
    module.start().await.unwrap();
    let watcher = module.watcher().unwrap();
    assert!(wait_until(WAIT, || watcher.live_watches() == 11).await);

    timeout(WAIT, module.stop()).await.unwrap().unwrap();
    assert_eq!(module.outstanding_tasks(), 0);
}
