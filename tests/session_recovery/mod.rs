use zk_offset_tracker::ConsumerConfig;
use zk_offset_tracker::MemCoordinator;
use zk_offset_tracker::SessionState;

use crate::common::assert_no_more_requests;
use crate::common::consumer_config;
use crate::common::recv_requests;
use crate::common::seed_group;
use crate::common::start_module;
use crate::common::wait_until;
use crate::common::ROOT;
use crate::common::WAIT;

#[tokio::test]
async fn test_expiry_then_reconnect_rebuilds_tree() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "g1", "t1", &[42, 43]);
    seed_group(&zk, "g2", "t2", &[5]);
    let (mut module, mut storage_rx) = start_module(&zk, consumer_config()).await;
    recv_requests(&mut storage_rx, 3).await;
    let watcher = module.watcher().unwrap();
    assert!(wait_until(WAIT, || watcher.live_watches() == 8).await);

    zk.expire_session();
    assert!(wait_until(WAIT, || watcher.live_watches() == 0).await);
    assert_eq!(zk.outstanding_watches(), 0);

    zk.reconnect();
    let requests = recv_requests(&mut storage_rx, 3).await;
    let offsets: Vec<(&str, i64)> = requests
        .iter()
        .map(|r| (r.group.as_str(), r.offset))
        .collect();
    assert_eq!(offsets, vec![("g1", 42), ("g1", 43), ("g2", 5)]);
    assert!(wait_until(WAIT, || watcher.live_watches() == 8).await);
    assert_eq!(watcher.tree().group_names(), vec!["g1", "g2"]);

    module.stop().await.unwrap();
    assert_eq!(module.outstanding_tasks(), 0);
}

#[tokio::test]
async fn test_repeated_connected_events_rebuild_once() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "g1", "t1", &[42]);
    let (mut module, mut storage_rx) = start_module(&zk, consumer_config()).await;
    recv_requests(&mut storage_rx, 1).await;
    let watcher = module.watcher().unwrap();

    zk.expire_session();
    zk.reconnect();
    zk.emit_session_event(SessionState::Connected);
    zk.emit_session_event(SessionState::Disconnected);
    zk.emit_session_event(SessionState::Connected);

    recv_requests(&mut storage_rx, 1).await;
    assert_no_more_requests(&mut storage_rx).await;
    assert!(wait_until(WAIT, || watcher.live_watches() == 4).await);
    assert_eq!(zk.watch_count(ROOT), 1);
    assert_eq!(zk.watch_count(&format!("{ROOT}/g1")), 1);

    module.stop().await.unwrap();
}

#[tokio::test]
async fn test_rebuild_still_applies_filter() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "g1", "t1", &[1]);
    seed_group(&zk, "g1-internal", "t1", &[2]);
    let consumer = ConsumerConfig {
        group_denylist: Some("-internal$".to_string()),
        ..consumer_config()
    };
    let (mut module, mut storage_rx) = start_module(&zk, consumer).await;
    recv_requests(&mut storage_rx, 1).await;

    zk.expire_session();
    // created while the session is down
    seed_group(&zk, "g2", "t2", &[3]);
    zk.reconnect();

    let requests = recv_requests(&mut storage_rx, 2).await;
    let groups: Vec<&str> = requests.iter().map(|r| r.group.as_str()).collect();
    assert_eq!(groups, vec!["g1", "g2"]);
    assert_no_more_requests(&mut storage_rx).await;

    module.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_while_expired() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "g1", "t1", &[42]);
    let (mut module, mut storage_rx) = start_module(&zk, consumer_config()).await;
    recv_requests(&mut storage_rx, 1).await;

    zk.expire_session();
    module.stop().await.unwrap();

    assert_eq!(module.outstanding_tasks(), 0);
    assert!(zk.is_closed());
}
