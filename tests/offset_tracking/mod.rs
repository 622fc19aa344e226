use zk_offset_tracker::ConsumerConfig;
use zk_offset_tracker::MemCoordinator;
use zk_offset_tracker::StorageRequestType;

use crate::common::assert_no_more_requests;
use crate::common::consumer_config;
use crate::common::offset_payload;
use crate::common::recv_requests;
use crate::common::seed_group;
use crate::common::start_module;
use crate::common::CLUSTER;
use crate::common::ROOT;

#[tokio::test]
async fn test_denied_group_produces_no_facts() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "g1", "t1", &[42]);
    seed_group(&zk, "g2-internal", "t1", &[9]);
    let consumer = ConsumerConfig {
        group_denylist: Some(".*-internal$".to_string()),
        ..consumer_config()
    };

    let (mut module, mut storage_rx) = start_module(&zk, consumer).await;

    let requests = recv_requests(&mut storage_rx, 1).await;
    let request = &requests[0];
    assert_eq!(request.request_type, StorageRequestType::SetConsumerOffset);
    assert_eq!(request.cluster, CLUSTER);
    assert_eq!(request.group, "g1");
    assert_eq!(request.topic, "t1");
    assert_eq!(request.partition, 0);
    assert_eq!(request.offset, 42);
    assert_no_more_requests(&mut storage_rx).await;

    module.stop().await.unwrap();
}

#[tokio::test]
async fn test_allowlist_limits_tracked_groups() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "billing", "invoices", &[1]);
    seed_group(&zk, "search", "queries", &[2]);
    let consumer = ConsumerConfig {
        group_allowlist: Some("^bill".to_string()),
        ..consumer_config()
    };

    let (mut module, mut storage_rx) = start_module(&zk, consumer).await;

    let requests = recv_requests(&mut storage_rx, 1).await;
    assert_eq!(requests[0].group, "billing");
    assert_no_more_requests(&mut storage_rx).await;
    assert_eq!(module.watcher().unwrap().tree().group_names(), vec!["billing"]);

    module.stop().await.unwrap();
}

#[tokio::test]
async fn test_every_partition_is_forwarded() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "g1", "t1", &[10, 11, 12]);
    seed_group(&zk, "g2", "t2", &[20]);

    let (mut module, mut storage_rx) = start_module(&zk, consumer_config()).await;

    let requests = recv_requests(&mut storage_rx, 4).await;
    let seen: Vec<(&str, &str, i32, i64)> = requests
        .iter()
        .map(|r| (r.group.as_str(), r.topic.as_str(), r.partition, r.offset))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("g1", "t1", 0, 10),
            ("g1", "t1", 1, 11),
            ("g1", "t1", 2, 12),
            ("g2", "t2", 0, 20),
        ]
    );

    module.stop().await.unwrap();
}

#[tokio::test]
async fn test_commits_and_new_groups_are_followed() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "g1", "t1", &[42]);
    let (mut module, mut storage_rx) = start_module(&zk, consumer_config()).await;
    let first = recv_requests(&mut storage_rx, 1).await.remove(0);

    zk.set_data(&format!("{ROOT}/g1/0"), offset_payload("t1", 0, 50))
        .unwrap();
    let commit = recv_requests(&mut storage_rx, 1).await.remove(0);
    assert_eq!(commit.offset, 50);
    assert!(commit.timestamp > first.timestamp);

    seed_group(&zk, "g3", "t3", &[7]);
    let discovered = recv_requests(&mut storage_rx, 1).await.remove(0);
    assert_eq!((discovered.group.as_str(), discovered.offset), ("g3", 7));

    zk.create(&format!("{ROOT}/g1/1"), offset_payload("t1", 1, 3))
        .unwrap();
    let grown = recv_requests(&mut storage_rx, 1).await.remove(0);
    assert_eq!((grown.group.as_str(), grown.partition, grown.offset), ("g1", 1, 3));

    assert_no_more_requests(&mut storage_rx).await;
    module.stop().await.unwrap();
}

#[tokio::test]
async fn test_bad_offset_payload_is_skipped() {
    let zk = MemCoordinator::new();
    seed_group(&zk, "g1", "t1", &[42]);
    let (mut module, mut storage_rx) = start_module(&zk, consumer_config()).await;
    recv_requests(&mut storage_rx, 1).await;

    zk.set_data(&format!("{ROOT}/g1/0"), "{\"offset\": \"many\"}").unwrap();
    assert_no_more_requests(&mut storage_rx).await;

    zk.set_data(&format!("{ROOT}/g1/0"), offset_payload("t1", 0, 43)).unwrap();
    let request = recv_requests(&mut storage_rx, 1).await.remove(0);
    assert_eq!(request.offset, 43);

    module.stop().await.unwrap();
}
