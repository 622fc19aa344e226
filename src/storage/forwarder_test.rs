use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing_test::traced_test;

use super::*;

fn fact(offset: i64) -> OffsetFact {
    OffsetFact {
        cluster: "local".to_string(),
        topic: "t1".to_string(),
        partition: 0,
        group: "g1".to_string(),
        offset,
        timestamp: 1_700_000_000_000,
    }
}

#[tokio::test]
async fn test_forward_delivers_set_consumer_offset_request() {
    let (tx, mut rx) = mpsc::channel(4);
    let forwarder = OffsetForwarder::new(tx, Duration::from_secs(1));

    assert!(forwarder.forward(fact(42)).await);

    let request = rx.recv().await.unwrap();
    assert_eq!(
        request,
        StorageRequest {
            request_type: StorageRequestType::SetConsumerOffset,
            cluster: "local".to_string(),
            topic: "t1".to_string(),
            partition: 0,
            group: "g1".to_string(),
            timestamp: 1_700_000_000_000,
            offset: 42,
        }
    );
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_forward_drops_after_timeout_when_channel_full() {
    let (tx, mut rx) = mpsc::channel(1);
    let forwarder = OffsetForwarder::new(tx, Duration::from_secs(1));

    assert!(forwarder.forward(fact(1)).await);

    let started = Instant::now();
    assert!(!forwarder.forward(fact(2)).await);
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(logs_contain("storage channel full"));

    // Only the first fact made it through
    assert_eq!(rx.recv().await.unwrap().offset, 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_forward_waits_for_capacity_within_timeout() {
    let (tx, mut rx) = mpsc::channel(1);
    let forwarder = OffsetForwarder::new(tx, Duration::from_secs(5));
    assert!(forwarder.forward(fact(1)).await);

    let drain = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        (first.offset, second.offset)
    });

    assert!(forwarder.forward(fact(2)).await);
    assert_eq!(drain.await.unwrap(), (1, 2));
}

#[tokio::test]
async fn test_forward_reports_closed_channel() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let forwarder = OffsetForwarder::new(tx, Duration::from_millis(10));

    assert!(!forwarder.forward(fact(1)).await);
}
