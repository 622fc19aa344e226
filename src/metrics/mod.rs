use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    pub static ref FORWARDED_OFFSETS: IntCounterVec = IntCounterVec::new(
        Opts::new("zk_offsets_forwarded_total", "Offset facts handed to the storage channel"),
        &["cluster"]
    )
    .expect("metric can not be created");

    pub static ref DROPPED_OFFSETS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "zk_offsets_dropped_total",
            "Offset facts dropped because the storage channel stayed full"
        ),
        &["cluster"]
    )
    .expect("metric can not be created");

    pub static ref PAYLOAD_DECODE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("zk_payload_decode_failures_total", "Node payloads that failed to decode"),
        &["level"]
    )
    .expect("metric can not be created");

    pub static ref ACTIVE_WATCHES: IntGaugeVec = IntGaugeVec::new(
        Opts::new("zk_active_watches", "Watch loops currently armed"),
        &["level"]
    )
    .expect("metric can not be created");

    pub static ref TREE_REBUILDS: IntCounterVec = IntCounterVec::new(
        Opts::new("zk_tree_rebuilds_total", "Full watch tree rebuilds after session expiry"),
        &["cluster"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        register_custom_metrics(&registry);
        registry
    };
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(FORWARDED_OFFSETS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(DROPPED_OFFSETS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(PAYLOAD_DECODE_FAILURES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(ACTIVE_WATCHES.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(TREE_REBUILDS.clone()))
        .expect("collector can be registered");
}

/// Serves `/metrics` until `shutdown_signal` changes.
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!(port, "metrics server listening");
    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(gather_metrics())
}

/// Text exposition of every registered collector.
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
