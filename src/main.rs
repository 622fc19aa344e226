use std::path::Path;
use std::sync::Arc;

use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use zk_offset_tracker::metrics;
use zk_offset_tracker::Error;
use zk_offset_tracker::LoggingConfig;
use zk_offset_tracker::ModuleController;
use zk_offset_tracker::Result;
use zk_offset_tracker::StorageRequest;
use zk_offset_tracker::TrackerConfig;
use zk_offset_tracker::ZookeeperConnector;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config = TrackerConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&config.logging)?;

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    if config.monitoring.prometheus_enabled {
        tokio::spawn(metrics::start_server(
            config.monitoring.prometheus_port,
            graceful_rx.clone(),
        ));
    }

    // Storage lives outside this process; log what would be stored
    let (storage_tx, storage_rx) = mpsc::channel(config.forwarder.channel_capacity);
    let sink = tokio::spawn(log_storage_requests(storage_rx));

    let connector = Arc::new(ZookeeperConnector::new(config.consumer.reconnect));
    let mut module = ModuleController::configure(
        config.consumer.name.clone(),
        config.consumer,
        config.forwarder,
        storage_tx,
        connector,
    )?;
    module.start().await?;

    info!("Application started. Waiting for shutdown signal...");
    graceful_shutdown(graceful_tx).await?;

    if let Err(e) = module.stop().await {
        error!("module stop failed: {:?}", e);
    }
    // The module held the last sender; the sink drains and exits.
    drop(module);
    let _ = sink.await;

    info!("Exiting program.");
    Ok(())
}

async fn log_storage_requests(mut storage_rx: mpsc::Receiver<StorageRequest>) {
    while let Some(request) = storage_rx.recv().await {
        info!(
            cluster = %request.cluster,
            group = %request.group,
            topic = %request.topic,
            partition = request.partition,
            offset = request.offset,
            timestamp = request.timestamp,
            "storage request"
        );
    }
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| Error::Fatal(format!("failed to install SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| Error::Fatal(format!("failed to install SIGTERM handler: {e}")))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    info!("Shutdown server..");
    // Only the metrics server listens; it may not be running.
    let _ = graceful_tx.send(());
    Ok(())
}

fn init_observability(logging: &LoggingConfig) -> Result<WorkerGuard> {
    let log_dir = Path::new(&logging.log_dir);
    std::fs::create_dir_all(log_dir).map_err(|e| {
        Error::Fatal(format!("failed to create log dir {}: {e}", log_dir.display()))
    })?;
    let log_file = tracing_appender::rolling::never(log_dir, &logging.file_name);

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
