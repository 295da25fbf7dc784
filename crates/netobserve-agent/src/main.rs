//! Process bootstrap: parses CLI flags, wires the cluster-API watch client,
//! the capture driver, and the correlation/attribution pipeline together,
//! and runs until a shutdown signal arrives.

mod cli;

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use cli::Cli;
use netobserve_attribution::PacketHandler;
use netobserve_capture::CaptureDriver;
use netobserve_classify::Packet;
use netobserve_correlate::CorrelationEngine;
use netobserve_core::ResourceIndex;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Capacity of the channel between the capture producer and the
/// correlation/attribution consumer (§5).
const CHANNEL_CAPACITY: usize = 1000;
/// Warn once remaining channel capacity drops below this fraction of
/// [`CHANNEL_CAPACITY`] — the producer is about to start blocking.
const CHANNEL_WARN_REMAINING: usize = CHANNEL_CAPACITY / 10;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());
    run().await
}

fn init_tracing(level: tracing::Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> anyhow::Result<()> {
    let node_ips = netobserve_capture::local_ipv4_addresses()?;
    let resources = Arc::new(ResourceIndex::new(node_ips));

    let client = netobserve_k8s::connect().await?;
    match netobserve_k8s::cluster_api_service_ip(&client).await {
        Some(ip) => resources.set_cluster_api_service_ip(ip),
        None => warn!("failed to get ip of the 'kubernetes' service"),
    }

    let watchers = netobserve_k8s::watch_all(client, resources.clone());

    let pod_ip = wait_for_local_pod_ip(&resources).await;
    let driver = Arc::new(CaptureDriver::new(
        pod_ip,
        resources.cluster_api_service_ip().as_deref(),
    )?);

    let metrics_config = netobserve_telemetry::MetricsConfig::from_env()?;
    let _metrics_guard = netobserve_telemetry::install(metrics_config)?;

    let handler = PacketHandler::new(resources.clone(), driver.clone());

    let (tx, mut rx) = mpsc::channel::<Packet>(CHANNEL_CAPACITY);
    let stop = Arc::new(AtomicBool::new(false));

    let capture_stop = stop.clone();
    let capture_driver = driver.clone();
    let capture_task = tokio::task::spawn_blocking(move || {
        let result = capture_driver.run(&capture_stop, |packet| {
            if tx.capacity() <= CHANNEL_WARN_REMAINING {
                warn!("packet channel over 90% full, capture may start blocking");
            }
            if tx.blocking_send(packet).is_err() {
                error!("packet consumer gone, capture loop has nowhere to send");
            }
        });
        if let Err(err) = result {
            error!(error = %err, "capture loop exited with an error");
        }
    });

    let consumer_task = tokio::spawn(async move {
        let mut engine = CorrelationEngine::new();
        while let Some(packet) = rx.recv().await {
            handler.handle(&mut engine, &packet);
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received, stopping capture");
    stop.store(true, Ordering::Relaxed);

    let _ = capture_task.await;
    let _ = consumer_task.await;
    for watcher in watchers {
        watcher.abort();
    }

    Ok(())
}

/// Blocks until a pod IP is observed on this node, retrying every 10
/// seconds, mirroring `NewPacketManager`'s wait loop for
/// `GetPodIpInThisNode`.
async fn wait_for_local_pod_ip(resources: &ResourceIndex) -> Ipv4Addr {
    loop {
        if let Some(parsed) = resources.local_pod_ip().and_then(|ip| ip.parse().ok()) {
            return parsed;
        }
        warn!("no pod ip observed on this node yet, retrying in 10s");
        tokio::time::sleep(Duration::from_secs(10)).await;
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
