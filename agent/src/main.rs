use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use metrics_agent::collector::AgentMetrics;
use metrics_agent::config::{Args, Settings};
use metrics_agent::sender::{GrpcTransport, HttpTransport, SenderPool, Transport};
use metrics_core::hash::HashService;
use metrics_core::GRPC_PORT;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args).unwrap_or_else(|e| {
        error!("failed to load configuration: {e}");
        std::process::exit(1);
    });
    info!(address = %settings.address, poll_interval = settings.poll_interval, report_interval = settings.report_interval, "loaded settings");

    let (metrics, mut runtime_sampler, mut host_sampler) = AgentMetrics::new().unwrap_or_else(|e| {
        error!("runtime metric whitelist validation failed: {e}");
        std::process::exit(1);
    });

    let hash_service = settings.key.clone().map(HashService::new);
    let crypto_key_path = settings.crypto_key.clone().map(Into::into);

    let transport: Arc<dyn Transport> = if settings.use_grpc {
        let endpoint = format!("http://{}:{}", host_only(&settings.address), GRPC_PORT);
        Arc::new(GrpcTransport::connect(endpoint).await?)
    } else {
        let base_url = format!("http://{}", settings.address);
        Arc::new(HttpTransport::new(base_url, hash_service, crypto_key_path))
    };

    let cancel = CancellationToken::new();
    let pool = SenderPool::start(settings.rate_limit, transport, metrics.clone(), cancel.clone());

    let poll_interval = Duration::from_secs(settings.poll_interval);
    let report_interval = Duration::from_secs(settings.report_interval);
    let loop_cancel = cancel.clone();
    let loop_metrics = metrics.clone();
    let poll_handle = tokio::spawn(async move {
        let mut poll_ticker = tokio::time::interval(poll_interval);
        let mut report_ticker = tokio::time::interval(report_interval);
        loop {
            tokio::select! {
                _ = poll_ticker.tick() => {
                    loop_metrics.poll(&mut runtime_sampler, &mut host_sampler).await;
                }
                _ = report_ticker.tick() => {
                    info!("sending metrics...");
                    pool.submit(loop_metrics.snapshot().await).await;
                }
                _ = loop_cancel.cancelled() => break,
            }
        }
        pool
    });

    shutdown_signal().await;
    info!("shutdown signal received, stopping agent");
    cancel.cancel();

    let pool = poll_handle.await?;
    // Flush whatever accumulated since the last report tick before exiting.
    let remaining = metrics.snapshot().await;
    let poll_count = remaining.iter().find(|m| m.id == "PollCount");
    if !matches!(poll_count.map(|m| &m.kind), Some(metrics_core::model::MetricKind::Counter(0))) {
        pool.submit(remaining).await;
    }
    pool.shutdown().await;

    Ok(())
}

fn host_only(address: &str) -> &str {
    address.split(':').next().unwrap_or(address)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
