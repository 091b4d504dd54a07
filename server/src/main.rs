use std::net::SocketAddr;

use clap::Parser;
use dotenv::dotenv;
use metrics_core::hash::HashService;
use metrics_core::proto::metrics_server::MetricsServer;
use metrics_core::GRPC_PORT;
use metrics_server::api::build_router;
use metrics_server::config::{Args, Settings};
use metrics_server::grpc::{MetricsService, ProtectionInterceptor};
use metrics_server::middleware::{PrivateKeyPath, TrustedSubnet};
use metrics_server::storage::build_store;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server as GrpcServer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

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
    info!(address = %settings.address, "loaded settings");

    let store = build_store(&settings).await;

    let hash_service = settings.key.clone().map(HashService::new);
    let private_key_path = settings.crypto_key.clone().map(|p| PrivateKeyPath(p.into()));
    let trusted_subnet: Option<TrustedSubnet> = settings
        .trusted_subnet
        .clone()
        .map(|s| s.parse())
        .transpose()
        .unwrap_or_else(|e| {
            error!("invalid trusted_subnet CIDR: {e}");
            std::process::exit(1);
        });

    let cancel = CancellationToken::new();

    let http_addr: SocketAddr = settings.address.parse().unwrap_or_else(|e| {
        error!("invalid address {}: {e}", settings.address);
        std::process::exit(1);
    });
    let router = build_router(store.clone(), hash_service, private_key_path, trusted_subnet.clone());
    let listener = TcpListener::bind(http_addr).await?;
    let http_cancel = cancel.clone();
    let http_handle = tokio::spawn(async move {
        info!(%http_addr, "HTTP server listening");
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(async move { http_cancel.cancelled().await })
            .await
        {
            error!("HTTP server error: {e}");
        }
    });

    let grpc_addr: SocketAddr = ([0, 0, 0, 0], GRPC_PORT).into();
    let grpc_store = store.clone();
    let grpc_subnet = trusted_subnet.map(|s| s.0);
    let grpc_cancel = cancel.clone();
    let grpc_handle = tokio::spawn(async move {
        let interceptor = ProtectionInterceptor::new(grpc_subnet);
        let service = MetricsServer::with_interceptor(MetricsService::new(grpc_store), interceptor);
        info!(%grpc_addr, "gRPC server listening");
        if let Err(e) = GrpcServer::builder()
            .add_service(service)
            .serve_with_shutdown(grpc_addr, async move { grpc_cancel.cancelled().await })
            .await
        {
            error!("gRPC server error: {e}");
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received, stopping servers");
    cancel.cancel();

    let _ = tokio::join!(http_handle, grpc_handle);
    store.close().await;

    Ok(())
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
