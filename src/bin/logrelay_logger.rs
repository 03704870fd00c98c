//! logrelay-logger: Logging service
//!
//! Accepts log payloads over HTTP (`POST /log`) and gRPC (`LogInfo`) and
//! stores them in an in-memory repository.
//!
//! ## Configuration
//! - LOGRELAY_CONFIG: Path to a YAML config file (optional)
//! - LOGRELAY__LOGGER__HTTP_PORT: HTTP port (default: 80)
//! - LOGRELAY__LOGGER__GRPC_PORT: gRPC port (default: 50001)
//! - LOGRELAY__LOGGER__PERSISTENCE_TIMEOUT_SECS: Per-write timeout (default: 15)
//! - LOGRELAY_LOG: Log filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;
use tonic_health::server::health_reporter;
use tracing::info;

use logrelay::config::Config;
use logrelay::logger::http::router;
use logrelay::logger::rpc::LogRpcService;
use logrelay::logger::{InMemoryLogRepository, LogRepository};
use logrelay::proto::log_service_server::LogServiceServer;
use logrelay::utils::bootstrap::{init_tracing, shutdown_on_ctrl_c, wait_for_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;
    let logger = &config.logger;

    let repository: Arc<dyn LogRepository> = Arc::new(InMemoryLogRepository::new());
    let timeout = logger.persistence_timeout();

    let http_addr: SocketAddr = format!("0.0.0.0:{}", logger.http_port).parse()?;
    let grpc_addr: SocketAddr = format!("0.0.0.0:{}", logger.grpc_port).parse()?;

    let (mut health_reporter, health_service) = health_reporter();
    health_reporter
        .set_serving::<LogServiceServer<LogRpcService>>()
        .await;

    let shutdown = shutdown_on_ctrl_c();

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http = axum::serve(listener, router(Arc::clone(&repository), timeout))
        .with_graceful_shutdown(wait_for_shutdown(shutdown.clone()));

    let grpc = Server::builder()
        .add_service(health_service)
        .add_service(LogRpcService::new(repository, timeout).into_server())
        .serve_with_shutdown(grpc_addr, wait_for_shutdown(shutdown));

    info!(
        http_port = logger.http_port,
        grpc_port = logger.grpc_port,
        "logrelay-logger started"
    );

    let (http_result, grpc_result) = tokio::join!(http, grpc);
    http_result?;
    grpc_result?;

    info!("logrelay-logger stopped");
    Ok(())
}
