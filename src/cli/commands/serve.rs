//! Serve command - run the HTTP API server

use crate::core::config::Config;
use crate::core::services::Services;
use crate::http;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// JSON provider fixture (overrides [provider].fixture)
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Address to bind (overrides [server].host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides [server].port)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(fixture) = args.fixture {
        config.provider.fixture = Some(fixture);
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Starting siteindex service");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    config.log_config();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let services = Arc::new(Services::from_config(config)?);
    let app = http::router(services);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    tracing::info!("Service ready - Health check at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
