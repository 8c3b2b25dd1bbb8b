//! Fabsearch Server
//!
//! Federated maker-asset search over one HTTP API. Registers the built-in
//! provider adapters, builds one aggregation engine, and serves the JSON
//! surface until interrupted.

mod providers;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use fabsearch_core::SearchEngine;

#[derive(Debug, Parser)]
#[command(name = "fabsearch-server", version, about = "Federated maker-asset search server")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind.
    #[arg(long, default_value_t = 8787)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_target(false)
        .init();

    info!("fabsearch-server v{} starting", env!("CARGO_PKG_VERSION"));

    let registry = providers::default_registry();
    let configured = registry
        .descriptors()
        .iter()
        .filter(|descriptor| descriptor.configured)
        .count();
    info!(
        "registered {} providers ({} configured)",
        registry.len(),
        configured
    );

    let engine = Arc::new(SearchEngine::new(Arc::new(registry)));
    let app = routes::router(engine);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("search API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
