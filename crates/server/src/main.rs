//! swcache server entry point.
//!
//! Boots one worker from configuration and serves its lifecycle over MCP on
//! stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{HttpNetwork, NetworkConfig, ServiceWorker};
use swcache_core::{AppConfig, CacheDb, CacheStore};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    // A store that cannot be opened leaves the worker serving from the network.
    let store = match CacheDb::open(&config.db_path).await {
        Ok(db) => Some(CacheStore::new(db)),
        Err(e) => {
            tracing::warn!(path = %config.db_path.display(), error = %e, "cache store unavailable, running network-only");
            None
        }
    };

    let network = HttpNetwork::new(NetworkConfig::from_app_config(&config))?;
    let worker = Arc::new(ServiceWorker::new(&config, store, Arc::new(network))?);

    tracing::info!(generation = %worker.generation(), origin = %config.origin, "Starting swcache server on stdio transport");

    let handler = handler::SwCacheServer::new(worker.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    worker.settle().await;

    Ok(())
}
