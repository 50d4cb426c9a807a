mod cache;
mod canonical;
mod catalog;
mod config;
mod error;
mod filters;
mod http;
mod matcher;
mod model;
mod server;
mod service;
mod sort;
mod taxonomy;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cache::CatalogCache;
use catalog::CatalogLoader;
use config::Config;
use server::SchoolDiscoveryServer;
use service::DiscoveryService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting school-discovery server");

    let config = Config::from_env()?;
    info!(
        supabase = config.supabase.is_some(),
        seed_csv = %config.seed_csv_path,
        redis = config.redis_url.is_some(),
        cache_ttl_secs = config.cache_ttl_secs,
        "configuration loaded"
    );

    let cache = Arc::new(match config.redis_url.as_deref() {
        Some(url) => CatalogCache::new(url, config.cache_ttl_secs),
        None => CatalogCache::disabled(),
    });
    if cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }

    let loader = Arc::new(CatalogLoader::new(&config, Arc::clone(&cache))?);
    let catalog = loader.load().await;
    let service = DiscoveryService::new(catalog, loader);

    match (config.http_addr.clone(), config.mcp_tcp_addr.clone()) {
        (Some(http_addr), None) => http::serve(&http_addr, service).await?,
        (http_addr, Some(mcp_addr)) => {
            if let Some(http_addr) = http_addr {
                let rest = service.clone();
                tokio::spawn(async move {
                    if let Err(e) = http::serve(&http_addr, rest).await {
                        tracing::error!(error = %e, "REST listener stopped");
                    }
                });
            }
            serve_mcp_tcp(&mcp_addr, SchoolDiscoveryServer::new(service)).await?;
        }
        (None, None) => {
            let server = SchoolDiscoveryServer::new(service);
            info!("MCP server ready, serving on stdio");
            let service = server.serve(stdio()).await.inspect_err(|e| {
                tracing::error!(error = %e, "MCP server error");
            })?;
            service.waiting().await?;
            info!("MCP server shut down");
        }
    }
    Ok(())
}

async fn serve_mcp_tcp(addr: &str, server: SchoolDiscoveryServer) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(listen_addr = %addr, "MCP server ready, serving on TCP");
    loop {
        let (stream, peer) = listener.accept().await?;
        let server = server.clone();
        tokio::spawn(async move {
            tracing::info!(peer = %peer, "MCP client connected");
            let service = server.serve(stream).await.inspect_err(|e| {
                tracing::error!(error = %e, "MCP server error");
            })?;
            service.waiting().await?;
            tracing::info!(peer = %peer, "MCP client disconnected");
            Ok::<(), anyhow::Error>(())
        });
    }
}
