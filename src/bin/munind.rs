//! munind, the Munin daemon.
//!
//! Serves `/api/status` and `/api/generate` over HTTP, backed by a
//! text-generation server on the same host.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use munin::pipeline::Synthesizer;
use munin::providers::{TgiClient, TgiLoader};
use munin::server::config::Config;
use munin::{CacheConfig, MuninError, PointCache, PointService, ReadinessGate, WarmupConfig};

/// Munin daemon: topic statement synthesis service.
#[derive(Parser)]
#[command(name = "munind")]
#[command(version = munin::PKG_VERSION)]
#[command(about = "Munin statement synthesis daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Address to bind to, overriding the config file.
    #[arg(short, long, env = "MUNIN_ADDRESS")]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    let service = Arc::new(build_service(&config)?);

    if config.model.preload {
        service.gate().spawn_preload();
    }

    // Parse address
    let address = args.address.unwrap_or_else(|| config.server.address.clone());
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| MuninError::Configuration(format!("Invalid address {address:?}: {e}")))?;

    info!(version = munin::version_string(), %addr, model = %config.model.base_url, "munind starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, munin::server::router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("munind stopped");
    Ok(())
}

/// Build the [`PointService`] from configuration.
fn build_service(config: &Config) -> Result<PointService, MuninError> {
    let mut client = TgiClient::new(&config.model.base_url, config.model.request_timeout())?;
    if let Some(token) = Config::model_token() {
        client = client.with_token(token);
    }
    let loader = TgiLoader::new(client).retry((&config.model.retry).into());

    let mut gate = ReadinessGate::new(Arc::new(loader));
    if config.model.warmup {
        gate = gate.with_warmup(WarmupConfig::default());
    }

    let cache = PointCache::new(CacheConfig::from(&config.cache));
    let synthesizer = Synthesizer::new(config.pipeline.to_pipeline_config()?);

    Ok(PointService::new(Arc::new(gate), cache, synthesizer)
        .max_topic_chars(config.server.max_topic_chars))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            tracing::warn!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    }
}
