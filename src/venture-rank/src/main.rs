//! Venture Rank: contextual-bandit startup recommendations for investors.
//!
//! Main entry point that wires the stores, the recommendation service and
//! the HTTP server.

use anyhow::bail;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use venture_api::ApiServer;
use venture_core::config::{AppConfig, StorageBackend};
use venture_recommender::{RecommendationService, Stores};
use venture_store::seed::seed_demo_catalog;
use venture_store::{
    BanditStateRepository, InMemoryCatalog, InMemoryInteractionLog, InMemoryPreferences,
    InMemoryStateRepository, RedisStateRepository,
};

#[derive(Parser, Debug)]
#[command(name = "venture-rank")]
#[command(about = "LinUCB startup recommendations with online feedback learning")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "VENTURE_RANK__NODE_ID")]
    node_id: Option<String>,

    /// HTTP bind host (overrides config)
    #[arg(long, env = "VENTURE_RANK__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "VENTURE_RANK__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Bandit state backend: memory or redis (overrides config)
    #[arg(long, env = "VENTURE_RANK__STORAGE__BACKEND")]
    storage_backend: Option<String>,

    /// Seed the catalog with demo startups
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "venture_rank=info,venture_recommender=info,tower_http=info".into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Venture Rank starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(backend) = cli.storage_backend {
        config.storage.backend = match backend.to_ascii_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "redis" => StorageBackend::Redis,
            other => bail!("unknown storage backend '{other}', expected memory or redis"),
        };
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        backend = ?config.storage.backend,
        feature_dimension = config.features.dimension(),
        "Configuration loaded"
    );

    let states: Arc<dyn BanditStateRepository> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(InMemoryStateRepository::new()),
        StorageBackend::Redis => match RedisStateRepository::new(&config.redis).await {
            Ok(repo) => Arc::new(repo),
            Err(e) => {
                error!(error = %e, "Failed to connect to Redis");
                return Err(e.into());
            }
        },
    };

    let catalog = Arc::new(InMemoryCatalog::new());
    if cli.seed_demo {
        seed_demo_catalog(&catalog);
    }

    let stores = Stores {
        catalog,
        preferences: Arc::new(InMemoryPreferences::new()),
        interactions: Arc::new(InMemoryInteractionLog::new()),
        states,
    };
    let service = Arc::new(RecommendationService::new(&config, stores));

    let api_server = ApiServer::new(config.clone(), service);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Venture Rank is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
