//! Customs PACT 2025 backend - Entry point.

use anyhow::{Context, Result};
use pact_server::{
    api::{create_router_with_rate_limit, AppState, RequestLimiter},
    config::{Config, LogConfig},
};
use registration_store::{Persistence, RecordStore};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.log);

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(config: Config) -> Result<()> {
    info!("Starting Customs PACT 2025 backend");

    // Initialize storage
    let persistence = if config.store.persist {
        Persistence::file(config.store.path.clone())
    } else {
        info!("Persistence disabled, using in-memory storage");
        Persistence::memory()
    };

    let store = RecordStore::open(persistence)
        .await
        .with_context(|| format!("Failed to open record store at {}", config.store.path.display()))?;

    info!(
        prefix = %config.registration.prefix,
        strategy = %config.registration.strategy,
        max_attempts = config.registration.max_attempts,
        open = config.registration.open,
        "Registration numbering configured"
    );

    let state = AppState::new(store, &config.registration);
    let limiter = RequestLimiter::from_config(&config.rate_limit);
    info!(per_minute = limiter.limit(), "Request rate limit configured");
    let app = create_router_with_rate_limit(state, limiter);

    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")
}
