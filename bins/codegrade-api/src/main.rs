mod auth;
mod error;
mod handlers;
mod metrics;
mod routes;


use anyhow::Context;
use axum::Router;
use codegrade_common::config::{AppConfig, LanguageTable};
use codegrade_common::redis::RedisStore;
use codegrade_engine::{Judge0Engine, Orchestrator};
use metrics::MeteredExecutor;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new().merge(routes::routes()).with_state(state)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("CodeGrade API booting...");

    let config = AppConfig::from_env().context("Failed to read configuration")?;

    let languages = LanguageTable::load_or_builtin(&config.languages_path)
        .context("Failed to load language table")?;
    info!("Loaded languages: {:?}", languages.names());

    let judge = config.require_judge().context("Execution service is not configured")?;
    let executor = Judge0Engine::new(judge).context("Failed to create execution client")?;
    info!(url = %judge.base_url, timeout_secs = judge.timeout_secs, "Execution service configured");

    let store = Arc::new(
        RedisStore::connect(&config.redis_url)
            .await
            .context("Failed to connect to Redis")?,
    );
    info!("Connected to Redis: {}", config.redis_url);

    let orchestrator = Orchestrator::new(
        Arc::new(MeteredExecutor::new(executor)),
        store.clone(),
        store,
        Arc::new(languages),
    );

    let state = Arc::new(AppState {
        orchestrator: Arc::new(orchestrator),
    });

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("HTTP server listening on {}", config.bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            warn!("Received shutdown signal, draining in-flight requests...");
        })
        .await
        .context("Server error")?;

    info!("API shutdown complete");
    Ok(())
}
