//! Student predictor server
//!
//! Loads the trained pass/fail classifier, watches its artifacts for
//! changes and serves predictions, feedback and admin endpoints over HTTP.

use anyhow::{Context, Result};
use predictor_lib::{
    classifier::ArtifactWatcher,
    health::{components, HealthRegistry},
    observability::{EngineMetrics, StructuredLogger},
    PredictionEngine,
};
use predictor_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting student-predictor");

    let config = ServerConfig::load().context("Failed to load configuration")?;
    info!(
        instance = %config.instance_name,
        model_path = %config.model_path.display(),
        "Server configured"
    );
    if config.admin_token == "changeme" {
        warn!("Admin token is the default value, set PREDICTOR_ADMIN_TOKEN");
    }

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL_STORE).await;
    health_registry.register(components::PREDICTOR).await;

    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    let engine = Arc::new(PredictionEngine::from_config(&config.to_engine_config()));
    let store = Arc::clone(engine.store());

    let app_state = Arc::new(api::AppState::new(
        Arc::clone(&engine),
        health_registry.clone(),
        metrics.clone(),
        logger.clone(),
        config.admin_token.clone(),
    ));

    // Startup load already happened in the store; mirror it into health and metrics
    let startup = store.snapshot().map_err(|e| e.to_string());
    let model_version = startup.as_ref().ok().map(|s| s.version().to_string());
    if startup.is_err() {
        metrics.set_threshold(store.threshold().0);
    }
    app_state.record_reload(startup).await;

    let _watcher = if config.watch_artifacts {
        let state = Arc::clone(&app_state);
        let watcher = ArtifactWatcher::new(Arc::clone(&store))
            .with_debounce(config.watch_debounce())
            .start(move |outcome| {
                let outcome = outcome.as_ref().map(Arc::clone).map_err(|e| e.to_string());
                let state = Arc::clone(&state);
                tokio::spawn(async move { state.record_reload(outcome).await });
            });
        match watcher {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Artifact watching disabled");
                None
            }
        }
    } else {
        None
    };

    logger.log_startup(SERVICE_VERSION, model_version.as_deref());

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::select! {
        result = api_handle => {
            result.context("API server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
    }

    let engine_stats = engine.stats();
    let store_stats = store.stats();
    info!(
        total_predictions = engine_stats.total_predictions,
        suspicious_predictions = engine_stats.suspicious_predictions,
        model_reloads = store_stats.reloads,
        failed_reloads = store_stats.failed_reloads,
        "Shutting down"
    );
    Ok(())
}
