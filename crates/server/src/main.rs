//! Diagnosis server - real-time thyroid diagnosis relay
//!
//! Serves the diagnosis page, accepts WebSocket sessions and runs one
//! classifier process per submitted feature vector.

use anyhow::Result;
use diagnosis_lib::{
    classifier::ProcessInvoker,
    health::{check_classifier, components, HealthRegistry},
    observability::{DiagnosisMetrics, StructuredLogger},
    DiagnosisCoordinator, SessionChannel, SessionRegistry,
};
use diagnosis_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting diagnosis-server");

    let config = ServerConfig::load()?;
    info!(node_name = %config.node_name, addr = %config.listen_addr(), "Server configured");

    let classifier_config = config.classifier();

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SESSION_CHANNEL).await;
    let classifier_health = check_classifier(&classifier_config);
    if let Some(message) = &classifier_health.message {
        warn!(message = %message, "Classifier prerequisites missing");
    }
    health_registry
        .update(components::CLASSIFIER, classifier_health)
        .await;

    let metrics = DiagnosisMetrics::new();
    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(
        SERVER_VERSION,
        &classifier_config.executable.display().to_string(),
        &classifier_config.model_dir.display().to_string(),
    );

    // One registry for the process lifetime, torn down on shutdown
    let registry = SessionRegistry::new();
    let coordinator = DiagnosisCoordinator::new(Arc::new(ProcessInvoker::new(classifier_config)))
        .with_timeout(config.invocation_timeout())
        .with_health(health_registry.clone())
        .with_logger(logger.clone());
    let channel = SessionChannel::new(registry.clone(), coordinator, logger.clone());

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        channel,
    ));

    health_registry.set_ready(true).await;

    let shutdown_registry = registry.clone();
    let shutdown_logger = logger.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        shutdown_logger.log_shutdown("SIGINT received");
        shutdown_registry.shutdown();
    };

    api::serve(&config.listen_addr(), app_state, shutdown).await?;

    info!("Shut down");
    Ok(())
}
