//! Valuation agent - property price estimation service
//!
//! Loads the preprocessing artifacts and the pricing model, then serves
//! valuations alongside health and metrics endpoints.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use valuation_agent::{api, config::AgentConfig};
use valuation_lib::{
    artifacts::ConfigLoader, predictor::InferenceRunner, HealthRegistry, StructuredLogger,
    ValuationMetrics, ValuationService,
};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting valuation-agent");

    let config = AgentConfig::load()?;
    info!(
        instance = %config.instance_name,
        artifacts = %config.artifact_location,
        model = %config.model_location,
        adjustments = config.adjustments_url.is_some(),
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register_pipeline().await;

    let metrics = ValuationMetrics::new();

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(AGENT_VERSION);

    let service = ValuationService::new(
        ConfigLoader::new(config.artifact_source().context("Invalid artifact location")?),
        InferenceRunner::new(Arc::new(config.model_loader())),
        config
            .adjustment_source()
            .context("Invalid adjustment settings URL")?,
    )
    .with_health(health_registry.clone())
    .with_logger(logger.clone());
    let service = Arc::new(service);

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        service.clone(),
    ));

    // Serve health while the pipeline loads; readiness flips after warm-up
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));
    let warm_up_handle = tokio::spawn(warm_up(
        service,
        health_registry,
        Duration::from_secs(config.warm_up_retry_secs.max(1)),
    ));

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
            Ok(())
        }
        served = &mut api_handle => {
            logger.log_shutdown("API server stopped");
            served.context("API server task panicked")?
        }
    };

    warm_up_handle.abort();
    info!("Shutting down");
    result
}

/// Load artifacts and model, retrying until the pipeline is usable
async fn warm_up(service: Arc<ValuationService>, health: HealthRegistry, retry: Duration) {
    let mut interval = tokio::time::interval(retry);

    loop {
        interval.tick().await;

        match service.warm_up().await {
            Ok(()) => {
                health.set_ready(true).await;
                info!(
                    model_version = %service.model_version().unwrap_or_default(),
                    "Valuation pipeline ready"
                );
                return;
            }
            // Failed loads are not cached, so the next attempt starts over
            Err(e) => {
                warn!(
                    error = %e,
                    kind = e.kind(),
                    retry_secs = retry.as_secs(),
                    "Warm-up failed, retrying"
                );
            }
        }
    }
}
