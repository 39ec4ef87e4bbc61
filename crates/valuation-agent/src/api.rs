//! HTTP API for valuations, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use valuation_lib::{
    health::{ComponentStatus, HealthRegistry},
    PropertyDescription, Valuation, ValuationError, ValuationMetrics, ValuationOptions,
    ValuationService,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ValuationMetrics,
    pub service: Arc<ValuationService>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: ValuationMetrics,
        service: Arc<ValuationService>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            service,
        }
    }
}

/// Body of `POST /v1/valuations`
#[derive(Debug, Clone, Deserialize)]
pub struct ValuationRequest {
    pub property: PropertyDescription,
    #[serde(default)]
    pub skip_adjustments: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Pipeline error rendered as a JSON response
pub struct ApiError(pub ValuationError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            ValuationError::ConfigLoad { .. } | ValuationError::ModelUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ValuationError::NumericInstability(_) | ValuationError::InvalidInput(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ValuationError::AdjustmentConfigUnavailable(_) | ValuationError::Inference(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Value a single listing
async fn create_valuation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValuationRequest>,
) -> Result<Json<Valuation>, ApiError> {
    let options = ValuationOptions {
        skip_adjustments: request.skip_adjustments,
    };

    state
        .service
        .valuate(&request.property, options)
        .await
        .map(Json)
        .map_err(|e| {
            error!(kind = e.kind(), error = %e, "Valuation failed");
            ApiError(e)
        })
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once warmed up, 503 otherwise
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/valuations", post(create_valuation))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
