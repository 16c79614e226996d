//! HTTP API for predictions, model management, health checks and Prometheus metrics

use crate::error::{ApiError, ApiResult};
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use predictor_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::{EngineMetrics, StructuredLogger},
    BatchItem, BatchPrediction, ClassifierState, FeatureInput, ModelExplanation,
    PredictionEngine, PredictionResult, ThresholdSource,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PredictionEngine>,
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
    pub logger: StructuredLogger,
    admin_token: String,
}

impl AppState {
    pub fn new(
        engine: Arc<PredictionEngine>,
        health_registry: HealthRegistry,
        metrics: EngineMetrics,
        logger: StructuredLogger,
        admin_token: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            health_registry,
            metrics,
            logger,
            admin_token: admin_token.into(),
        }
    }

    /// Reflect a load attempt in health, metrics and logs.
    ///
    /// Used for the startup load, `/api/model/reload` and the artifact watcher.
    pub async fn record_reload(&self, outcome: Result<Arc<ClassifierState>, String>) {
        match outcome {
            Ok(state) => {
                self.metrics.inc_model_reloads();
                self.metrics.set_model_version(state.version());
                self.metrics.set_threshold(state.threshold());
                self.logger
                    .log_model_loaded(state.version(), state.checksum(), state.threshold());
                self.health_registry.model_loaded(state.version()).await;
            }
            Err(error) => {
                self.metrics.inc_model_reload_failures();
                self.logger.log_model_load_failed(&error);
                self.health_registry.model_load_failed(&error).await;
            }
        }
    }

    fn require_admin(&self, headers: &HeaderMap) -> ApiResult<()> {
        let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
        if self.admin_token.is_empty() || token != self.admin_token {
            warn!("Rejected admin request with invalid token");
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }
}

/// Extract bearer token from Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(flatten)]
    pub features: FeatureInput,
    #[serde(default)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub count: usize,
    pub results: Vec<BatchPrediction>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub model_version: String,
    pub checksum: String,
    pub threshold: f64,
    pub threshold_source: ThresholdSource,
    pub loaded_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThresholdRequest {
    pub threshold: f64,
}

#[derive(Debug, Serialize)]
pub struct ThresholdResponse {
    pub threshold: f64,
    pub source: ThresholdSource,
}

/// Plain liveness check
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // still serving
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once a model is loaded, 503 before
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
async fn metrics() -> ApiResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Json<PredictionResult>> {
    let result = match state.engine.predict(&request.features, request.threshold) {
        Ok(result) => {
            state.health_registry.record_prediction_success().await;
            result
        }
        Err(e) => {
            if e.is_internal() {
                warn!(error = %e, "Prediction failed");
                state.health_registry.record_prediction_failure(&e.to_string()).await;
            }
            return Err(e.into());
        }
    };

    if result.suspicious_input {
        state.logger.log_suspicious_input(&result.suspicious_reasons);
    }
    state.logger.log_prediction(
        &result.model_version,
        result.probability,
        result.predicted_label,
        result.threshold_used,
        result.suspicious_input,
        result.feedback.len(),
    );

    Ok(Json(result))
}

async fn predict_batch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<BatchRequest>,
) -> ApiResult<Json<BatchResponse>> {
    state.require_admin(&headers)?;

    if !request.items.iter().any(|item| item.features.is_complete()) {
        return Err(ApiError::Validation(
            "No items with complete attendance, marks and internal_score".to_string(),
        ));
    }

    let results = state.engine.predict_batch(&request.items, request.threshold)?;
    info!(
        items = request.items.len(),
        failed = results.iter().filter(|r| r.error.is_some()).count(),
        "Batch prediction completed"
    );

    Ok(Json(BatchResponse {
        count: results.len(),
        results,
    }))
}

async fn explain_model(State(state): State<Arc<AppState>>) -> ApiResult<Json<ModelExplanation>> {
    Ok(Json(state.engine.explain_model()?))
}

async fn reload_model(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<ReloadResponse>> {
    state.require_admin(&headers)?;

    match state.engine.store().reload_async().await {
        Ok(loaded) => {
            state.record_reload(Ok(Arc::clone(&loaded))).await;
            Ok(Json(ReloadResponse {
                model_version: loaded.version().to_string(),
                checksum: loaded.checksum().to_string(),
                threshold: loaded.threshold(),
                threshold_source: loaded.threshold_source(),
                loaded_at: loaded.loaded_at(),
            }))
        }
        Err(e) => {
            state.record_reload(Err(e.to_string())).await;
            Err(e.into())
        }
    }
}

async fn get_threshold(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<ThresholdResponse>> {
    state.require_admin(&headers)?;
    let (threshold, source) = state.engine.store().threshold();
    Ok(Json(ThresholdResponse { threshold, source }))
}

async fn set_threshold(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ThresholdRequest>,
) -> ApiResult<Json<ThresholdResponse>> {
    state.require_admin(&headers)?;

    let (threshold, source) = state
        .engine
        .store()
        .set_user_threshold_async(request.threshold)
        .await?;
    state.metrics.set_threshold(threshold);
    state
        .logger
        .log_threshold_update(request.threshold, threshold, source.as_str());

    Ok(Json(ThresholdResponse { threshold, source }))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/predict", post(predict))
        .route("/api/predict_batch", post(predict_batch))
        .route("/api/model/explain", get(explain_model))
        .route("/api/model/reload", post(reload_model))
        .route(
            "/api/settings/threshold",
            get(get_threshold).post(set_threshold),
        )
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(bearer_token(&headers), Some("s3cret"));
    }
}
