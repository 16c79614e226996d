//! Liveness and readiness state of the prediction service
//!
//! Two components are tracked. The model store reports whether a classifier
//! is loaded and whether the last reload succeeded; the predictor reports
//! predictions failing for reasons other than bad input. Readiness follows
//! the loaded model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive internal prediction failures before the predictor is unhealthy
pub const PREDICTOR_FAILURE_LIMIT: u32 = 3;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still serving, possibly from an older classifier
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn at(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::at(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::at(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::at(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst component status wins; no components means healthy
    pub fn compute_status(components: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub mod components {
    pub const MODEL_STORE: &str = "model_store";
    pub const PREDICTOR: &str = "predictor";
}

#[derive(Debug, Default)]
struct HealthState {
    components: BTreeMap<String, ComponentHealth>,
    model_version: Option<String>,
}

/// Shared health state, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
    prediction_failures: Arc<AtomicU32>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.set(name, ComponentHealth::healthy()).await;
    }

    async fn set(&self, name: &str, health: ComponentHealth) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), health);
    }

    /// A classifier is active: the store is healthy and the service ready
    pub async fn model_loaded(&self, version: &str) {
        let mut state = self.state.write().await;
        state.model_version = Some(version.to_string());
        state
            .components
            .insert(components::MODEL_STORE.to_string(), ComponentHealth::healthy());
    }

    /// A load attempt failed. The service stays ready while an earlier
    /// classifier keeps serving.
    pub async fn model_load_failed(&self, error: &str) {
        let mut state = self.state.write().await;
        let message = match &state.model_version {
            Some(version) => format!("Reload failed, serving {}: {}", version, error),
            None => format!("Model not loaded: {}", error),
        };
        state
            .components
            .insert(components::MODEL_STORE.to_string(), ComponentHealth::degraded(message));
    }

    /// Clears the predictor failure streak
    pub async fn record_prediction_success(&self) {
        if self.prediction_failures.swap(0, Ordering::Relaxed) > 0 {
            self.set(components::PREDICTOR, ComponentHealth::healthy()).await;
        }
    }

    /// Count a prediction that failed for a reason other than bad input
    pub async fn record_prediction_failure(&self, error: &str) {
        let failures = self.prediction_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let message = format!("{} consecutive prediction failures, last: {}", failures, error);
        let health = if failures >= PREDICTOR_FAILURE_LIMIT {
            ComponentHealth::unhealthy(message)
        } else {
            ComponentHealth::degraded(message)
        };
        self.set(components::PREDICTOR, health).await;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: HealthResponse::compute_status(&state.components),
            model_version: state.model_version.clone(),
            components: state.components.clone(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let unhealthy = state
            .components
            .iter()
            .find(|(_, c)| !c.status.is_operational())
            .map(|(name, _)| name.clone());

        let reason = match (&state.model_version, unhealthy) {
            (None, _) => Some("Model not loaded".to_string()),
            (Some(_), Some(name)) => Some(format!("Component {} unhealthy", name)),
            (Some(_), None) => None,
        };

        ReadinessResponse {
            ready: reason.is_none(),
            model_version: state.model_version.clone(),
            reason,
        }
    }
}
