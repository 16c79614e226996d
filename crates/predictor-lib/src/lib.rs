//! Core library for the student performance predictor
//!
//! This crate provides the core functionality for:
//! - Loading and hot-swapping the trained pass/fail classifier
//! - Input validation, inference and per-request explanations
//! - Counterfactual feedback for students below the decision threshold
//! - Health checks and observability

pub mod classifier;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use classifier::{ArtifactWatcher, ClassifierState, ModelStore, WatcherHandle};
pub use config::EngineConfig;
pub use error::{PredictorError, PredictorResult};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use predictor::{EngineStats, PredictionEngine};
