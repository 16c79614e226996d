//! HTTP service for student pass/fail prediction
//!
//! Exposes the prediction engine, model management and threshold settings
//! over HTTP together with health probes and Prometheus metrics.

pub mod api;
pub mod config;
pub mod error;
