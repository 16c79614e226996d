//! Hot-swappable holder of the active classifier
//!
//! Readers clone the current `Arc<ClassifierState>` under a short read lock
//! and compute on that snapshot. Writers build a complete new state off-lock
//! and swap the reference, so a reader sees either the old or the new
//! classifier, never a mix.

use super::artifact::{ModelArtifact, ModelMetadata};
use super::state::ClassifierState;
use super::threshold::{is_valid_threshold, resolve_threshold};
use crate::config::EngineConfig;
use crate::error::{PredictorError, PredictorResult};
use crate::models::ThresholdSource;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Process-wide classifier store
pub struct ModelStore {
    model_path: PathBuf,
    metadata_path: PathBuf,
    configured_threshold: Option<f64>,
    active: RwLock<Option<Arc<ClassifierState>>>,
    // serializes writers so metadata read-modify-write and swaps never interleave
    writer: Mutex<()>,
    reload_count: AtomicU64,
    failed_reload_count: AtomicU64,
}

impl ModelStore {
    /// Create an empty store; predictions fail with `ModelUnavailable` until a load
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            model_path: config.model_path.clone(),
            metadata_path: config.metadata_path.clone(),
            configured_threshold: config.threshold,
            active: RwLock::new(None),
            writer: Mutex::new(()),
            reload_count: AtomicU64::new(0),
            failed_reload_count: AtomicU64::new(0),
        }
    }

    /// Create a store and try to load the artifact; a failed load leaves it empty
    pub fn open(config: &EngineConfig) -> Self {
        let store = Self::new(config);
        match store.reload() {
            Ok(state) => debug!(version = %state.version(), "Classifier loaded at startup"),
            Err(PredictorError::ModelUnavailable) => {
                warn!(
                    path = %store.model_path.display(),
                    "No model artifact found, predictions unavailable until one is loaded"
                );
            }
            Err(e) => warn!(error = %e, "Failed to load model artifact at startup"),
        }
        store
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Current snapshot of the classifier
    pub fn snapshot(&self) -> PredictorResult<Arc<ClassifierState>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(PredictorError::ModelUnavailable)
    }

    pub fn is_loaded(&self) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Re-read artifact and metadata from disk and swap them in.
    ///
    /// On failure the previously active classifier stays in place.
    pub fn reload(&self) -> PredictorResult<Arc<ClassifierState>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let result = ModelArtifact::read(&self.model_path).and_then(|(artifact, checksum)| {
            let metadata = ModelMetadata::read_optional(&self.metadata_path);
            ClassifierState::from_artifact(
                artifact,
                metadata.as_ref(),
                checksum,
                self.configured_threshold,
            )
        });

        match result {
            Ok(state) => {
                let state = self.swap(state);
                self.reload_count.fetch_add(1, Ordering::Relaxed);
                info!(
                    version = %state.version(),
                    checksum = %state.checksum(),
                    threshold = state.threshold(),
                    threshold_source = %state.threshold_source(),
                    "Classifier loaded"
                );
                Ok(state)
            }
            Err(e) => {
                self.failed_reload_count.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// [`Self::reload`] on the blocking pool, for callers on an async runtime
    pub async fn reload_async(self: &Arc<Self>) -> PredictorResult<Arc<ClassifierState>> {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.reload()).await?
    }

    /// Swap in a state produced elsewhere (e.g. by an in-process training run).
    ///
    /// The decision threshold is resolved the same way as for a state read
    /// from disk: configured threshold, then metadata, then the default.
    pub fn install(&self, state: ClassifierState) -> Arc<ClassifierState> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let metadata = ModelMetadata::read_optional(&self.metadata_path);
        let (threshold, source) = resolve_threshold(self.configured_threshold, metadata.as_ref());
        let state = self.swap(state.retarget(threshold, source));
        self.reload_count.fetch_add(1, Ordering::Relaxed);
        debug!(
            version = %state.version(),
            threshold = threshold,
            threshold_source = %source,
            "Classifier installed"
        );
        state
    }

    fn swap(&self, state: ClassifierState) -> Arc<ClassifierState> {
        let state = Arc::new(state);
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *active = Some(Arc::clone(&state));
        state
    }

    /// Effective threshold and its source, even when no model is loaded
    pub fn threshold(&self) -> (f64, ThresholdSource) {
        match self.snapshot() {
            Ok(state) => (state.threshold(), state.threshold_source()),
            Err(_) => {
                let metadata = ModelMetadata::read_optional(&self.metadata_path);
                resolve_threshold(self.configured_threshold, metadata.as_ref())
            }
        }
    }

    /// Persist an admin-chosen threshold in the metadata file and apply it.
    ///
    /// Returns the effective threshold, which may still be the configured
    /// one when a process-level threshold takes precedence.
    pub fn set_user_threshold(&self, threshold: f64) -> PredictorResult<(f64, ThresholdSource)> {
        if !is_valid_threshold(threshold) {
            return Err(PredictorError::Validation(
                "Threshold must be between 0 and 1.".to_string(),
            ));
        }

        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        // only the user threshold keys change; training keys are written back as read
        let mut metadata = ModelMetadata::read_optional(&self.metadata_path).unwrap_or_default();
        metadata.set_user_threshold(threshold, chrono::Utc::now());
        metadata.write(&self.metadata_path)?;

        let (effective, source) = resolve_threshold(self.configured_threshold, Some(&metadata));

        let current = self
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(current) = current {
            self.swap(current.retarget(effective, source));
        }

        info!(
            requested = threshold,
            effective = effective,
            source = %source,
            "User threshold stored"
        );
        Ok((effective, source))
    }

    /// [`Self::set_user_threshold`] on the blocking pool
    pub async fn set_user_threshold_async(
        self: &Arc<Self>,
        threshold: f64,
    ) -> PredictorResult<(f64, ThresholdSource)> {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.set_user_threshold(threshold)).await?
    }

    pub fn stats(&self) -> StoreStats {
        let current = self.snapshot().ok();
        StoreStats {
            model_version: current.as_ref().map(|s| s.version().to_string()),
            loaded_at: current.as_ref().map(|s| s.loaded_at()),
            reloads: self.reload_count.load(Ordering::Relaxed),
            failed_reloads: self.failed_reload_count.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub model_version: Option<String>,
    pub loaded_at: Option<i64>,
    pub reloads: u64,
    pub failed_reloads: u64,
}
