//! Serialized classifier artifact and training metadata
//!
//! The artifact carries the fitted logistic regression (per-feature weight
//! plus the standardization mean/scale) and the metadata file carries
//! thresholds and training statistics. Both are JSON written by the
//! training job.

use crate::error::{PredictorError, PredictorResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, warn};

/// One fitted model term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactFeature {
    pub name: String,
    pub weight: f64,
    pub mean: f64,
    pub scale: f64,
}

/// Fitted classifier as written by the training job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub features: Vec<ArtifactFeature>,
    pub bias: f64,
}

impl ModelArtifact {
    /// Read an artifact and return it together with the SHA256 of its bytes.
    ///
    /// A missing file means no model has been trained yet.
    pub fn read(path: &Path) -> PredictorResult<(Self, String)> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Model artifact not found");
                return Err(PredictorError::ModelUnavailable);
            }
            Err(e) => return Err(e.into()),
        };
        let checksum = compute_checksum(&bytes);
        let artifact: ModelArtifact = serde_json::from_slice(&bytes)
            .map_err(|e| PredictorError::InvalidArtifact(format!("{}: {}", path.display(), e)))?;
        Ok((artifact, checksum))
    }

    pub fn write(&self, path: &Path) -> PredictorResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)
    }
}

/// Training metadata stored next to the artifact.
///
/// Kept as a raw JSON object: the training job owns every key except the
/// user threshold pair, and values of unexpected types are ignored by the
/// accessors rather than rejecting the file. Writing back preserves every
/// key that was read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelMetadata(Map<String, Value>);

impl ModelMetadata {
    pub const RECOMMENDED_THRESHOLD: &'static str = "recommended_threshold";
    pub const USER_THRESHOLD: &'static str = "user_threshold";
    pub const USER_THRESHOLD_SET_AT: &'static str = "user_threshold_set_at";
    pub const CHECKSUM: &'static str = "checksum";

    pub fn new() -> Self {
        Self::default()
    }

    /// Read metadata if present.
    ///
    /// Unreadable metadata, or a document that is not a JSON object, is
    /// logged and treated as absent.
    pub fn read_optional(path: &Path) -> Option<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unable to read model metadata");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed model metadata, ignoring");
                None
            }
        }
    }

    pub fn write(&self, path: &Path) -> PredictorResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)
    }

    pub fn recommended_threshold(&self) -> Option<f64> {
        self.number(Self::RECOMMENDED_THRESHOLD)
    }

    pub fn user_threshold(&self) -> Option<f64> {
        self.number(Self::USER_THRESHOLD)
    }

    pub fn user_threshold_set_at(&self) -> Option<&str> {
        self.0.get(Self::USER_THRESHOLD_SET_AT).and_then(Value::as_str)
    }

    /// SHA256 hex of the artifact bytes
    pub fn checksum(&self) -> Option<&str> {
        self.0.get(Self::CHECKSUM).and_then(Value::as_str)
    }

    /// Record an admin-chosen threshold, leaving every other key untouched
    pub fn set_user_threshold(&mut self, threshold: f64, set_at: DateTime<Utc>) {
        self.0.insert(Self::USER_THRESHOLD.to_string(), Value::from(threshold));
        self.0.insert(
            Self::USER_THRESHOLD_SET_AT.to_string(),
            Value::from(set_at.to_rfc3339()),
        );
    }

    /// Builder-style insert of an arbitrary key
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    // integers count as numbers; strings, bools and nulls do not
    fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }
}

/// Write through a temp file and rename so readers never see a partial file
fn write_atomic(path: &Path, data: &[u8]) -> PredictorResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
