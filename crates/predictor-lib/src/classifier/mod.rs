//! Classifier artifacts, immutable snapshots and the hot-swappable store

mod artifact;
mod state;
mod store;
mod threshold;
mod watcher;


pub use artifact::{compute_checksum, ArtifactFeature, ModelArtifact, ModelMetadata};
pub use state::{ClassifierState, FeatureTerm};
pub use store::{ModelStore, StoreStats};
pub use threshold::{is_valid_threshold, resolve_threshold, DEFAULT_THRESHOLD};
pub use watcher::{ArtifactWatcher, WatcherHandle, DEFAULT_DEBOUNCE};

#[cfg(test)]
pub(crate) use state::fixtures;
