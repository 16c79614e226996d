//! Filesystem watcher that reloads the classifier when a retrained
//! artifact or updated metadata lands on disk

use super::state::ClassifierState;
use super::store::ModelStore;
use crate::error::{PredictorError, PredictorResult};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Quiet period after the last event before reloading
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches the artifact directory and swaps the classifier on change
pub struct ArtifactWatcher {
    store: Arc<ModelStore>,
    debounce: Duration,
}

impl ArtifactWatcher {
    pub fn new(store: Arc<ModelStore>) -> Self {
        Self {
            store,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. `on_reload` receives the outcome of every reload.
    ///
    /// Returns a handle that stops watching when dropped.
    pub fn start<F>(self, on_reload: F) -> PredictorResult<WatcherHandle>
    where
        F: Fn(&PredictorResult<Arc<ClassifierState>>) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            notify::Config::default(),
        )
        .map_err(watch_error)?;

        let mut dirs: Vec<PathBuf> = vec![
            watch_dir(self.store.model_path()),
            watch_dir(self.store.metadata_path()),
        ];
        dirs.dedup();
        for dir in &dirs {
            std::fs::create_dir_all(dir)?;
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(watch_error)?;
            info!(path = %dir.display(), "Watching model artifact directory");
        }

        let names: Vec<OsString> = [self.store.model_path(), self.store.metadata_path()]
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
            .collect();
        let store = self.store;
        let debounce = self.debounce;

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if !is_relevant(&event, &names) {
                    continue;
                }
                // coalesce the burst of events a single write produces
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(_)) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }
                debug!("Model artifacts changed, reloading");
                let outcome = store.reload_async().await;
                if let Err(e) = &outcome {
                    warn!(error = %e, "Reload after artifact change failed, keeping previous model");
                }
                on_reload(&outcome);
            }
            debug!("Artifact watcher channel closed");
        });

        Ok(WatcherHandle {
            _watcher: watcher,
            task,
        })
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn is_relevant(event: &Event, names: &[OsString]) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .filter_map(|p| p.file_name())
            .any(|n| names.iter().any(|name| name == n))
}

fn watch_error(e: notify::Error) -> PredictorError {
    PredictorError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("Failed to watch model artifacts: {}", e),
    ))
}

/// Handle to a running watcher
/// Stops watching when dropped
pub struct WatcherHandle {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RemoveKind};

    fn names() -> Vec<OsString> {
        vec![OsString::from("model.json"), OsString::from("metadata.json")]
    }

    #[test]
    fn test_relevant_event_for_artifact() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/models/model.json"));
        assert!(is_relevant(&event, &names()));
    }

    #[test]
    fn test_temp_file_and_remove_ignored() {
        let temp = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/models/model.tmp"));
        assert!(!is_relevant(&temp, &names()));

        let removed = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/models/model.json"));
        assert!(!is_relevant(&removed, &names()));
    }

    #[test]
    fn test_watch_dir_of_bare_file_name() {
        assert_eq!(watch_dir(Path::new("model.json")), PathBuf::from("."));
        assert_eq!(watch_dir(Path::new("/srv/models/model.json")), PathBuf::from("/srv/models"));
    }
}
