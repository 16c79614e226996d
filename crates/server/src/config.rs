//! Server configuration

use anyhow::{Context, Result};
use config::{builder::DefaultState, ConfigBuilder, Environment, File};
use predictor_lib::EngineConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to structured log records
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for the prediction, health and metrics API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    /// Decision threshold taking precedence over the metadata thresholds
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Bearer token for admin routes
    #[serde(default = "default_admin_token")]
    pub admin_token: String,

    #[serde(default = "default_explain_top_n")]
    pub explain_top_n: usize,

    #[serde(default = "default_comfort_margin")]
    pub comfort_margin: f64,

    #[serde(default)]
    pub include_infeasible: bool,

    /// Reload the classifier when the artifact files change
    #[serde(default = "default_watch_artifacts")]
    pub watch_artifacts: bool,

    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "student-predictor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/model.json")
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("models/metadata.json")
}

fn default_admin_token() -> String {
    "changeme".to_string()
}

fn default_explain_top_n() -> usize {
    predictor_lib::config::DEFAULT_EXPLAIN_TOP_N
}

fn default_comfort_margin() -> f64 {
    predictor_lib::config::DEFAULT_COMFORT_MARGIN
}

fn default_watch_artifacts() -> bool {
    true
}

fn default_watch_debounce_ms() -> u64 {
    250
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            model_path: default_model_path(),
            metadata_path: default_metadata_path(),
            threshold: None,
            admin_token: default_admin_token(),
            explain_top_n: default_explain_top_n(),
            comfort_margin: default_comfort_margin(),
            include_infeasible: false,
            watch_artifacts: default_watch_artifacts(),
            watch_debounce_ms: default_watch_debounce_ms(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `predictor.toml` and `PREDICTOR_*` env vars
    pub fn load() -> Result<Self> {
        Self::from_builder(
            config::Config::builder()
                .add_source(File::with_name("predictor").required(false))
                .add_source(Environment::with_prefix("PREDICTOR").try_parsing(true)),
        )
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder.build().context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Invalid server configuration")
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            model_path: self.model_path.clone(),
            metadata_path: self.metadata_path.clone(),
            threshold: self.threshold,
            explain_top_n: self.explain_top_n,
            comfort_margin: self.comfort_margin,
            include_infeasible: self.include_infeasible,
        }
    }

    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults_from_empty_source() {
        let config = ServerConfig::from_builder(config::Config::builder()).unwrap();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.model_path, PathBuf::from("models/model.json"));
        assert_eq!(config.admin_token, "changeme");
        assert_eq!(config.threshold, None);
        assert_eq!(config.explain_top_n, 3);
        assert!(config.watch_artifacts);
    }

    #[test]
    fn test_toml_overrides() {
        let toml = r#"
            api_port = 9000
            threshold = 0.55
            admin_token = "secret"
            model_path = "/srv/models/model.json"
            watch_artifacts = false
        "#;
        let config = ServerConfig::from_builder(
            config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
        .unwrap();
        assert_eq!(config.api_port, 9000);
        assert_eq!(config.admin_token, "secret");
        assert!(!config.watch_artifacts);

        let engine = config.to_engine_config();
        assert_eq!(engine.threshold, Some(0.55));
        assert_eq!(engine.model_path, PathBuf::from("/srv/models/model.json"));
        assert_eq!(engine.metadata_path, PathBuf::from("models/metadata.json"));
    }
}
