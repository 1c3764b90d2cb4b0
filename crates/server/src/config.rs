//! Server configuration

use anyhow::{ensure, Context, Result};
use diagnosis_lib::ClassifierConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "diagnosis-server";

/// Prefix of environment overrides, e.g. `DIAGNOSIS_PORT=8080`
pub const ENV_PREFIX: &str = "DIAGNOSIS";

/// Server configuration, loaded once at startup
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name reported in structured logs
    #[serde(default = "default_node_name")]
    pub node_name: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port for the page, WebSocket and probe endpoints
    #[serde(default = "default_port")]
    pub port: u16,

    /// Classifier executable
    #[serde(default = "default_classifier_path")]
    pub classifier_path: PathBuf,

    /// Extra arguments placed before the classifier's prediction flags
    #[serde(default)]
    pub classifier_args: Vec<String>,

    /// Directory of the pre-trained network passed as `--load-dir`
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Upper bound on one classifier invocation
    #[serde(default = "default_invocation_timeout")]
    pub invocation_timeout_secs: u64,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_classifier_path() -> PathBuf {
    PathBuf::from("../neuralnet")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("../thyroidologist")
}

fn default_invocation_timeout() -> u64 {
    30
}

impl ServerConfig {
    /// Load from `diagnosis-server.{toml,json,yaml}` (optional) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE), false)
    }

    /// Load from a specific file, then apply environment overrides
    pub fn load_from(file: &Path, required: bool) -> Result<Self> {
        let name = file.to_string_lossy();
        let config = config::Config::builder()
            .add_source(config::File::with_name(&name).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("classifier_args"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", name))?;

        let config: ServerConfig = config
            .try_deserialize()
            .context("Invalid server configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.invocation_timeout_secs > 0,
            "invocation_timeout_secs must be greater than zero"
        );
        ensure!(
            !self.classifier_path.as_os_str().is_empty(),
            "classifier_path must not be empty"
        );
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.invocation_timeout_secs)
    }

    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig::new(&self.classifier_path, &self.model_dir)
            .with_leading_args(self.classifier_args.iter().cloned())
    }
}
