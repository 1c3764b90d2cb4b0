//! Configuration file for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
const DEFAULT_CLASSIFIER: &str = "../neuralnet";
const DEFAULT_MODEL_DIR: &str = "../thyroidologist";

/// CLI configuration, read from `~/.config/dxctl/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub server_url: Option<String>,
    pub classifier_path: Option<String>,
    pub model_dir: Option<String>,
}

impl Config {
    /// Load configuration from the default location; a missing file is empty config
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("dxctl").join("config.json"))
    }

    pub fn server_url(&self) -> String {
        self.server_url
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn classifier_path(&self) -> String {
        self.classifier_path
            .clone()
            .unwrap_or_else(|| DEFAULT_CLASSIFIER.to_string())
    }

    pub fn model_dir(&self) -> String {
        self.model_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL_DIR.to_string())
    }
}
