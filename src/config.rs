use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub scaler_path: PathBuf,
    pub classifier_path: PathBuf,
    pub max_connections: u32,
    pub query_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:8000".to_string(),
            scaler_path: PathBuf::from("artifacts/scaler.json"),
            classifier_path: PathBuf::from("artifacts/classifier.json"),
            max_connections: 5,
            query_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Defaults, then the optional TOML file, then environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => AppConfig::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(path) = lookup("SCALER_PATH") {
            self.scaler_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CLASSIFIER_PATH") {
            self.classifier_path = PathBuf::from(path);
        }
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to the learner activity Postgres instance")
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }
}
