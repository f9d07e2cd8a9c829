use crate::error::{Result, SpamhamError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub max_payload: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub frequency_path: PathBuf,
    pub vectorizer_path: PathBuf,
    pub classifier_path: PathBuf,
    /// Tokens need a document frequency strictly above this to be kept
    pub min_document_frequency: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_payload: 256 * 1024, // 256KB
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            frequency_path: PathBuf::from("models/doc_frequency.json"),
            vectorizer_path: PathBuf::from("models/vectorizer.json"),
            classifier_path: PathBuf::from("models/classifier.json"),
            min_document_frequency: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SpamhamError::Config(format!("{}: {}", path.as_ref().display(), e)))?;

        toml::from_str(&content).map_err(|e| SpamhamError::Config(e.to_string()))
    }

    /// Reads `path` when it exists, otherwise falls back to the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}
