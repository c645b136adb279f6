//! Application configuration

use pneumoscan_classifiers::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Top-level configuration file (`pneumoscan.yaml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model source and device
    #[serde(flatten)]
    pub classifier: ClassifierConfig,

    /// Local web server
    #[serde(default)]
    pub server: ServerConfig,
}

/// Values given on the command line, applied over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model_dir: Option<PathBuf>,
    pub address: Option<String>,
    pub port: Option<u16>,
}

impl AppConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: impl AsRef<Path>, overrides: &ConfigOverrides) -> anyhow::Result<Self> {
        let config_path = config_path.as_ref();

        // Try to load from file, or use defaults
        let mut config: Self = if config_path.exists() {
            info!("Loading configuration from {}", config_path.display());
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            debug!(
                "No configuration file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        if let Some(dir) = &overrides.model_dir {
            config.classifier = config.classifier.with_model_dir(dir.clone());
        }

        if let Some(address) = &overrides.address {
            config.server.address = address.clone();
        }

        if let Some(port) = overrides.port {
            config.server.port = port;
        }

        Ok(config)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted image upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.address, self.port).parse()?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}
