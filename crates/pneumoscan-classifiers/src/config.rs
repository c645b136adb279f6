//! Configuration for the classifier model and device

use crate::model_loader::{
    DeviceType, ModelConfig, ModelSource, DEFAULT_DESCRIPTION_FILE, DEFAULT_MODEL_DIR,
    DEFAULT_WEIGHTS_FILE,
};
use pneumoscan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the X-ray classifier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Where to load the model from
    #[serde(default)]
    pub model: ModelConfigSpec,

    /// Device to run inference on
    #[serde(default)]
    pub device: DeviceSpec,
}

/// Model configuration specification (for YAML/config files)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfigSpec {
    /// Model source specification
    #[serde(flatten)]
    pub source: ModelSourceSpec,

    /// Description filename inside the source
    #[serde(default = "default_description")]
    pub description: String,

    /// Weights filename inside the source
    #[serde(default = "default_weights")]
    pub weights: String,
}

/// Model source specification (for config files)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSourceSpec {
    /// Local directory
    Local { path: PathBuf },

    /// Hugging Face Hub
    HuggingFace {
        repo_id: String,
        revision: Option<String>,
    },
}

/// Device specification (for config files)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda {
        index: Option<usize>,
    },
    Metal {
        index: Option<usize>,
    },
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION_FILE.to_string()
}

fn default_weights() -> String {
    DEFAULT_WEIGHTS_FILE.to_string()
}

impl Default for ModelConfigSpec {
    fn default() -> Self {
        Self {
            source: ModelSourceSpec::Local {
                path: PathBuf::from(DEFAULT_MODEL_DIR),
            },
            description: default_description(),
            weights: default_weights(),
        }
    }
}

impl ClassifierConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Invalid classifier config: {}", e)))
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Point the model source at a local directory
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model.source = ModelSourceSpec::Local { path: dir.into() };
        self
    }

    /// Convert to ModelConfig for loading
    pub fn to_model_config(&self) -> ModelConfig {
        let source = match &self.model.source {
            ModelSourceSpec::Local { path } => ModelSource::LocalDir(path.clone()),
            ModelSourceSpec::HuggingFace { repo_id, revision } => ModelSource::HuggingFace {
                repo_id: repo_id.clone(),
                revision: revision.clone(),
            },
        };

        ModelConfig {
            source,
            description_file: self.model.description.clone(),
            weights_file: self.model.weights.clone(),
            device: self.device.to_device_type(),
        }
    }
}

impl DeviceSpec {
    /// Convert to DeviceType
    pub fn to_device_type(&self) -> DeviceType {
        match self {
            DeviceSpec::Cpu => DeviceType::Cpu,
            DeviceSpec::Cuda { index } => DeviceType::Cuda(index.unwrap_or(0)),
            DeviceSpec::Metal { index } => DeviceType::Metal(index.unwrap_or(0)),
        }
    }
}
