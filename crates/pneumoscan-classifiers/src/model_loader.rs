//! Model loading and management for Candle-based X-ray classifiers

use crate::classifier::InferenceModel;
use crate::model_config::ModelDescription;
use crate::network::SequentialNetwork;
use candle_core::{DType, Device, Tensor};
use candle_nn::{Module, VarBuilder};
use hf_hub::{api::sync::Api, Repo, RepoType};
use pneumoscan_core::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Default directory holding `model.json` and `model.safetensors`
pub const DEFAULT_MODEL_DIR: &str = "./model";

/// Default model description filename
pub const DEFAULT_DESCRIPTION_FILE: &str = "model.json";

/// Default weights filename
pub const DEFAULT_WEIGHTS_FILE: &str = "model.safetensors";

/// Configuration for loading Candle models
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Source of the model
    pub source: ModelSource,

    /// Description filename inside the source
    pub description_file: String,

    /// Weights filename inside the source
    pub weights_file: String,

    /// Device to run inference on
    pub device: DeviceType,
}

/// Source location for the model artifact
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Directory on the local file system
    LocalDir(PathBuf),

    /// Download from Hugging Face Hub
    HuggingFace {
        repo_id: String,
        revision: Option<String>,
    },
}

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// CPU inference (always available)
    Cpu,
    /// CUDA GPU inference (if available)
    Cuda(usize), // GPU index
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::LocalDir(PathBuf::from(DEFAULT_MODEL_DIR)),
            description_file: DEFAULT_DESCRIPTION_FILE.to_string(),
            weights_file: DEFAULT_WEIGHTS_FILE.to_string(),
            device: DeviceType::Cpu,
        }
    }
}

impl ModelConfig {
    /// Create a new model configuration from a local directory
    pub fn from_local(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::LocalDir(dir.into()),
            ..Default::default()
        }
    }

    /// Create a new model configuration from Hugging Face
    pub fn from_hf(repo_id: impl Into<String>) -> Self {
        Self {
            source: ModelSource::HuggingFace {
                repo_id: repo_id.into(),
                revision: None,
            },
            ..Default::default()
        }
    }

    /// Set device
    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    /// Set description and weights filenames
    pub fn with_files(mut self, description: impl Into<String>, weights: impl Into<String>) -> Self {
        self.description_file = description.into();
        self.weights_file = weights.into();
        self
    }

    /// Set Hugging Face revision
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        if let ModelSource::HuggingFace { repo_id, .. } = self.source {
            self.source = ModelSource::HuggingFace {
                repo_id,
                revision: Some(revision.into()),
            };
        }
        self
    }
}

/// Load state of the model, as seen by the rest of the app.
///
/// `Loading` moves to exactly one of the two terminal states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Loading,
    Ready,
    Failed(String),
}

impl ModelStatus {
    /// Whether classification may run
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether the status can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    /// Lowercase name for views and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Loaded Candle model with its network and metadata
pub struct LoadedModel {
    /// Network with weights bound
    network: SequentialNetwork,

    /// Device the model is on
    device: Device,

    /// Parsed model description
    description: ModelDescription,

}

impl LoadedModel {
    /// Load a model from configuration
    pub fn load(config: ModelConfig) -> Result<Self> {
        let (description_path, weights_path) = Self::resolve_model_files(&config)?;

        let description = ModelDescription::from_file(&description_path)?;

        let device = Self::create_device(config.device)?;

        let var_builder = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, &device)
                .map_err(|e| Error::model(format!("Failed to load SafeTensors: {}", e)))?
        };

        let network = SequentialNetwork::load(&description, var_builder)?;

        tracing::info!(
            "Loaded model '{}' v{} ({} layers) from {}",
            description.name,
            description.version,
            network.num_layers(),
            weights_path.display()
        );

        Ok(Self {
            network,
            device,
            description,
        })
    }

    /// Resolve description and weights paths from source
    fn resolve_model_files(config: &ModelConfig) -> Result<(PathBuf, PathBuf)> {
        match &config.source {
            ModelSource::LocalDir(dir) => {
                let description = dir.join(&config.description_file);
                let weights = dir.join(&config.weights_file);
                for path in [&description, &weights] {
                    if !path.exists() {
                        return Err(Error::model(format!(
                            "Model file not found: {}",
                            path.display()
                        )));
                    }
                }
                Ok((description, weights))
            }
            ModelSource::HuggingFace { repo_id, revision } => {
                tracing::info!("Downloading model from Hugging Face: {}", repo_id);

                let api = Api::new()
                    .map_err(|e| Error::model(format!("Failed to initialize HF API: {}", e)))?;

                let repo = api.repo(Repo::with_revision(
                    repo_id.clone(),
                    RepoType::Model,
                    revision.clone().unwrap_or_else(|| "main".to_string()),
                ));

                let fetch = |filename: &str| {
                    repo.get(filename).map_err(|e| {
                        Error::model(format!("Failed to download {} from HF: {}", filename, e))
                    })
                };

                let description = fetch(&config.description_file)?;
                let weights = fetch(&config.weights_file)?;
                Ok((description, weights))
            }
        }
    }

    /// Create Candle device from device type
    fn create_device(device_type: DeviceType) -> Result<Device> {
        match device_type {
            DeviceType::Cpu => Ok(Device::Cpu),
            DeviceType::Cuda(idx) => Device::new_cuda(idx)
                .map_err(|e| Error::model(format!("Failed to create CUDA device: {}", e))),
            DeviceType::Metal(idx) => Device::new_metal(idx)
                .map_err(|e| Error::model(format!("Failed to create Metal device: {}", e))),
        }
    }

    /// Get model description
    pub fn description(&self) -> &ModelDescription {
        &self.description
    }
}

impl InferenceModel for LoadedModel {
    fn forward(&self, input: &Tensor) -> Result<f32> {
        let [height, width, channels] = self.network.input_shape();
        let expected = [1, height, width, channels];
        if input.dims() != expected.as_slice() {
            return Err(Error::inference(format!(
                "Expected input shape {:?}, got {:?}",
                expected,
                input.dims()
            )));
        }

        let output = self
            .network
            .forward(input)
            .map_err(|e| Error::inference(format!("Model forward pass failed: {}", e)))?;

        let values = output
            .flatten_all()
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| Error::inference(format!("Failed to read model output: {}", e)))?;

        match values.as_slice() {
            [value] => Ok(*value),
            other => Err(Error::inference(format!(
                "Expected a single output value, got {}",
                other.len()
            ))),
        }
    }

    fn name(&self) -> &str {
        &self.description.name
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

/// Load a model without blocking the async runtime.
///
/// Reading and memory-mapping weights happens on the blocking pool; the
/// returned handle is shared read-only for the rest of the process.
pub async fn load_model_async(config: ModelConfig) -> Result<Arc<LoadedModel>> {
    tracing::info!("Starting model loading...");

    let result = tokio::task::spawn_blocking(move || LoadedModel::load(config))
        .await
        .map_err(|e| Error::internal(format!("Model loading task failed: {}", e)))?;

    match result {
        Ok(model) => {
            tracing::info!("Model loaded successfully: {}", model.name());
            Ok(Arc::new(model))
        }
        Err(e) => {
            tracing::error!("Failed to load model: {}", e);
            Err(e)
        }
    }
}
