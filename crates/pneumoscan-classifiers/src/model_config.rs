//! Model description format
//!
//! A model artifact is a directory holding a JSON description of a
//! sequential layer graph (`model.json`) and its weights
//! (`model.safetensors`). The description names every weighted layer so the
//! loader can find its tensors under `<name>.weight`, `<name>.bias`, etc.

use pneumoscan_core::{Error, Result, INPUT_CHANNELS, INPUT_HEIGHT, INPUT_WIDTH};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Description of a sequential image classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescription {
    /// Model name
    #[serde(default = "default_name")]
    pub name: String,

    /// Model version
    #[serde(default = "default_version")]
    pub version: String,

    /// Input shape without the batch dimension: `[height, width, channels]`
    pub input_shape: [usize; 3],

    /// Layers applied in order
    pub layers: Vec<LayerSpec>,
}

fn default_name() -> String {
    "pneumonia-cnn".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

/// A single layer of the sequential graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    /// 2D convolution
    Conv2d {
        name: String,
        filters: usize,
        kernel_size: usize,
        #[serde(default = "default_stride")]
        strides: usize,
        #[serde(default)]
        padding: Padding,
        #[serde(default)]
        activation: Activation,
    },

    /// 2D max pooling
    MaxPool2d {
        pool_size: usize,
        /// Defaults to `pool_size`
        #[serde(default)]
        strides: Option<usize>,
    },

    /// Batch normalization over channels (inference statistics)
    BatchNorm {
        name: String,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },

    /// Flatten to `[batch, features]` in channels-last order
    Flatten,

    /// Fully connected layer
    Dense {
        name: String,
        units: usize,
        #[serde(default)]
        activation: Activation,
    },

    /// Dropout, identity at inference time
    Dropout {
        #[serde(default)]
        rate: f32,
    },
}

fn default_stride() -> usize {
    1
}

fn default_epsilon() -> f64 {
    1e-3
}

/// Convolution padding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    #[default]
    Valid,
    Same,
}

/// Element-wise activation applied after a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
}

impl LayerSpec {
    /// Short kind name for logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Conv2d { .. } => "conv2d",
            Self::MaxPool2d { .. } => "max_pool2d",
            Self::BatchNorm { .. } => "batch_norm",
            Self::Flatten => "flatten",
            Self::Dense { .. } => "dense",
            Self::Dropout { .. } => "dropout",
        }
    }
}

impl ModelDescription {
    /// Parse a description from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let description: ModelDescription = serde_json::from_str(json)?;
        description.validate()?;
        Ok(description)
    }

    /// Load a description from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::model(format!(
                "Failed to read model description {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Check the parts of the description that don't depend on weights
    pub fn validate(&self) -> Result<()> {
        let expected = [INPUT_HEIGHT, INPUT_WIDTH, INPUT_CHANNELS];
        if self.input_shape != expected {
            return Err(Error::model(format!(
                "Model input shape {:?} does not match expected {:?}",
                self.input_shape, expected
            )));
        }

        if self.layers.is_empty() {
            return Err(Error::model("Model description has no layers"));
        }

        for layer in &self.layers {
            match layer {
                LayerSpec::Conv2d {
                    name,
                    filters,
                    kernel_size,
                    strides,
                    padding,
                    ..
                } => {
                    if *filters == 0 || *kernel_size == 0 || *strides == 0 {
                        return Err(Error::model(format!(
                            "conv2d '{}' must have non-zero filters, kernel_size and strides",
                            name
                        )));
                    }
                    if *padding == Padding::Same && (*strides != 1 || kernel_size % 2 == 0) {
                        return Err(Error::model(format!(
                            "conv2d '{}': 'same' padding requires stride 1 and an odd kernel",
                            name
                        )));
                    }
                }
                LayerSpec::MaxPool2d { pool_size, strides } => {
                    if *pool_size == 0 || *strides == Some(0) {
                        return Err(Error::model(
                            "max_pool2d must have non-zero pool_size and strides",
                        ));
                    }
                }
                LayerSpec::Dense { name, units, .. } => {
                    if *units == 0 {
                        return Err(Error::model(format!("dense '{}' must have units > 0", name)));
                    }
                }
                LayerSpec::Dropout { rate } => {
                    if !(0.0..1.0).contains(rate) {
                        return Err(Error::model(format!(
                            "dropout rate {} must be in [0, 1)",
                            rate
                        )));
                    }
                }
                LayerSpec::BatchNorm { .. } | LayerSpec::Flatten => {}
            }
        }

        Ok(())
    }
}
