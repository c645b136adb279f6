//! Classifier traits and common types

use async_trait::async_trait;
use candle_core::{Device, Tensor};
use pneumoscan_core::{Prediction, Result};

/// A model that maps one preprocessed input tensor to one scalar
pub trait InferenceModel: Send + Sync {
    /// Run the forward pass on a `[1, 150, 150, 1]` tensor and return the
    /// single output value
    fn forward(&self, input: &Tensor) -> Result<f32>;

    /// Get the model name
    fn name(&self) -> &str;

    /// Device input tensors must be created on
    fn device(&self) -> &Device;
}

/// Trait for image classifiers
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify an encoded image
    async fn classify(&self, image: &[u8]) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Result of classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Interpreted model output
    pub prediction: Prediction,

    /// Model name or version
    pub model: String,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create a new classification result
    pub fn new(prediction: Prediction, model: impl Into<String>) -> Self {
        Self {
            prediction,
            model: model.into(),
            latency_us: 0,
        }
    }
}
