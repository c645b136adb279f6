//! Single-image classification pipeline
//!
//! decode -> resize/normalize -> forward pass -> interpret scalar

use crate::classifier::{ClassificationResult, Classifier, InferenceModel};
use crate::preprocess::ImagePreprocessor;
use async_trait::async_trait;
use pneumoscan_core::{Error, Prediction, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Classifies one encoded X-ray image with a loaded model
#[derive(Clone)]
pub struct ClassificationPipeline {
    model: Arc<dyn InferenceModel>,
    preprocessor: ImagePreprocessor,
}

impl ClassificationPipeline {
    /// Create a pipeline around a ready model
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self {
            model,
            preprocessor: ImagePreprocessor::new(),
        }
    }

    /// The wrapped model
    pub fn model(&self) -> &Arc<dyn InferenceModel> {
        &self.model
    }

    /// Run every step synchronously
    pub fn run(&self, image: &[u8]) -> Result<ClassificationResult> {
        let start = Instant::now();

        debug!("Image loaded. Preprocessing...");
        let input = self.preprocessor.prepare(image, self.model.device())?;

        debug!("Running prediction...");
        let raw_output = self.model.forward(&input)?;
        debug!("Raw prediction output: {}", raw_output);

        let prediction = interpret_output(raw_output)?;
        info!(
            label = prediction.label.as_str(),
            normal = prediction.probabilities.normal,
            pneumonia = prediction.probabilities.pneumonia,
            "Prediction decision"
        );

        Ok(ClassificationResult {
            prediction,
            model: self.model.name().to_string(),
            latency_us: start.elapsed().as_micros() as u64,
        })
    }
}

/// Interpret a raw model output as P(normal).
///
/// Outputs that are not a finite probability are rejected rather than
/// rendered as nonsense percentages.
pub fn interpret_output(raw_output: f32) -> Result<Prediction> {
    if !raw_output.is_finite() || !(0.0..=1.0).contains(&raw_output) {
        return Err(Error::inference(format!(
            "Model output {} is not a probability in [0, 1]",
            raw_output
        )));
    }
    Ok(Prediction::from_raw_output(raw_output))
}

#[async_trait]
impl Classifier for ClassificationPipeline {
    async fn classify(&self, image: &[u8]) -> Result<ClassificationResult> {
        let pipeline = self.clone();
        let image = image.to_vec();

        // Forward passes are CPU bound; keep them off the async workers.
        tokio::task::spawn_blocking(move || pipeline.run(&image))
            .await
            .map_err(|e| Error::internal(format!("Classification task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        self.model.name()
    }
}
