//! Mock models for testing
//!
//! Provides configurable implementations of the InferenceModel trait so the
//! classification pipeline can be exercised without real weights.

use candle_core::{Device, Tensor};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pneumoscan_classifiers::{ClassificationPipeline, Classifier, InferenceModel};
use pneumoscan_core::{ClassLabel, Error, Result};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A model that returns a fixed output for any input
pub struct MockModel {
    name: String,
    output: f32,
    device: Device,
    call_count: AtomicU32,
}

impl MockModel {
    /// Create a new mock model returning `output`
    pub fn new(output: f32) -> Self {
        Self {
            name: "mock-cnn".to_string(),
            output,
            device: Device::Cpu,
            call_count: AtomicU32::new(0),
        }
    }

    /// Get the number of times forward was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl InferenceModel for MockModel {
    fn forward(&self, input: &Tensor) -> Result<f32> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        assert_eq!(input.dims(), &[1, 150, 150, 1]);
        Ok(self.output)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

/// A model whose forward pass always fails - for testing error paths
pub struct FailingModel {
    device: Device,
}

impl FailingModel {
    pub fn new() -> Self {
        Self {
            device: Device::Cpu,
        }
    }
}

impl InferenceModel for FailingModel {
    fn forward(&self, _input: &Tensor) -> Result<f32> {
        Err(Error::inference("Simulated forward pass failure"))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

fn xray_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        let v = ((x + y) % 256) as u8;
        Rgb([v, v, v])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

#[tokio::test]
async fn test_normal_scenario() {
    let model = Arc::new(MockModel::new(0.82));
    let pipeline = ClassificationPipeline::new(model.clone());

    let result = pipeline.classify(&xray_png(512, 384)).await.unwrap();
    let prediction = result.prediction;

    assert_eq!(prediction.label, ClassLabel::Normal);
    assert_eq!(prediction.probabilities.normal_percent(), "82.00%");
    assert_eq!(prediction.probabilities.pneumonia_percent(), "18.00%");
    assert_eq!(prediction.advice(), ClassLabel::Normal.advice());
    assert_eq!(result.model, "mock-cnn");
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_pneumonia_scenario() {
    let pipeline = ClassificationPipeline::new(Arc::new(MockModel::new(0.10)));

    let prediction = pipeline.classify(&xray_png(90, 200)).await.unwrap().prediction;

    assert_eq!(prediction.label, ClassLabel::Pneumonia);
    assert_eq!(prediction.probabilities.normal_percent(), "10.00%");
    assert_eq!(prediction.probabilities.pneumonia_percent(), "90.00%");
    assert_eq!(prediction.advice(), ClassLabel::Pneumonia.advice());
}

#[tokio::test]
async fn test_tie_is_pneumonia() {
    let pipeline = ClassificationPipeline::new(Arc::new(MockModel::new(0.5)));
    let prediction = pipeline.classify(&xray_png(150, 150)).await.unwrap().prediction;
    assert_eq!(prediction.label, ClassLabel::Pneumonia);
}

#[tokio::test]
async fn test_undecodable_image_skips_inference() {
    let model = Arc::new(MockModel::new(0.9));
    let pipeline = ClassificationPipeline::new(model.clone());

    let result = pipeline.classify(b"not an image").await;

    assert!(matches!(result, Err(Error::Image(_))));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_failing_model() {
    let pipeline = ClassificationPipeline::new(Arc::new(FailingModel::new()));
    let result = pipeline.classify(&xray_png(64, 64)).await;
    assert!(matches!(result, Err(Error::Inference(_))));
}

#[tokio::test]
async fn test_out_of_range_output_is_rejected() {
    let pipeline = ClassificationPipeline::new(Arc::new(MockModel::new(1.7)));
    let result = pipeline.classify(&xray_png(64, 64)).await;
    assert!(matches!(result, Err(Error::Inference(_))));
}
