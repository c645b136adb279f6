//! Model loading integration tests
//!
//! Writes small model artifacts (description + safetensors) to a temp
//! directory and loads them the same way the app does at startup.

use candle_core::{DType, Device, Tensor};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use pneumoscan_classifiers::{
    load_model_async, ClassificationPipeline, Classifier, InferenceModel, LoadedModel, ModelConfig,
};
use pneumoscan_core::{ClassLabel, Error};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const DESCRIPTION: &str = r#"{
  "name": "tiny-xray-cnn",
  "version": "0.1",
  "input_shape": [150, 150, 1],
  "layers": [
    { "type": "conv2d", "name": "conv1", "filters": 2, "kernel_size": 3, "padding": "same", "activation": "relu" },
    { "type": "batch_norm", "name": "bn1" },
    { "type": "max_pool2d", "pool_size": 2 },
    { "type": "dropout", "rate": 0.25 },
    { "type": "flatten" },
    { "type": "dense", "name": "out", "units": 1, "activation": "sigmoid" }
  ]
}"#;

// 150x150 -> same conv -> 150x150x2 -> pool -> 75x75x2
const FLAT_FEATURES: usize = 75 * 75 * 2;

fn logit(p: f32) -> f32 {
    (p / (1.0 - p)).ln()
}

/// Weights whose output is sigmoid(bias) regardless of the image
fn constant_output_weights(output: f32) -> HashMap<String, Tensor> {
    let dev = Device::Cpu;
    let mut tensors = HashMap::new();
    tensors.insert(
        "conv1.weight".to_string(),
        Tensor::zeros((2, 1, 3, 3), DType::F32, &dev).unwrap(),
    );
    tensors.insert(
        "conv1.bias".to_string(),
        Tensor::zeros(2, DType::F32, &dev).unwrap(),
    );
    tensors.insert(
        "bn1.weight".to_string(),
        Tensor::ones(2, DType::F32, &dev).unwrap(),
    );
    tensors.insert(
        "bn1.bias".to_string(),
        Tensor::zeros(2, DType::F32, &dev).unwrap(),
    );
    tensors.insert(
        "bn1.running_mean".to_string(),
        Tensor::zeros(2, DType::F32, &dev).unwrap(),
    );
    tensors.insert(
        "bn1.running_var".to_string(),
        Tensor::ones(2, DType::F32, &dev).unwrap(),
    );
    tensors.insert(
        "out.weight".to_string(),
        Tensor::zeros((1, FLAT_FEATURES), DType::F32, &dev).unwrap(),
    );
    tensors.insert(
        "out.bias".to_string(),
        Tensor::new(&[logit(output)], &dev).unwrap(),
    );
    tensors
}

fn write_model(dir: &Path, description: &str, tensors: &HashMap<String, Tensor>) {
    std::fs::write(dir.join("model.json"), description).unwrap();
    candle_core::safetensors::save(tensors, dir.join("model.safetensors")).unwrap();
}

fn model_dir(output: f32) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_model(dir.path(), DESCRIPTION, &constant_output_weights(output));
    dir
}

fn gray_png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([200])))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

#[test]
fn test_load_and_forward() {
    let dir = model_dir(0.82);
    let model = LoadedModel::load(ModelConfig::from_local(dir.path())).unwrap();

    assert_eq!(model.name(), "tiny-xray-cnn");
    assert_eq!(model.description().version, "0.1");

    let input = Tensor::rand(0f32, 1f32, (1, 150, 150, 1), &Device::Cpu).unwrap();
    let output = model.forward(&input).unwrap();
    assert!((output - 0.82).abs() < 1e-4, "unexpected output {}", output);
}

#[test]
fn test_forward_rejects_wrong_shape() {
    let dir = model_dir(0.5);
    let model = LoadedModel::load(ModelConfig::from_local(dir.path())).unwrap();

    let input = Tensor::zeros((1, 64, 64, 1), DType::F32, &Device::Cpu).unwrap();
    assert!(matches!(model.forward(&input), Err(Error::Inference(_))));
}

#[test]
fn test_missing_weight_tensor() {
    let dir = TempDir::new().unwrap();
    let mut tensors = constant_output_weights(0.5);
    tensors.remove("out.bias");
    write_model(dir.path(), DESCRIPTION, &tensors);

    let err = LoadedModel::load(ModelConfig::from_local(dir.path()))
        .err()
        .unwrap();
    assert!(matches!(err, Error::Model(_)));
}

#[test]
fn test_mismatched_weight_shape() {
    let dir = TempDir::new().unwrap();
    let mut tensors = constant_output_weights(0.5);
    tensors.insert(
        "out.weight".to_string(),
        Tensor::zeros((1, 10), DType::F32, &Device::Cpu).unwrap(),
    );
    write_model(dir.path(), DESCRIPTION, &tensors);

    assert!(LoadedModel::load(ModelConfig::from_local(dir.path())).is_err());
}

#[test]
fn test_corrupt_weights_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("model.json"), DESCRIPTION).unwrap();
    std::fs::write(dir.path().join("model.safetensors"), b"garbage").unwrap();

    assert!(LoadedModel::load(ModelConfig::from_local(dir.path())).is_err());
}

#[tokio::test]
async fn test_async_load_failure() {
    let dir = TempDir::new().unwrap();
    let result = load_model_async(ModelConfig::from_local(dir.path())).await;
    assert!(matches!(result, Err(Error::Model(_))));
}

#[tokio::test]
async fn test_end_to_end_classification() {
    let dir = model_dir(0.10);
    let model = load_model_async(ModelConfig::from_local(dir.path()))
        .await
        .unwrap();
    let pipeline = ClassificationPipeline::new(model);

    let result = pipeline.classify(&gray_png(800, 600)).await.unwrap();

    assert_eq!(result.prediction.label, ClassLabel::Pneumonia);
    assert!((result.prediction.probabilities.normal - 0.10).abs() < 1e-4);
    assert_eq!(result.prediction.probabilities.pneumonia_percent(), "90.00%");
    assert_eq!(result.model, "tiny-xray-cnn");
}

#[tokio::test]
async fn test_model_is_shared_between_pipelines() {
    let dir = model_dir(0.82);
    let model: Arc<LoadedModel> = load_model_async(ModelConfig::from_local(dir.path()))
        .await
        .unwrap();

    let first = ClassificationPipeline::new(model.clone());
    let second = ClassificationPipeline::new(model.clone());
    let image = gray_png(150, 150);

    let (a, b) = tokio::join!(first.classify(&image), second.classify(&image));
    assert_eq!(a.unwrap().prediction.label, ClassLabel::Normal);
    assert_eq!(b.unwrap().prediction.label, ClassLabel::Normal);
}
