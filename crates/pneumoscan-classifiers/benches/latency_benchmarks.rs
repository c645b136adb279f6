//! Latency benchmarks for the classification pipeline
//!
//! Preprocessing dominates for a small CNN, so it is measured separately
//! across typical X-ray upload sizes.
//!
//! Run with: cargo bench -p pneumoscan-classifiers

use candle_core::{Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageFormat, Luma};
use pneumoscan_classifiers::{ClassificationPipeline, Classifier, ImagePreprocessor, InferenceModel};
use pneumoscan_core::Result;
use std::io::Cursor;
use std::sync::Arc;
use tokio::runtime::Runtime;

struct ConstantModel {
    device: Device,
}

impl InferenceModel for ConstantModel {
    fn forward(&self, _input: &Tensor) -> Result<f32> {
        Ok(0.5)
    }

    fn name(&self) -> &str {
        "constant"
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

fn encoded_xray(width: u32, height: u32) -> Vec<u8> {
    let image = image::GrayImage::from_fn(width, height, |x, y| Luma([((x * y) % 251) as u8]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode benchmark image");
    buf.into_inner()
}

const SIZES: [(u32, u32); 3] = [(150, 150), (1024, 1024), (2048, 2500)];

/// Benchmark resize + grayscale + normalize on decoded images
fn benchmark_preprocessing(c: &mut Criterion) {
    let preprocessor = ImagePreprocessor::new();

    let mut group = c.benchmark_group("Preprocessing");
    group.sample_size(30);

    for (width, height) in SIZES {
        let image = image::load_from_memory(&encoded_xray(width, height))
            .expect("Failed to decode benchmark image");
        group.bench_with_input(
            BenchmarkId::new("to_tensor", format!("{}x{}", width, height)),
            &image,
            |b, image| {
                b.iter(|| {
                    preprocessor
                        .to_tensor(black_box(image), &Device::Cpu)
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

/// Benchmark the full pipeline with a constant model (decode included)
fn benchmark_pipeline(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let pipeline = ClassificationPipeline::new(Arc::new(ConstantModel {
        device: Device::Cpu,
    }));

    let mut group = c.benchmark_group("Pipeline");
    group.sample_size(20);

    for (width, height) in SIZES {
        let bytes = encoded_xray(width, height);
        group.bench_with_input(
            BenchmarkId::new("classify", format!("{}x{}", width, height)),
            &bytes,
            |b, bytes| {
                b.to_async(&rt)
                    .iter(|| async { pipeline.classify(black_box(bytes)).await.unwrap() })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_preprocessing, benchmark_pipeline);
criterion_main!(benches);
