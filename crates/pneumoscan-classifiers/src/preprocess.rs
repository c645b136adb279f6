//! Image preprocessing for the X-ray classifier
//!
//! Turns an encoded image of any size into the `[1, 150, 150, 1]` tensor
//! the model expects: bilinear resize, channel averaging, scaling to [0, 1].
//!
//! The resize point-samples like `tf.image.resizeBilinear` with
//! `alignCorners = false`: output pixel `d` reads source position
//! `d * in / out` and interpolates its two neighbours per axis. There is
//! no wider filter window when downscaling.

use candle_core::{Device, Tensor};
use image::{DynamicImage, RgbImage};
use pneumoscan_core::{Error, Result, INPUT_HEIGHT, INPUT_WIDTH};

/// Resizes and normalizes images into model input tensors
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    height: u32,
    width: u32,
    max_value: f32,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self {
            height: INPUT_HEIGHT as u32,
            width: INPUT_WIDTH as u32,
            max_value: 255.0,
        }
    }
}

impl ImagePreprocessor {
    /// Create a preprocessor for the classifier's fixed input size
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an encoded image (PNG, JPEG, BMP, ...) from memory
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(Error::image("Image data is empty"));
        }
        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::image(format!("Failed to decode image: {}", e)))?;

        if image.width() == 0 || image.height() == 0 {
            return Err(Error::image("Image has zero width or height"));
        }
        Ok(image)
    }

    /// Resize, grayscale, and normalize into a `[1, H, W, 1]` tensor
    pub fn to_tensor(&self, image: &DynamicImage, device: &Device) -> Result<Tensor> {
        let values = self.to_values(image);
        Tensor::from_vec(
            values,
            (1, self.height as usize, self.width as usize, 1),
            device,
        )
        .map_err(|e| Error::image(format!("Failed to create input tensor: {}", e)))
    }

    /// Decode then convert in one step
    pub fn prepare(&self, bytes: &[u8], device: &Device) -> Result<Tensor> {
        let image = self.decode(bytes)?;
        tracing::debug!(
            "Preprocessing {}x{} image to {}x{}",
            image.width(),
            image.height(),
            self.width,
            self.height
        );
        self.to_tensor(&image, device)
    }

    /// Row-major grayscale values in [0, 1], `height * width` long.
    ///
    /// Alpha is discarded; the three color channels are averaged.
    pub fn to_values(&self, image: &DynamicImage) -> Vec<f32> {
        let rgb = image.to_rgb8();
        let rows: Vec<Sample> = (0..self.height)
            .map(|y| Sample::new(y, rgb.height(), self.height))
            .collect();
        let cols: Vec<Sample> = (0..self.width)
            .map(|x| Sample::new(x, rgb.width(), self.width))
            .collect();

        let mut values = Vec::with_capacity(rows.len() * cols.len());
        for row in &rows {
            for col in &cols {
                let mut sum = 0.0f32;
                for channel in 0..3 {
                    sum += bilinear(&rgb, row, col, channel);
                }
                values.push((sum / 3.0 / self.max_value).clamp(0.0, 1.0));
            }
        }
        values
    }
}

/// Source neighbours and weight for one output coordinate
#[derive(Debug, Clone, Copy)]
struct Sample {
    low: u32,
    high: u32,
    frac: f64,
}

impl Sample {
    fn new(dst: u32, in_size: u32, out_size: u32) -> Self {
        let src = dst as f64 * in_size as f64 / out_size as f64;
        let low = src.floor();
        Self {
            low: low as u32,
            high: (src.ceil() as u32).min(in_size - 1),
            frac: src - low,
        }
    }
}

/// One channel interpolated as f32, rows blended after columns
fn bilinear(image: &RgbImage, row: &Sample, col: &Sample, channel: usize) -> f32 {
    let at = |x: u32, y: u32| image.get_pixel(x, y).0[channel] as f64;

    let top_left = at(col.low, row.low);
    let top_right = at(col.high, row.low);
    let bottom_left = at(col.low, row.high);
    let bottom_right = at(col.high, row.high);

    let top = top_left + (top_right - top_left) * col.frac;
    let bottom = bottom_left + (bottom_right - bottom_left) * col.frac;
    (top + (bottom - top) * row.frac) as f32
}
