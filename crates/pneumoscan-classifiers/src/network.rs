//! Sequential convolutional network built from a [`ModelDescription`]
//!
//! Input tensors arrive channels-last (`[batch, height, width, channels]`),
//! the layout image models are usually exported with. Convolution and
//! pooling run channels-first, so the network permutes once on entry and
//! permutes back right before `flatten`. Dense weights therefore keep the
//! channels-last feature order they were trained with.

use crate::model_config::{Activation, LayerSpec, ModelDescription, Padding};
use candle_core::Tensor;
use candle_nn::{BatchNorm, Conv2d, Conv2dConfig, Linear, Module, ModuleT, VarBuilder};
use pneumoscan_core::{Error, Result};

/// Activation shape tracked while wiring layers together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeatureShape {
    Spatial {
        height: usize,
        width: usize,
        channels: usize,
    },
    Flat(usize),
}

impl FeatureShape {
    fn describe(&self) -> String {
        match self {
            Self::Spatial {
                height,
                width,
                channels,
            } => format!("{}x{}x{}", height, width, channels),
            Self::Flat(n) => format!("{}", n),
        }
    }
}

enum Layer {
    Conv2d {
        conv: Conv2d,
        activation: Activation,
    },
    MaxPool2d {
        pool_size: usize,
        stride: usize,
    },
    BatchNorm(BatchNorm),
    Flatten,
    Dense {
        linear: Linear,
        activation: Activation,
    },
    Dropout,
}

/// A feed-forward stack of layers ending in a single output unit
pub struct SequentialNetwork {
    layers: Vec<Layer>,
    input_shape: [usize; 3],
}

impl SequentialNetwork {
    /// Wire up layers and fetch their weights from `vb`.
    ///
    /// Fails if a layer doesn't fit the shape produced by its predecessor,
    /// a weight tensor is missing or mis-shaped, or the network doesn't end
    /// in exactly one output unit.
    pub fn load(description: &ModelDescription, vb: VarBuilder) -> Result<Self> {
        let [height, width, channels] = description.input_shape;
        let mut shape = FeatureShape::Spatial {
            height,
            width,
            channels,
        };
        let mut layers = Vec::with_capacity(description.layers.len());

        for (index, spec) in description.layers.iter().enumerate() {
            let (layer, next) = Self::build_layer(spec, shape, &vb).map_err(|e| {
                Error::model(format!(
                    "layer {} ({}) with input {}: {}",
                    index,
                    spec.kind(),
                    shape.describe(),
                    e
                ))
            })?;
            tracing::debug!(
                "layer {} {}: {} -> {}",
                index,
                spec.kind(),
                shape.describe(),
                next.describe()
            );
            layers.push(layer);
            shape = next;
        }

        if shape != FeatureShape::Flat(1) {
            return Err(Error::model(format!(
                "Network must end in a single output unit, ends in {}",
                shape.describe()
            )));
        }

        Ok(Self {
            layers,
            input_shape: description.input_shape,
        })
    }

    fn build_layer(
        spec: &LayerSpec,
        shape: FeatureShape,
        vb: &VarBuilder,
    ) -> Result<(Layer, FeatureShape)> {
        match spec {
            LayerSpec::Conv2d {
                name,
                filters,
                kernel_size,
                strides,
                padding,
                activation,
            } => {
                let FeatureShape::Spatial {
                    height,
                    width,
                    channels,
                } = shape
                else {
                    return Err(Error::model("conv2d needs a spatial input"));
                };

                let pad = match padding {
                    Padding::Valid => 0,
                    Padding::Same => kernel_size / 2,
                };
                let out_height = conv_output_size(height, *kernel_size, *strides, pad)?;
                let out_width = conv_output_size(width, *kernel_size, *strides, pad)?;

                let cfg = Conv2dConfig {
                    padding: pad,
                    stride: *strides,
                    ..Default::default()
                };
                let conv = candle_nn::conv2d(channels, *filters, *kernel_size, cfg, vb.pp(name))
                    .map_err(|e| Error::model(format!("Failed to load weights for '{}': {}", name, e)))?;

                Ok((
                    Layer::Conv2d {
                        conv,
                        activation: *activation,
                    },
                    FeatureShape::Spatial {
                        height: out_height,
                        width: out_width,
                        channels: *filters,
                    },
                ))
            }
            LayerSpec::MaxPool2d { pool_size, strides } => {
                let FeatureShape::Spatial {
                    height,
                    width,
                    channels,
                } = shape
                else {
                    return Err(Error::model("max_pool2d needs a spatial input"));
                };

                let stride = strides.unwrap_or(*pool_size);
                Ok((
                    Layer::MaxPool2d {
                        pool_size: *pool_size,
                        stride,
                    },
                    FeatureShape::Spatial {
                        height: conv_output_size(height, *pool_size, stride, 0)?,
                        width: conv_output_size(width, *pool_size, stride, 0)?,
                        channels,
                    },
                ))
            }
            LayerSpec::BatchNorm { name, epsilon } => {
                let FeatureShape::Spatial { channels, .. } = shape else {
                    return Err(Error::model("batch_norm is only supported on spatial inputs"));
                };
                let bn = candle_nn::batch_norm(channels, *epsilon, vb.pp(name))
                    .map_err(|e| Error::model(format!("Failed to load weights for '{}': {}", name, e)))?;
                Ok((Layer::BatchNorm(bn), shape))
            }
            LayerSpec::Flatten => {
                let features = match shape {
                    FeatureShape::Spatial {
                        height,
                        width,
                        channels,
                    } => height * width * channels,
                    FeatureShape::Flat(n) => n,
                };
                Ok((Layer::Flatten, FeatureShape::Flat(features)))
            }
            LayerSpec::Dense {
                name,
                units,
                activation,
            } => {
                let FeatureShape::Flat(features) = shape else {
                    return Err(Error::model("dense needs a flattened input, add a flatten layer"));
                };
                let linear = candle_nn::linear(features, *units, vb.pp(name))
                    .map_err(|e| Error::model(format!("Failed to load weights for '{}': {}", name, e)))?;
                Ok((
                    Layer::Dense {
                        linear,
                        activation: *activation,
                    },
                    FeatureShape::Flat(*units),
                ))
            }
            LayerSpec::Dropout { .. } => Ok((Layer::Dropout, shape)),
        }
    }

    /// Expected input shape without batch dimension
    pub fn input_shape(&self) -> [usize; 3] {
        self.input_shape
    }

    /// Number of layers, dropout included
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

impl Module for SequentialNetwork {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        // NHWC -> NCHW
        let mut xs = xs.permute((0, 3, 1, 2))?.contiguous()?;
        let mut channels_first = true;

        for layer in &self.layers {
            xs = match layer {
                Layer::Conv2d { conv, activation } => apply_activation(&conv.forward(&xs)?, *activation)?,
                Layer::MaxPool2d { pool_size, stride } => {
                    xs.max_pool2d_with_stride(*pool_size, *stride)?
                }
                Layer::BatchNorm(bn) => bn.forward_t(&xs, false)?,
                Layer::Flatten => {
                    if channels_first {
                        channels_first = false;
                        xs.permute((0, 2, 3, 1))?.contiguous()?.flatten_from(1)?
                    } else {
                        xs
                    }
                }
                Layer::Dense { linear, activation } => {
                    apply_activation(&linear.forward(&xs)?, *activation)?
                }
                Layer::Dropout => xs,
            };
        }

        Ok(xs)
    }
}

fn apply_activation(xs: &Tensor, activation: Activation) -> candle_core::Result<Tensor> {
    match activation {
        Activation::Linear => Ok(xs.clone()),
        Activation::Relu => xs.relu(),
        Activation::Sigmoid => candle_nn::ops::sigmoid(xs),
    }
}

fn conv_output_size(input: usize, kernel: usize, stride: usize, padding: usize) -> Result<usize> {
    let padded = input + 2 * padding;
    if padded < kernel {
        return Err(Error::model(format!(
            "kernel {} is larger than padded input {}",
            kernel, padded
        )));
    }
    Ok((padded - kernel) / stride + 1)
}
