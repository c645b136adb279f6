//! PneumoScan Core
//!
//! Core types shared across PneumoScan components.
//!
//! This crate provides:
//! - Error types and result handling
//! - The two-class prediction model (`Normal` vs `Pneumonia`)
//! - Fixed advisory texts shown next to a prediction
//! - The input tensor shape the classifier expects

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    ClassLabel, Prediction, Probabilities, INPUT_CHANNELS, INPUT_HEIGHT, INPUT_SHAPE, INPUT_WIDTH,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ClassLabel, Prediction, Probabilities};
}
