//! PneumoScan Classifiers
//!
//! Chest X-ray classification (normal vs. pneumonia) on Candle.
//!
//! - [`model_config`]: the JSON description of a sequential CNN
//! - [`model_loader`]: resolves, loads, and binds weights to a network
//! - [`preprocess`]: image -> `[1, 150, 150, 1]` tensor in [0, 1]
//! - [`pipeline`]: preprocess, forward pass, interpret the scalar output
//!
//! All models run on CPU unless configured otherwise.

pub mod classifier;
pub mod config;
pub mod model_config;
pub mod model_loader;
pub mod network;
pub mod pipeline;
pub mod preprocess;

pub use classifier::{ClassificationResult, Classifier, InferenceModel};
pub use config::{ClassifierConfig, DeviceSpec, ModelConfigSpec, ModelSourceSpec};
pub use model_config::{Activation, LayerSpec, ModelDescription, Padding};
pub use model_loader::{
    load_model_async, DeviceType, LoadedModel, ModelConfig, ModelSource, ModelStatus,
};
pub use network::SequentialNetwork;
pub use pipeline::{interpret_output, ClassificationPipeline};
pub use preprocess::ImagePreprocessor;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassificationResult, Classifier, InferenceModel};
    pub use crate::model_loader::{load_model_async, LoadedModel, ModelConfig, ModelStatus};
    pub use crate::pipeline::ClassificationPipeline;
    pub use crate::preprocess::ImagePreprocessor;
}
