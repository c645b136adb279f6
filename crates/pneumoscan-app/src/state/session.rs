//! Single-user session state
//!
//! Everything the page shows lives here: model status, the selected image,
//! and the last prediction. State only changes through the transitions
//! below; a refused or failed operation leaves it untouched.

use chrono::{DateTime, Utc};
use pneumoscan_classifiers::{ClassificationResult, Classifier, ModelStatus};
use pneumoscan_core::{Prediction, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// User-visible notice for a refused or failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    #[error("Model isn't loaded yet. Please wait.")]
    ModelNotLoaded,

    #[error("Please upload an image.")]
    NoImageSelected,

    #[error("Image is too large.")]
    ImageTooLarge,

    #[error("Model failed to load. Check the logs.")]
    ModelLoadFailed,

    #[error("Prediction failed.")]
    PredictionFailed,
}

/// Model lifecycle as held by the session
#[derive(Clone)]
pub enum ModelState {
    Loading,
    Ready(Arc<dyn Classifier>),
    Failed(String),
}

impl ModelState {
    /// Status without the classifier handle
    pub fn status(&self) -> ModelStatus {
        match self {
            Self::Loading => ModelStatus::Loading,
            Self::Ready(_) => ModelStatus::Ready,
            Self::Failed(reason) => ModelStatus::Failed(reason.clone()),
        }
    }
}

/// Image picked by the user, kept until replaced
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

/// Snapshot taken when a classification starts
pub struct ClassificationJob {
    pub classifier: Arc<dyn Classifier>,
    pub image: SelectedImage,
}

/// Session state container
pub struct Session {
    model: ModelState,
    selected_image: Option<SelectedImage>,
    prediction: Option<Prediction>,
    classified_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Fresh session with the model still loading
    pub fn new() -> Self {
        Self {
            model: ModelState::Loading,
            selected_image: None,
            prediction: None,
            classified_at: None,
        }
    }

    pub fn model(&self) -> &ModelState {
        &self.model
    }

    pub fn selected_image(&self) -> Option<&SelectedImage> {
        self.selected_image.as_ref()
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    /// Advice text for the current prediction
    pub fn advice(&self) -> Option<&'static str> {
        self.prediction.as_ref().map(Prediction::advice)
    }

    pub fn classified_at(&self) -> Option<DateTime<Utc>> {
        self.classified_at
    }

    /// Record the outcome of model loading.
    ///
    /// Only the first call has an effect. Returns the notice to surface
    /// when loading failed.
    pub fn load_complete(&mut self, result: Result<Arc<dyn Classifier>>) -> Option<Notice> {
        if self.model.status().is_terminal() {
            warn!("Ignoring model load result: model state is already final");
            return None;
        }

        match result {
            Ok(classifier) => {
                info!("Model ready: {}", classifier.name());
                self.model = ModelState::Ready(classifier);
                None
            }
            Err(e) => {
                error!("Model failed to load: {}", e);
                self.model = ModelState::Failed(e.to_string());
                Some(Notice::ModelLoadFailed)
            }
        }
    }

    /// Replace the selected image
    pub fn select_image(
        &mut self,
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> std::result::Result<(), Notice> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Notice::NoImageSelected);
        }

        let name = name.into();
        info!("Image file selected: {} ({} bytes)", name, bytes.len());
        self.selected_image = Some(SelectedImage { name, bytes });
        Ok(())
    }

    /// Check preconditions and snapshot what a classification needs.
    ///
    /// The model is checked before the image.
    pub fn begin_classification(&self) -> std::result::Result<ClassificationJob, Notice> {
        let ModelState::Ready(classifier) = &self.model else {
            return Err(Notice::ModelNotLoaded);
        };

        let image = self
            .selected_image
            .clone()
            .ok_or(Notice::NoImageSelected)?;

        Ok(ClassificationJob {
            classifier: classifier.clone(),
            image,
        })
    }

    /// Commit a finished classification
    pub fn complete_classification(
        &mut self,
        result: Result<ClassificationResult>,
    ) -> std::result::Result<Prediction, Notice> {
        match result {
            Ok(result) => {
                self.prediction = Some(result.prediction);
                self.classified_at = Some(Utc::now());
                Ok(result.prediction)
            }
            Err(e) => {
                error!("Error during prediction: {}", e);
                Err(Notice::PredictionFailed)
            }
        }
    }
}
