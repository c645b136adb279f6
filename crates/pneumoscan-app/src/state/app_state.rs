use crate::config::AppConfig;
use crate::display::DisplayState;
use crate::state::{Notice, Session};
use parking_lot::RwLock;
use pneumoscan_classifiers::{load_model_async, ClassificationPipeline, Classifier};
use pneumoscan_core::{Prediction, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AppConfig>,

    /// The single user session
    pub session: Arc<RwLock<Session>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            session: Arc::new(RwLock::new(Session::new())),
        }
    }

    /// Load the configured model in the background.
    ///
    /// The session stays in `Loading` until the task records the outcome.
    pub fn spawn_model_load(&self) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let result = state.load_classifier().await;
            state.finish_loading(result);
        })
    }

    /// Load the configured model and wrap it in a pipeline
    pub async fn load_classifier(&self) -> Result<Arc<dyn Classifier>> {
        let model_config = self.config.classifier.to_model_config();
        let model = load_model_async(model_config).await?;
        Ok(Arc::new(ClassificationPipeline::new(model)))
    }

    /// Record the model load outcome in the session
    pub fn finish_loading(&self, result: Result<Arc<dyn Classifier>>) -> Option<Notice> {
        self.session.write().load_complete(result)
    }

    pub fn select_image(
        &self,
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> std::result::Result<(), Notice> {
        self.session.write().select_image(name, bytes)
    }

    /// Classify the selected image with the loaded model
    pub async fn classify(&self) -> std::result::Result<Prediction, Notice> {
        let job = self.session.read().begin_classification()?;

        info!("Classifying {}", job.image.name);
        let result = job.classifier.classify(&job.image.bytes).await;

        self.session.write().complete_classification(result)
    }

    /// Current view of the session
    pub fn display(&self) -> DisplayState {
        DisplayState::from(&*self.session.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pneumoscan_core::Error;
    use tempfile::TempDir;

    fn config_with_empty_model_dir(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.classifier = config.classifier.with_model_dir(dir.path());
        config
    }

    #[tokio::test]
    async fn test_missing_model_fails_load() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(config_with_empty_model_dir(&dir));
        assert!(state.display().loading);

        state.spawn_model_load().await.unwrap();

        let display = state.display();
        assert_eq!(display.model_status, "failed");
        assert!(!display.classify_enabled);

        state.select_image("xray.png", vec![1, 2, 3]).unwrap();
        assert_eq!(state.classify().await, Err(Notice::ModelNotLoaded));
    }

    #[tokio::test]
    async fn test_classify_while_loading() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(state.classify().await, Err(Notice::ModelNotLoaded));

        assert_eq!(
            state.finish_loading(Err(Error::model("unreachable weights"))),
            Some(Notice::ModelLoadFailed)
        );
    }
}
