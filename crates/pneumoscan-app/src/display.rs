//! View of the session for the page and the CLI

use crate::state::{ModelState, Session};
use chrono::{DateTime, Utc};
use pneumoscan_core::{ClassLabel, Prediction};
use serde::Serialize;
use std::fmt::Write as _;

/// Everything the page renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    /// "loading", "ready", or "failed"
    pub model_status: String,
    /// Shows "Loading model..." while true
    pub loading: bool,
    pub classify_enabled: bool,
    pub selected_image: Option<String>,
    pub prediction: Option<PredictionView>,
}

/// Formatted prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    pub label: ClassLabel,
    pub normal_percent: String,
    pub pneumonia_percent: String,
    pub advice: String,
    pub classified_at: Option<DateTime<Utc>>,
}

impl PredictionView {
    pub fn new(prediction: &Prediction, classified_at: Option<DateTime<Utc>>) -> Self {
        Self {
            label: prediction.label,
            normal_percent: prediction.probabilities.normal_percent(),
            pneumonia_percent: prediction.probabilities.pneumonia_percent(),
            advice: prediction.advice().to_string(),
            classified_at,
        }
    }

    /// Four-line text block printed by the CLI
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Prediction Result: {}", self.label);
        let _ = writeln!(out, "Probability of Normal Lung: {}", self.normal_percent);
        let _ = writeln!(
            out,
            "Probability of Pneumonia Lung: {}",
            self.pneumonia_percent
        );
        let _ = write!(out, "Health Advice: {}", self.advice);
        out
    }
}

impl From<&Session> for DisplayState {
    fn from(session: &Session) -> Self {
        let model = session.model();
        Self {
            model_status: model.status().as_str().to_string(),
            loading: matches!(model, ModelState::Loading),
            classify_enabled: matches!(model, ModelState::Ready(_)),
            selected_image: session.selected_image().map(|image| image.name.clone()),
            prediction: session
                .prediction()
                .map(|p| PredictionView::new(p, session.classified_at())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_normal() {
        let view = PredictionView::new(&Prediction::from_raw_output(0.82), None);
        let text = view.render_text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Prediction Result: Normal");
        assert_eq!(lines[1], "Probability of Normal Lung: 82.00%");
        assert_eq!(lines[2], "Probability of Pneumonia Lung: 18.00%");
        assert_eq!(
            lines[3],
            format!("Health Advice: {}", ClassLabel::Normal.advice())
        );
    }

    #[test]
    fn test_render_pneumonia() {
        let view = PredictionView::new(&Prediction::from_raw_output(0.10), None);
        assert!(view.render_text().starts_with("Prediction Result: Pneumonia\n"));
        assert_eq!(view.normal_percent, "10.00%");
        assert_eq!(view.pneumonia_percent, "90.00%");
        assert_eq!(view.advice, ClassLabel::Pneumonia.advice());
    }

    #[test]
    fn test_fresh_session_is_loading() {
        let state = DisplayState::from(&Session::new());
        assert_eq!(state.model_status, "loading");
        assert!(state.loading);
        assert!(!state.classify_enabled);
        assert!(state.selected_image.is_none());
        assert!(state.prediction.is_none());
    }

    #[test]
    fn test_failed_load_disables_classify() {
        let mut session = Session::new();
        session.load_complete(Err(pneumoscan_core::Error::model("no weights")));
        session.select_image("chest.jpg", vec![1, 2]).unwrap();

        let state = DisplayState::from(&session);
        assert_eq!(state.model_status, "failed");
        assert!(!state.loading);
        assert!(!state.classify_enabled);
        assert_eq!(state.selected_image.as_deref(), Some("chest.jpg"));
    }
}
