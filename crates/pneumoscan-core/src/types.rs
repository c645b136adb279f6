//! Core types for PneumoScan

use serde::{Deserialize, Serialize};
use std::fmt;

/// Height in pixels of the image fed to the classifier
pub const INPUT_HEIGHT: usize = 150;

/// Width in pixels of the image fed to the classifier
pub const INPUT_WIDTH: usize = 150;

/// Number of channels fed to the classifier (grayscale)
pub const INPUT_CHANNELS: usize = 1;

/// Full input tensor shape: a single-image batch in NHWC order
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_HEIGHT, INPUT_WIDTH, INPUT_CHANNELS];

const NORMAL_ADVICE: &str = "Your lungs are healthy! To prevent pneumonia, maintain good hygiene, \
avoid smoking, stay active, and get vaccinated against pneumococcal pneumonia.";

const PNEUMONIA_ADVICE: &str = "If you have pneumonia, seek medical attention immediately. \
Early treatment with antibiotics or antivirals may be necessary depending on the type. \
Get plenty of rest, stay hydrated, and follow your doctor's advice for medications.";

/// The two classes the X-ray classifier distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassLabel {
    Normal,
    Pneumonia,
}

impl ClassLabel {
    /// Display name of the label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Pneumonia => "Pneumonia",
        }
    }

    /// Canned health advice shown alongside this label
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Normal => NORMAL_ADVICE,
            Self::Pneumonia => PNEUMONIA_ADVICE,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complementary class probabilities derived from one model output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    /// P(normal), the raw model output
    pub normal: f32,

    /// P(pneumonia) = 1 - P(normal)
    pub pneumonia: f32,
}

impl Probabilities {
    /// Build the probability pair from P(normal)
    pub fn from_normal(normal: f32) -> Self {
        Self {
            normal,
            pneumonia: 1.0 - normal,
        }
    }

    /// P(normal) as a percentage string with two decimals, e.g. `82.00%`
    pub fn normal_percent(&self) -> String {
        format_percent(f64::from(self.normal))
    }

    /// P(pneumonia) as a percentage string with two decimals
    pub fn pneumonia_percent(&self) -> String {
        format_percent(1.0 - f64::from(self.normal))
    }
}

/// Format a probability in [0, 1] as a percentage with two decimals.
///
/// Scaling happens in f64; an f32 product can round the other way.
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Interpreted result of a single forward pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Selected label
    pub label: ClassLabel,

    /// Both class probabilities
    pub probabilities: Probabilities,

    /// Scalar the model produced
    pub raw_output: f32,
}

impl Prediction {
    /// Interpret the model's scalar output as P(normal).
    ///
    /// The label is `Normal` only when P(normal) is strictly greater than
    /// P(pneumonia); an output of exactly 0.5 is labelled `Pneumonia`.
    pub fn from_raw_output(raw_output: f32) -> Self {
        let probabilities = Probabilities::from_normal(raw_output);
        let label = if probabilities.normal > probabilities.pneumonia {
            ClassLabel::Normal
        } else {
            ClassLabel::Pneumonia
        };

        Self {
            label,
            probabilities,
            raw_output,
        }
    }

    /// Advice text for the selected label
    pub fn advice(&self) -> &'static str {
        self.label.advice()
    }
}
