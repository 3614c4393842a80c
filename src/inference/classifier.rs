//! Classifier seam and the linear demo head.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::preprocess::{ImageTensor, NUM_CHANNELS};
use crate::config::defaults::MODEL_INPUT_SIZE;

/// Number of output classes: `[low risk, high risk]`.
pub const NUM_CLASSES: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("input tensor is {actual}px, classifier expects {expected}px")]
    InputSize { expected: u32, actual: u32 },
    #[error("classifier produced a non-finite distribution")]
    NonFinite,
    #[error("failed to read weights ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("failed to parse weights ({}): {}", .0.display(), .1)]
    Parse(PathBuf, serde_json::Error),
    #[error("invalid weights: {0}")]
    InvalidWeights(String),
    #[error("model weights are missing tensor `{0}`")]
    MissingTensor(String),
    #[error("classifier backend `{0}` is not compiled into this build")]
    BackendUnavailable(String),
    #[cfg(feature = "mobilenet")]
    #[error("model backend error: {0}")]
    Backend(#[from] candle_core::Error),
}

/// Trait for image classifiers.
///
/// Implementations are loaded once at startup and shared read-only across
/// every concurrent tile through an `Arc`, so `classify` takes `&self` and
/// must be safe to call from several threads at once. Calls happen on the
/// blocking thread pool. Inputs are always
/// [`MODEL_INPUT_SIZE`](crate::config::defaults::MODEL_INPUT_SIZE) square.
pub trait Classifier: Send + Sync + 'static {
    /// Classifier name for logging and `/health`.
    fn name(&self) -> &str;

    /// Class probability distribution `[low, high]` for one tile.
    fn classify(&self, input: &ImageTensor) -> Result<[f32; NUM_CLASSES], ClassifierError>;
}

pub(crate) fn check_input_size(input: &ImageTensor) -> Result<(), ClassifierError> {
    if input.size() == MODEL_INPUT_SIZE {
        Ok(())
    } else {
        Err(ClassifierError::InputSize {
            expected: MODEL_INPUT_SIZE,
            actual: input.size(),
        })
    }
}

/// Demo head: softmax over a linear layer applied to mean-pooled channel
/// features. Useful for wiring checks and tests, not for real risk scores.
///
/// Weights are stored as JSON:
///
/// ```json
/// { "weights": [[w_r, w_g, w_b], [w_r, w_g, w_b]], "bias": [b0, b1] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearHead {
    pub weights: [[f32; NUM_CHANNELS]; NUM_CLASSES],
    pub bias: [f32; NUM_CLASSES],
}

impl LinearHead {
    /// Load and validate weights from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ClassifierError::Io(path.to_path_buf(), e))?;
        let head: Self = serde_json::from_str(&contents)
            .map_err(|e| ClassifierError::Parse(path.to_path_buf(), e))?;
        head.validate()?;
        info!(path = %path.display(), "Loaded linear head weights");
        warn!("Linear head is a demo head; risk verdicts are not model-backed");
        Ok(head)
    }

    pub fn validate(&self) -> Result<(), ClassifierError> {
        let all_finite = self
            .weights
            .iter()
            .flatten()
            .chain(self.bias.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(ClassifierError::InvalidWeights(
                "weights and bias must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl Classifier for LinearHead {
    fn name(&self) -> &str {
        "linear-head (demo)"
    }

    fn classify(&self, input: &ImageTensor) -> Result<[f32; NUM_CLASSES], ClassifierError> {
        check_input_size(input)?;

        let features = input.channel_means();
        let logits: [f32; NUM_CLASSES] = std::array::from_fn(|k| {
            self.weights[k]
                .iter()
                .zip(features.iter())
                .map(|(w, x)| w * x)
                .sum::<f32>()
                + self.bias[k]
        });

        softmax(logits)
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: [f32; NUM_CLASSES]) -> Result<[f32; NUM_CLASSES], ClassifierError> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = logits.map(|l| (l - max).exp());
    let sum: f32 = exps.iter().sum();
    let probs = exps.map(|e| e / sum);
    if probs.iter().all(|p| p.is_finite()) {
        Ok(probs)
    } else {
        Err(ClassifierError::NonFinite)
    }
}
