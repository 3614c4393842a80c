//! Tile inference module
//!
//! ## Architecture
//!
//! - **preprocess**: decode, resize to the fixed model input, normalise
//! - **Classifier**: trait seam for the model. `MobileNetV2` (candle) is the
//!   trained backend; `LinearHead` is a demo head for wiring checks
//! - **TileScorer**: runs preprocessing and inference on the blocking pool and
//!   reports the high-risk probability

pub mod preprocess;
pub mod classifier;
#[cfg(feature = "mobilenet")]
pub mod mobilenet;
pub mod scorer;

use std::sync::Arc;

use tracing::info;

use crate::config::{ClassifierBackend, ClassifierConfig};

pub use classifier::{Classifier, ClassifierError, LinearHead};
#[cfg(feature = "mobilenet")]
pub use mobilenet::MobileNetV2;
pub use preprocess::ImageTensor;
pub use scorer::TileScorer;

/// Build the configured classifier backend.
pub fn load_classifier(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, ClassifierError> {
    let classifier: Arc<dyn Classifier> = match config.backend {
        ClassifierBackend::MobilenetV2 => load_mobilenet(config)?,
        ClassifierBackend::LinearHead => Arc::new(LinearHead::load(&config.model_path)?),
    };
    info!(
        backend = %config.backend,
        classifier = classifier.name(),
        "Classifier ready"
    );
    Ok(classifier)
}

#[cfg(feature = "mobilenet")]
fn load_mobilenet(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, ClassifierError> {
    Ok(Arc::new(MobileNetV2::load(&config.model_path, config.device)?))
}

#[cfg(not(feature = "mobilenet"))]
fn load_mobilenet(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, ClassifierError> {
    Err(ClassifierError::BackendUnavailable(config.backend.to_string()))
}
