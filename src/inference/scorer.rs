//! Tile scoring: encoded image bytes -> high-risk probability

use std::sync::Arc;

use super::classifier::Classifier;
use super::preprocess::preprocess;
use crate::config::defaults::{HIGH_RISK_CLASS, MODEL_INPUT_SIZE};
use crate::types::{round4, TileFailure};

/// Decodes tiles and runs them through the shared classifier.
///
/// Decode, resize and inference are CPU-bound and run on the blocking pool
/// so they never stall sibling tile fetches.
#[derive(Clone)]
pub struct TileScorer {
    classifier: Arc<dyn Classifier>,
}

impl TileScorer {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// High-risk probability for one tile, rounded to 4 decimals.
    pub async fn score(&self, bytes: Vec<u8>) -> Result<f64, TileFailure> {
        let classifier = Arc::clone(&self.classifier);
        tokio::task::spawn_blocking(move || score_blocking(classifier.as_ref(), &bytes))
            .await
            .map_err(|e| TileFailure::Classifier(e.to_string()))?
    }
}

fn score_blocking(classifier: &dyn Classifier, bytes: &[u8]) -> Result<f64, TileFailure> {
    let tensor = preprocess(bytes, MODEL_INPUT_SIZE)
        .map_err(|e| TileFailure::Decode(e.to_string()))?;

    let probs = classifier
        .classify(&tensor)
        .map_err(|e| TileFailure::Classifier(e.to_string()))?;

    let high_risk = f64::from(probs[HIGH_RISK_CLASS]);
    if !(0.0..=1.0).contains(&high_risk) {
        return Err(TileFailure::Classifier(format!(
            "probability {high_risk} outside [0, 1]"
        )));
    }
    Ok(round4(high_risk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::classifier::{ClassifierError, NUM_CLASSES};
    use crate::inference::preprocess::tests::solid_png;
    use crate::inference::preprocess::ImageTensor;
    use std::sync::Mutex;

    struct Fixed([f32; NUM_CLASSES]);

    impl Classifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn classify(&self, input: &ImageTensor) -> Result<[f32; NUM_CLASSES], ClassifierError> {
            assert_eq!(input.size(), 224);
            Ok(self.0)
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn classify(&self, _input: &ImageTensor) -> Result<[f32; NUM_CLASSES], ClassifierError> {
            Err(ClassifierError::NonFinite)
        }
    }

    struct Panicking;

    impl Classifier for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }
        fn classify(&self, _input: &ImageTensor) -> Result<[f32; NUM_CLASSES], ClassifierError> {
            panic!("malformed tensor")
        }
    }

    /// Records the size of every tensor it is handed.
    #[derive(Default)]
    struct SizeRecorder(Mutex<Vec<u32>>);

    impl Classifier for SizeRecorder {
        fn name(&self) -> &str {
            "size-recorder"
        }
        fn classify(&self, input: &ImageTensor) -> Result<[f32; NUM_CLASSES], ClassifierError> {
            self.0.lock().unwrap().push(input.size());
            Ok([0.5, 0.5])
        }
    }

    #[tokio::test]
    async fn test_tiles_reach_classifier_at_model_resolution() {
        let recorder = Arc::new(SizeRecorder::default());
        let scorer = TileScorer::new(Arc::clone(&recorder) as Arc<dyn Classifier>);

        for (w, h) in [(350, 350), (512, 256), (17, 17), (224, 224)] {
            scorer.score(solid_png(w, h, [90, 60, 30])).await.unwrap();
        }

        let sizes = recorder.0.lock().unwrap().clone();
        assert_eq!(sizes, vec![224; 4]);
    }

    #[tokio::test]
    async fn test_second_class_is_extracted_and_rounded() {
        let scorer = TileScorer::new(Arc::new(Fixed([0.123_45, 0.876_55])));
        let p = scorer.score(solid_png(350, 350, [40, 90, 20])).await.unwrap();
        assert_eq!(p, round4(f64::from(0.876_55_f32)));
    }

    #[tokio::test]
    async fn test_decode_failure() {
        let scorer = TileScorer::new(Arc::new(Fixed([0.5, 0.5])));
        let err = scorer.score(b"<html>rate limited</html>".to_vec()).await.unwrap_err();
        assert!(matches!(err, TileFailure::Decode(_)));
    }

    #[tokio::test]
    async fn test_classifier_error_is_tile_failure() {
        let scorer = TileScorer::new(Arc::new(Broken));
        let err = scorer.score(solid_png(32, 32, [0, 0, 0])).await.unwrap_err();
        assert!(matches!(err, TileFailure::Classifier(_)));
    }

    #[tokio::test]
    async fn test_classifier_panic_is_contained() {
        let scorer = TileScorer::new(Arc::new(Panicking));
        let err = scorer.score(solid_png(32, 32, [0, 0, 0])).await.unwrap_err();
        assert!(matches!(err, TileFailure::Classifier(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_probability_rejected() {
        let scorer = TileScorer::new(Arc::new(Fixed([-0.5, 1.5])));
        let err = scorer.score(solid_png(32, 32, [0, 0, 0])).await.unwrap_err();
        assert!(matches!(err, TileFailure::Classifier(_)));
    }
}
