use crate::{
    features::{FeatureExtractor, NUM_FEATURES},
    frame::Frame,
    landmarks::LandmarkProvider,
    model::{ClassifyOutcome, ModelHandle, Prediction},
};

/// Outcome of one frame. Everything except `Label` is a sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    Label(Prediction),
    NotDetected,
    ModelUnavailable,
    ProcessingError,
    InvalidFrame,
}

impl PredictionResult {
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionResult::Label(_) => "ok",
            PredictionResult::NotDetected => "not_detected",
            PredictionResult::ModelUnavailable => "model_unavailable",
            PredictionResult::ProcessingError => "processing_error",
            PredictionResult::InvalidFrame => "invalid_frame",
        }
    }
}

/// Synchronous decode, detect, extract and classify pass for one frame.
///
/// CPU bound; callers on an async runtime must run it off the I/O threads.
#[derive(Clone)]
pub struct Pipeline {
    model: ModelHandle,
    extractor: Option<FeatureExtractor>,
}

impl Pipeline {
    pub fn new(model: ModelHandle) -> Self {
        let extractor = model.extraction_mode().map(FeatureExtractor::new);
        Self { model, extractor }
    }

    pub fn process(&self, provider: &mut dyn LandmarkProvider, frame: &Frame) -> PredictionResult {
        let image = match frame.decode() {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Error decoding frame: {}", e);
                return PredictionResult::InvalidFrame;
            }
        };

        let Some(extractor) = self.extractor else {
            return PredictionResult::ModelUnavailable;
        };

        let hands = match provider.detect(&image) {
            Ok(hands) => hands,
            Err(e) => {
                tracing::error!("Landmark detection failed: {}", e);
                return PredictionResult::ProcessingError;
            }
        };

        let features = match extractor.extract(&hands) {
            Some(features) if features.len() == NUM_FEATURES => features,
            _ => return PredictionResult::NotDetected,
        };

        match self.model.classify(&features) {
            ClassifyOutcome::Label(prediction) => PredictionResult::Label(prediction),
            ClassifyOutcome::ModelUnavailable => PredictionResult::ModelUnavailable,
            ClassifyOutcome::ProcessingError(_) => PredictionResult::ProcessingError,
        }
    }
}
