mod ort_classifier;
mod ort_landmarks;

pub mod classifier;
pub mod config;
pub mod features;
pub mod frame;
pub mod landmarks;
pub mod manifest;
pub mod model;
pub mod pipeline;
pub mod scaler;

pub use features::{ExtractionMode, FeatureExtractor, FeatureVector, NUM_FEATURES};
pub use frame::{DecodeError, Frame};
pub use landmarks::{Landmark, LandmarkError, LandmarkProvider, LandmarkProviderFactory, LandmarkSet};
pub use model::{ModelHandle, ModelHealth, Prediction};
pub use ort_classifier::OrtClassifier;
pub use ort_landmarks::{OrtHandLandmarker, OrtLandmarkerFactory};
pub use pipeline::{Pipeline, PredictionResult};
