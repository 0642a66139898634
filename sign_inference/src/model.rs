use crate::{
    classifier::{Classifier, ClassifierError},
    config::ModelConfig,
    features::{ExtractionMode, FeatureVector},
    manifest::{ManifestError, ModelManifest},
    ort_classifier::OrtClassifier,
    scaler::{ScalerError, StandardScaler},
};
use ndarray::ArrayView2;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("{0}")]
    Manifest(#[from] ManifestError),
    #[error("{0}")]
    Scaler(#[from] ScalerError),
    #[error("{0}")]
    Classifier(#[from] ClassifierError),
    #[error("Scaler fitted on {scaler} features but manifest declares {manifest}")]
    WidthMismatch { scaler: usize, manifest: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyOutcome {
    Label(Prediction),
    ModelUnavailable,
    ProcessingError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelHealth {
    Healthy { version: String },
    Unhealthy { reason: String },
}

struct LoadedModel {
    manifest: ModelManifest,
    scaler: StandardScaler,
    classifier: Box<dyn Classifier>,
}

enum ModelState {
    Ready(LoadedModel),
    Unavailable(String),
}

/// Process-wide classifier and scaler, loaded once and read-only afterwards.
///
/// A failed load is recorded instead of returned: the process keeps serving
/// and every classification reports the model as unavailable.
#[derive(Clone)]
pub struct ModelHandle {
    state: Arc<ModelState>,
}

impl ModelHandle {
    pub fn load(config: &ModelConfig) -> Self {
        match Self::try_load(config) {
            Ok(model) => {
                tracing::info!(
                    version = %model.manifest.version,
                    extraction_mode = model.manifest.extraction_mode.as_str(),
                    labels = model.manifest.labels.len(),
                    "Model loaded"
                );
                Self::from_state(ModelState::Ready(model))
            }
            Err(e) => {
                tracing::error!("Model unavailable, serving in degraded mode: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    fn try_load(config: &ModelConfig) -> Result<LoadedModel, ModelLoadError> {
        let manifest = ModelManifest::from_file(&config.get_manifest_path())?;
        let scaler = StandardScaler::from_file(&config.get_scaler_path())?;
        let classifier = OrtClassifier::new(&config.get_classifier_path(), config.num_instances)?;
        Self::assemble(manifest, scaler, Box::new(classifier))
    }

    fn assemble(
        manifest: ModelManifest,
        scaler: StandardScaler,
        classifier: Box<dyn Classifier>,
    ) -> Result<LoadedModel, ModelLoadError> {
        manifest.validate()?;
        if scaler.num_features() != manifest.num_features {
            return Err(ModelLoadError::WidthMismatch {
                scaler: scaler.num_features(),
                manifest: manifest.num_features,
            });
        }
        Ok(LoadedModel {
            manifest,
            scaler,
            classifier,
        })
    }

    pub fn from_parts(
        manifest: ModelManifest,
        scaler: StandardScaler,
        classifier: impl Classifier,
    ) -> Result<Self, ModelLoadError> {
        let model = Self::assemble(manifest, scaler, Box::new(classifier))?;
        Ok(Self::from_state(ModelState::Ready(model)))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::from_state(ModelState::Unavailable(reason.into()))
    }

    fn from_state(state: ModelState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(*self.state, ModelState::Ready(_))
    }

    /// Feature layout the loaded classifier was trained on.
    pub fn extraction_mode(&self) -> Option<ExtractionMode> {
        match &*self.state {
            ModelState::Ready(model) => Some(model.manifest.extraction_mode),
            ModelState::Unavailable(_) => None,
        }
    }

    pub fn health(&self) -> ModelHealth {
        match &*self.state {
            ModelState::Ready(model) => ModelHealth::Healthy {
                version: model.manifest.version.clone(),
            },
            ModelState::Unavailable(reason) => ModelHealth::Unhealthy {
                reason: reason.clone(),
            },
        }
    }

    pub fn classify(&self, features: &FeatureVector) -> ClassifyOutcome {
        let model = match &*self.state {
            ModelState::Ready(model) => model,
            ModelState::Unavailable(_) => return ClassifyOutcome::ModelUnavailable,
        };

        match model.classify(features) {
            Ok(prediction) => ClassifyOutcome::Label(prediction),
            Err(reason) => {
                tracing::error!("Prediction error: {}", reason);
                ClassifyOutcome::ProcessingError(reason)
            }
        }
    }
}

impl LoadedModel {
    fn classify(&self, features: &FeatureVector) -> Result<Prediction, String> {
        let row = ArrayView2::from_shape((1, features.len()), features.as_slice())
            .map_err(|e| format!("invalid feature shape: {}", e))?;
        let scaled = self.scaler.transform(row).map_err(|e| e.to_string())?;
        let score = self
            .classifier
            .predict(scaled.view())
            .map_err(|e| e.to_string())?;
        let label = self
            .manifest
            .label(score.class_id)
            .ok_or_else(|| format!("class index {} has no label", score.class_id))?;

        Ok(Prediction {
            label: label.to_string(),
            confidence: score.confidence,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        classifier::ClassScore,
        features::{FeatureExtractor, NUM_FEATURES},
        landmarks::{Landmark, LandmarkSet, NUM_LANDMARKS},
    };
    use std::{
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    pub(crate) struct MockClassifier {
        pub class_id: usize,
        pub calls: Arc<AtomicUsize>,
    }

    impl Classifier for MockClassifier {
        fn predict(&self, input: ArrayView2<f32>) -> Result<ClassScore, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if input.shape() != [1, NUM_FEATURES] {
                return Err(ClassifierError::Inference(format!(
                    "bad shape {:?}",
                    input.shape()
                )));
            }
            Ok(ClassScore {
                class_id: self.class_id,
                confidence: Some(0.9),
            })
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict(&self, _input: ArrayView2<f32>) -> Result<ClassScore, ClassifierError> {
            Err(ClassifierError::Inference("boom".into()))
        }
    }

    pub(crate) fn manifest(mode: ExtractionMode) -> ModelManifest {
        ModelManifest {
            version: "test".into(),
            extraction_mode: mode,
            num_features: NUM_FEATURES,
            labels: vec!["A".into(), "B".into(), "C".into()],
        }
    }

    pub(crate) fn identity_scaler() -> StandardScaler {
        StandardScaler::new(vec![0.0; NUM_FEATURES], vec![1.0; NUM_FEATURES]).unwrap()
    }

    fn features() -> FeatureVector {
        let hand = LandmarkSet::new([Landmark::new(0.5, 0.5); NUM_LANDMARKS]);
        FeatureExtractor::new(ExtractionMode::Raw)
            .extract(&[hand])
            .unwrap()
    }

    #[test]
    fn test_classify_returns_label() {
        let calls = Arc::new(AtomicUsize::new(0));
        let classifier = MockClassifier {
            class_id: 1,
            calls: calls.clone(),
        };
        let model =
            ModelHandle::from_parts(manifest(ExtractionMode::Raw), identity_scaler(), classifier)
                .unwrap();

        let outcome = model.classify(&features());

        assert_eq!(
            outcome,
            ClassifyOutcome::Label(Prediction {
                label: "B".into(),
                confidence: Some(0.9),
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            model.health(),
            ModelHealth::Healthy {
                version: "test".into()
            }
        );
    }

    #[test]
    fn test_classifier_failure_becomes_processing_error() {
        let model = ModelHandle::from_parts(
            manifest(ExtractionMode::Raw),
            identity_scaler(),
            FailingClassifier,
        )
        .unwrap();

        assert!(matches!(
            model.classify(&features()),
            ClassifyOutcome::ProcessingError(_)
        ));
    }

    #[test]
    fn test_unknown_class_index_becomes_processing_error() {
        let classifier = MockClassifier {
            class_id: 7,
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let model =
            ModelHandle::from_parts(manifest(ExtractionMode::Raw), identity_scaler(), classifier)
                .unwrap();

        assert!(matches!(
            model.classify(&features()),
            ClassifyOutcome::ProcessingError(_)
        ));
    }

    #[test]
    fn test_scaler_width_must_match_manifest() {
        let scaler = StandardScaler::new(vec![0.0; 42], vec![1.0; 42]).unwrap();
        let result = ModelHandle::from_parts(
            manifest(ExtractionMode::Raw),
            scaler,
            FailingClassifier,
        );

        assert!(matches!(
            result,
            Err(ModelLoadError::WidthMismatch {
                scaler: 42,
                manifest: NUM_FEATURES
            })
        ));
    }

    #[test]
    fn test_missing_artifacts_leave_model_unavailable() {
        let config = ModelConfig {
            model_dir: PathBuf::from("/nonexistent/models"),
            classifier_file: "classifier.onnx".into(),
            scaler_file: "scaler.json".into(),
            manifest_file: "manifest.json".into(),
            num_instances: 1,
        };

        let model = ModelHandle::load(&config);

        assert!(!model.is_available());
        assert_eq!(model.extraction_mode(), None);
        assert!(matches!(model.health(), ModelHealth::Unhealthy { .. }));
        for _ in 0..3 {
            assert_eq!(model.classify(&features()), ClassifyOutcome::ModelUnavailable);
        }
    }
}
