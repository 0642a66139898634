use ndarray::ArrayView2;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to load classifier: {0}")]
    Load(String),
    #[error("Classifier inference failed: {0}")]
    Inference(String),
    #[error("Classifier returned an unexpected output: {0}")]
    Output(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScore {
    pub class_id: usize,
    pub confidence: Option<f32>,
}

/// Trained model predicting one class per row of scaled features.
pub trait Classifier: Send + Sync + 'static {
    fn predict(&self, input: ArrayView2<f32>) -> Result<ClassScore, ClassifierError>;
}
