use crate::classifier::{ClassScore, Classifier, ClassifierError};
use ndarray::ArrayView2;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// ONNX export of the sign classifier.
///
/// Output 0 holds the predicted class index, output 1 (when present) the
/// per-class probabilities. Requests are spread round-robin over a fixed
/// pool of runtime sessions.
#[derive(Clone)]
pub struct OrtClassifier {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
}

impl OrtClassifier {
    pub fn new(model_path: &Path, num_instances: usize) -> Result<Self, ClassifierError> {
        let sessions = (0..num_instances.max(1))
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .with_intra_threads(1)?
                    .commit_from_file(model_path)?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()
            .map_err(|e| ClassifierError::Load(format!("{}: {}", model_path.display(), e)))?;

        tracing::info!("Created {} classifier sessions", sessions.len());

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl Classifier for OrtClassifier {
    fn predict(&self, input: ArrayView2<f32>) -> Result<ClassScore, ClassifierError> {
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session = self.sessions[index]
            .lock()
            .map_err(|e| ClassifierError::Inference(format!("session mutex poisoned: {}", e)))?;

        let tensor = Tensor::from_array(input.to_owned())
            .map_err(|e| ClassifierError::Inference(format!("failed to build tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        if outputs.len() < 1 {
            return Err(ClassifierError::Output("model returned no outputs".into()));
        }

        let labels = outputs[0]
            .try_extract_array::<i64>()
            .map_err(|e| ClassifierError::Output(format!("label tensor: {}", e)))?;
        let class_id = labels
            .iter()
            .next()
            .copied()
            .ok_or_else(|| ClassifierError::Output("empty label tensor".into()))?;
        let class_id = usize::try_from(class_id)
            .map_err(|_| ClassifierError::Output(format!("negative class index {}", class_id)))?;

        let confidence = if outputs.len() > 1 {
            outputs[1]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|probs| probs.iter().copied().reduce(f32::max))
        } else {
            None
        };

        Ok(ClassScore {
            class_id,
            confidence,
        })
    }
}
