use serde::Deserialize;
use std::path::PathBuf;

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    #[serde(default = "default_classifier_file")]
    pub classifier_file: String,
    #[serde(default = "default_scaler_file")]
    pub scaler_file: String,
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
}

fn default_classifier_file() -> String {
    "classifier.onnx".into()
}

fn default_scaler_file() -> String {
    "scaler.json".into()
}

fn default_manifest_file() -> String {
    "manifest.json".into()
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ModelConfig {
    pub fn get_classifier_path(&self) -> PathBuf {
        self.model_dir.join(&self.classifier_file)
    }

    pub fn get_scaler_path(&self) -> PathBuf {
        self.model_dir.join(&self.scaler_file)
    }

    pub fn get_manifest_path(&self) -> PathBuf {
        self.model_dir.join(&self.manifest_file)
    }
}

/// Single-hand pose model for the bundled tracker. Two-handed signs only get
/// their second hand (features 42..84) from a provider that detects several.
#[derive(Debug, Deserialize, Clone)]
pub struct LandmarkConfig {
    pub model_file: PathBuf,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

fn default_min_confidence() -> f32 {
    0.5
}

fn default_intra_threads() -> usize {
    1
}

impl Validatable for LandmarkConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.model_file.exists() {
            return Err(format!(
                "Landmark model file not found: {:?}",
                self.model_file
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            ));
        }
        Ok(())
    }
}
