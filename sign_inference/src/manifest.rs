use crate::features::{ExtractionMode, NUM_FEATURES};
use serde::Deserialize;
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Manifest declares {0} features, the extractor produces {NUM_FEATURES}")]
    FeatureCount(usize),
    #[error("Manifest declares no labels")]
    NoLabels,
}

/// Describes a trained classifier: which feature layout it expects and how
/// its class indices map to labels.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelManifest {
    pub version: String,
    pub extraction_mode: ExtractionMode,
    pub num_features: usize,
    pub labels: Vec<String>,
}

impl ModelManifest {
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let reader = BufReader::new(File::open(path)?);
        let manifest: ModelManifest = serde_json::from_reader(reader)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.num_features != NUM_FEATURES {
            return Err(ManifestError::FeatureCount(self.num_features));
        }
        if self.labels.is_empty() {
            return Err(ManifestError::NoLabels);
        }
        Ok(())
    }

    pub fn label(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_manifest() {
        let file = write_manifest(
            r#"{"version": "3", "extraction_mode": "raw", "num_features": 84, "labels": ["A", "B"]}"#,
        );

        let manifest = ModelManifest::from_file(file.path()).unwrap();
        assert_eq!(manifest.extraction_mode, ExtractionMode::Raw);
        assert_eq!(manifest.label(1), Some("B"));
        assert_eq!(manifest.label(2), None);
    }

    #[test]
    fn test_manifest_without_mode_is_rejected() {
        let file = write_manifest(r#"{"version": "3", "num_features": 84, "labels": ["A"]}"#);
        assert!(matches!(
            ModelManifest::from_file(file.path()),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn test_manifest_with_other_width_is_rejected() {
        let file = write_manifest(
            r#"{"version": "1", "extraction_mode": "wrist_relative", "num_features": 42, "labels": ["A"]}"#,
        );
        assert!(matches!(
            ModelManifest::from_file(file.path()),
            Err(ManifestError::FeatureCount(42))
        ));
    }
}
