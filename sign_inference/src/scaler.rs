use ndarray::{Array2, ArrayView2, Axis};
use serde::Deserialize;
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScalerError {
    #[error("Failed to read scaler file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse scaler file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Scaler mean has {mean} values but scale has {scale}")]
    Inconsistent { mean: usize, scale: usize },
    #[error("Scaler expects {expected} features, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
}

/// Fitted standardisation, `(x - mean) / scale` per column.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Result<Self, ScalerError> {
        if mean.len() != scale.len() {
            return Err(ScalerError::Inconsistent {
                mean: mean.len(),
                scale: scale.len(),
            });
        }
        Ok(Self { mean, scale })
    }

    pub fn from_file(path: &Path) -> Result<Self, ScalerError> {
        let reader = BufReader::new(File::open(path)?);
        let parsed: StandardScaler = serde_json::from_reader(reader)?;
        Self::new(parsed.mean, parsed.scale)
    }

    pub fn num_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, input: ArrayView2<f32>) -> Result<Array2<f32>, ScalerError> {
        let width = input.len_of(Axis(1));
        if width != self.num_features() {
            return Err(ScalerError::WidthMismatch {
                expected: self.num_features(),
                actual: width,
            });
        }

        let mut output = input.to_owned();
        for mut row in output.axis_iter_mut(Axis(0)) {
            for ((value, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
                // constant columns were fitted with a zero scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                *value = (*value - mean) / scale;
            }
        }
        Ok(output)
    }
}
