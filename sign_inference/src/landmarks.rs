use image::RgbImage;
use thiserror::Error;

pub const NUM_LANDMARKS: usize = 21;
pub const WRIST: usize = 0;

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("Expected {NUM_LANDMARKS} landmarks per hand, got {0}")]
    WrongLandmarkCount(usize),
    #[error("Landmark model not found: {0}")]
    ModelNotFound(String),
    #[error("Failed to load landmark model: {0}")]
    ModelLoad(String),
    #[error("Landmark inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The 21-point skeleton of one detected hand, in normalized image coordinates.
///
/// Carries no identity: sets are recomputed for every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Landmark; NUM_LANDMARKS],
}

impl LandmarkSet {
    pub fn new(points: [Landmark; NUM_LANDMARKS]) -> Self {
        Self { points }
    }

    pub fn wrist(&self) -> Landmark {
        self.points[WRIST]
    }

    pub fn points(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.points
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
    type Error = LandmarkError;

    fn try_from(points: Vec<Landmark>) -> Result<Self, Self::Error> {
        let count = points.len();
        let points: [Landmark; NUM_LANDMARKS] = points
            .try_into()
            .map_err(|_| LandmarkError::WrongLandmarkCount(count))?;
        Ok(Self { points })
    }
}

/// Hand tracker bound to a single stream.
///
/// Implementations may keep tracking state between calls, so one instance
/// must never be shared between sessions.
pub trait LandmarkProvider: Send {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<LandmarkSet>, LandmarkError>;
}

pub trait LandmarkProviderFactory: Send + Sync + 'static {
    fn create(&self) -> Result<Box<dyn LandmarkProvider>, LandmarkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_set_requires_21_points() {
        let short = vec![Landmark::new(0.1, 0.2); 20];
        let err = LandmarkSet::try_from(short).unwrap_err();
        assert!(matches!(err, LandmarkError::WrongLandmarkCount(20)));

        let mut points = vec![Landmark::new(0.0, 0.0); NUM_LANDMARKS];
        points[WRIST] = Landmark::new(0.3, 0.4);
        let set = LandmarkSet::try_from(points).unwrap();
        assert_eq!(set.wrist(), Landmark::new(0.3, 0.4));
    }
}
