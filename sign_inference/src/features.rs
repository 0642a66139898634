use crate::landmarks::{LandmarkSet, NUM_LANDMARKS};
use serde::Deserialize;

pub const MAX_HANDS: usize = 2;
pub const FEATURES_PER_HAND: usize = NUM_LANDMARKS * 2;
pub const NUM_FEATURES: usize = MAX_HANDS * FEATURES_PER_HAND;

/// Coordinate layout a classifier was trained on. Declared by the model
/// manifest, never chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Absolute `(x, y)` per landmark.
    Raw,
    /// `(x, y)` minus the hand's wrist point.
    WristRelative,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::Raw => "raw",
            ExtractionMode::WristRelative => "wrist_relative",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f32; NUM_FEATURES],
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    mode: ExtractionMode,
}

impl FeatureExtractor {
    pub fn new(mode: ExtractionMode) -> Self {
        Self { mode }
    }

    /// Returns `None` when no hand was detected.
    ///
    /// Hands are laid out left to right by wrist x; hands past the second are
    /// dropped and a missing second hand is zero-filled.
    pub fn extract(&self, hands: &[LandmarkSet]) -> Option<FeatureVector> {
        if hands.is_empty() {
            return None;
        }

        let mut ordered: Vec<&LandmarkSet> = hands.iter().collect();
        // stable: equal wrists keep detection order
        ordered.sort_by(|a, b| a.wrist().x.total_cmp(&b.wrist().x));

        let mut values = [0.0f32; NUM_FEATURES];
        let coords = ordered
            .into_iter()
            .take(MAX_HANDS)
            .flat_map(|hand| self.hand_coordinates(hand));

        for (slot, value) in values.iter_mut().zip(coords) {
            *slot = value;
        }

        Some(FeatureVector { values })
    }

    fn hand_coordinates<'a>(&self, hand: &'a LandmarkSet) -> impl Iterator<Item = f32> + 'a {
        let (ref_x, ref_y) = match self.mode {
            ExtractionMode::Raw => (0.0, 0.0),
            ExtractionMode::WristRelative => {
                let wrist = hand.wrist();
                (wrist.x, wrist.y)
            }
        };
        hand.points()
            .iter()
            .flat_map(move |point| [point.x - ref_x, point.y - ref_y])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Landmark;

    fn hand_at(wrist_x: f32, wrist_y: f32) -> LandmarkSet {
        let mut points = [Landmark::new(0.0, 0.0); NUM_LANDMARKS];
        for (i, point) in points.iter_mut().enumerate() {
            *point = Landmark::new(wrist_x + i as f32 * 0.01, wrist_y + i as f32 * 0.02);
        }
        LandmarkSet::new(points)
    }

    #[test]
    fn test_no_hands_yields_no_features() {
        for mode in [ExtractionMode::Raw, ExtractionMode::WristRelative] {
            assert!(FeatureExtractor::new(mode).extract(&[]).is_none());
        }
    }

    #[test]
    fn test_single_hand_wrist_relative() {
        let mut points = [Landmark::new(0.5, 0.5); NUM_LANDMARKS];
        points[1] = Landmark::new(0.6, 0.5);
        let hand = LandmarkSet::new(points);

        let features = FeatureExtractor::new(ExtractionMode::WristRelative)
            .extract(&[hand])
            .unwrap();
        let values = features.as_slice();

        assert_eq!(values.len(), NUM_FEATURES);
        assert_eq!(&values[0..2], &[0.0, 0.0]);
        assert!((values[2] - 0.1).abs() < 1e-6);
        assert_eq!(values[3], 0.0);
        assert!(values[FEATURES_PER_HAND..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_single_hand_raw_keeps_absolute_coordinates() {
        let hand = hand_at(0.4, 0.3);
        let features = FeatureExtractor::new(ExtractionMode::Raw)
            .extract(std::slice::from_ref(&hand))
            .unwrap();
        let values = features.as_slice();

        let expected: Vec<f32> = hand.points().iter().flat_map(|p| [p.x, p.y]).collect();
        assert_eq!(&values[..FEATURES_PER_HAND], expected.as_slice());
        assert!(values[FEATURES_PER_HAND..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_two_hands_ordered_by_wrist_x() {
        let right = hand_at(0.7, 0.1);
        let left = hand_at(0.2, 0.6);
        let extractor = FeatureExtractor::new(ExtractionMode::Raw);

        let forward = extractor.extract(&[left.clone(), right.clone()]).unwrap();
        let reversed = extractor.extract(&[right, left]).unwrap();

        assert_eq!(forward, reversed);
        assert!((forward.as_slice()[0] - 0.2).abs() < 1e-6);
        assert!((forward.as_slice()[FEATURES_PER_HAND] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_equal_wrists_keep_detection_order() {
        let first = hand_at(0.5, 0.1);
        let mut points = *hand_at(0.5, 0.8).points();
        points[4] = Landmark::new(0.9, 0.9);
        let second = LandmarkSet::new(points);
        assert_eq!(first.wrist().x, second.wrist().x);

        for mode in [ExtractionMode::Raw, ExtractionMode::WristRelative] {
            let extractor = FeatureExtractor::new(mode);
            let only_first = extractor.extract(std::slice::from_ref(&first)).unwrap();
            let only_second = extractor.extract(std::slice::from_ref(&second)).unwrap();

            let both = extractor.extract(&[first.clone(), second.clone()]).unwrap();
            assert_eq!(
                &both.as_slice()[..FEATURES_PER_HAND],
                &only_first.as_slice()[..FEATURES_PER_HAND]
            );
            assert_eq!(
                &both.as_slice()[FEATURES_PER_HAND..],
                &only_second.as_slice()[..FEATURES_PER_HAND]
            );

            let swapped = extractor.extract(&[second.clone(), first.clone()]).unwrap();
            assert_eq!(
                &swapped.as_slice()[..FEATURES_PER_HAND],
                &only_second.as_slice()[..FEATURES_PER_HAND]
            );
        }
    }

    #[test]
    fn test_extra_hands_are_dropped() {
        let hands = vec![hand_at(0.9, 0.1), hand_at(0.1, 0.1), hand_at(0.5, 0.1)];
        let features = FeatureExtractor::new(ExtractionMode::Raw)
            .extract(&hands)
            .unwrap();
        let values = features.as_slice();

        assert_eq!(features.len(), NUM_FEATURES);
        assert!((values[0] - 0.1).abs() < 1e-6);
        assert!((values[FEATURES_PER_HAND] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let hands = vec![hand_at(0.6, 0.2), hand_at(0.3, 0.4)];
        let extractor = FeatureExtractor::new(ExtractionMode::WristRelative);

        let first = extractor.extract(&hands).unwrap();
        let second = extractor.extract(&hands).unwrap();

        let first_bits: Vec<u32> = first.as_slice().iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u32> = second.as_slice().iter().map(|v| v.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn test_extraction_mode_from_manifest_name() {
        let mode: ExtractionMode = serde_json::from_str("\"wrist_relative\"").unwrap();
        assert_eq!(mode, ExtractionMode::WristRelative);
        assert!(serde_json::from_str::<ExtractionMode>("\"relative\"").is_err());
    }
}
