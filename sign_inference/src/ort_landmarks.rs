use crate::{
    config::{LandmarkConfig, Validatable},
    landmarks::{
        Landmark, LandmarkError, LandmarkProvider, LandmarkProviderFactory, LandmarkSet,
        NUM_LANDMARKS,
    },
};
use image::{imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};

pub const INPUT_SIZE: u32 = 224;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    orig_w: u32,
    orig_h: u32,
}

impl Letterbox {
    fn for_image(width: u32, height: u32) -> Self {
        let scale = INPUT_SIZE as f32 / width.max(height).max(1) as f32;
        let new_w = (width as f32 * scale).round().max(1.0);
        let new_h = (height as f32 * scale).round().max(1.0);
        Self {
            scale,
            pad_x: ((INPUT_SIZE as f32 - new_w) / 2.0).floor().max(0.0),
            pad_y: ((INPUT_SIZE as f32 - new_h) / 2.0).floor().max(0.0),
            orig_w: width,
            orig_h: height,
        }
    }

    /// Maps a point in model input space back to normalized image coordinates.
    fn normalize(&self, x: f32, y: f32) -> Landmark {
        let px = (x - self.pad_x) / self.scale;
        let py = (y - self.pad_y) / self.scale;
        Landmark::new(
            (px / self.orig_w.max(1) as f32).clamp(0.0, 1.0),
            (py / self.orig_h.max(1) as f32).clamp(0.0, 1.0),
        )
    }
}

fn prepare_image(image: &RgbImage) -> (Array4<f32>, Letterbox) {
    let (width, height) = image.dimensions();
    let letterbox = Letterbox::for_image(width, height);
    let new_w = (width as f32 * letterbox.scale).round().max(1.0) as u32;
    let new_h = (height as f32 * letterbox.scale).round().max(1.0) as u32;
    let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let mut canvas = RgbImage::from_pixel(INPUT_SIZE, INPUT_SIZE, Rgb([0, 0, 0]));
    image::imageops::overlay(
        &mut canvas,
        &resized,
        letterbox.pad_x as i64,
        letterbox.pad_y as i64,
    );

    let mut input = Array4::<f32>::zeros((1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        input[[0, y as usize, x as usize, 0]] = r as f32 / 255.0;
        input[[0, y as usize, x as usize, 1]] = g as f32 / 255.0;
        input[[0, y as usize, x as usize, 2]] = b as f32 / 255.0;
    }

    (input, letterbox)
}

fn decode_landmarks(flat: &[f32], letterbox: &Letterbox) -> Result<LandmarkSet, LandmarkError> {
    if flat.len() < NUM_LANDMARKS * 3 {
        return Err(LandmarkError::Inference(format!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            NUM_LANDMARKS * 3
        )));
    }

    let points: Vec<Landmark> = flat
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|chunk| letterbox.normalize(chunk[0], chunk[1]))
        .collect();
    LandmarkSet::try_from(points)
}

/// Hand-pose network run on the whole letterboxed frame. Reports at most
/// one hand per frame.
pub struct OrtHandLandmarker {
    session: Session,
    min_confidence: f32,
}

impl OrtHandLandmarker {
    pub fn new(config: &LandmarkConfig) -> Result<Self, LandmarkError> {
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.with_intra_threads(config.intra_threads))
            .and_then(|builder| builder.commit_from_file(&config.model_file))
            .map_err(|e| {
                LandmarkError::ModelLoad(format!("{}: {}", config.model_file.display(), e))
            })?;

        Ok(Self {
            session,
            min_confidence: config.min_confidence,
        })
    }
}

impl LandmarkProvider for OrtHandLandmarker {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<LandmarkSet>, LandmarkError> {
        let (input, letterbox) = prepare_image(image);
        let tensor = Tensor::from_array(input)
            .map_err(|e| LandmarkError::Inference(format!("failed to build tensor: {}", e)))?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(|e| LandmarkError::Inference(e.to_string()))?;

        if outputs.len() < 2 {
            return Err(LandmarkError::Inference(format!(
                "expected landmark and presence outputs, got {}",
                outputs.len()
            )));
        }

        let scores = outputs[1]
            .try_extract_array::<f32>()
            .map_err(|e| LandmarkError::Inference(format!("unreadable presence output: {}", e)))?;
        let presence = presence_score(scores.iter().copied())?;
        if presence < self.min_confidence {
            return Ok(Vec::new());
        }

        let coords = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| LandmarkError::Inference(e.to_string()))?;
        let flat: Vec<f32> = coords.iter().copied().collect();

        Ok(vec![decode_landmarks(&flat, &letterbox)?])
    }
}

impl Drop for OrtHandLandmarker {
    fn drop(&mut self) {
        tracing::debug!("Releasing hand landmark session");
    }
}

fn presence_score(mut scores: impl Iterator<Item = f32>) -> Result<f32, LandmarkError> {
    scores
        .next()
        .ok_or_else(|| LandmarkError::Inference("presence output is empty".into()))
}

/// Opens a fresh runtime session for every stream.
pub struct OrtLandmarkerFactory {
    config: LandmarkConfig,
}

impl OrtLandmarkerFactory {
    pub fn new(config: LandmarkConfig) -> Result<Self, LandmarkError> {
        config.validate().map_err(LandmarkError::ModelNotFound)?;
        Ok(Self { config })
    }
}

impl LandmarkProviderFactory for OrtLandmarkerFactory {
    fn create(&self) -> Result<Box<dyn LandmarkProvider>, LandmarkError> {
        Ok(Box::new(OrtHandLandmarker::new(&self.config)?))
    }
}
