use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use image::RgbImage;
use thiserror::Error;

const BASE64_MARKER: &str = "base64,";

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Empty frame payload")]
    Empty,
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Error decoding image: {0}")]
    Image(#[from] image::ImageError),
}

/// One inbound video frame as received from the client.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Encoded image bytes (jpeg, png, ...).
    Binary(Bytes),
    /// Base64 image, optionally behind a `data:image/jpeg;base64,` style prefix.
    Text(String),
}

impl Frame {
    pub fn decode(&self) -> Result<RgbImage, DecodeError> {
        match self {
            Frame::Binary(data) => decode_image(data),
            Frame::Text(text) => {
                let data = decode_base64(text)?;
                decode_image(&data)
            }
        }
    }
}

fn decode_base64(text: &str) -> Result<Vec<u8>, DecodeError> {
    let payload = match text.find(BASE64_MARKER) {
        Some(index) => &text[index + BASE64_MARKER.len()..],
        None => text,
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(STANDARD.decode(payload)?)
}

fn decode_image(data: &[u8]) -> Result<RgbImage, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }
    let image = image::ImageReader::new(std::io::Cursor::new(data))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .decode()?;
    Ok(image.to_rgb8())
}
