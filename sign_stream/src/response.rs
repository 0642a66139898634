use crate::config::{ResponseConfig, ResponseFormat};
use axum::extract::ws::Message;
use serde::Serialize;
use sign_inference::PredictionResult;

#[derive(Serialize)]
struct StatusMessage<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

#[derive(Serialize)]
struct PredictionMessage<'a> {
    status: &'a str,
    prediction: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
}

/// Renders outbound messages consistently for one deployment.
#[derive(Debug, Clone)]
pub struct Responder {
    config: ResponseConfig,
}

impl Responder {
    pub fn new(config: ResponseConfig) -> Self {
        Self { config }
    }

    pub fn greeting(&self, message: &str) -> Message {
        status_message("connected", Some(message))
    }

    pub fn keep_alive(&self) -> Message {
        status_message("alive", None)
    }

    pub fn prediction(&self, result: &PredictionResult) -> Message {
        let (text, confidence) = match result {
            PredictionResult::Label(prediction) => (prediction.label.as_str(), prediction.confidence),
            PredictionResult::NotDetected => (self.config.not_detected.as_str(), None),
            PredictionResult::ModelUnavailable => (self.config.model_unavailable.as_str(), None),
            PredictionResult::ProcessingError => (self.config.processing_error.as_str(), None),
            PredictionResult::InvalidFrame => (self.config.invalid_frame.as_str(), None),
        };

        match self.config.format {
            ResponseFormat::Text => Message::Text(text.into()),
            ResponseFormat::Json => json_message(&PredictionMessage {
                status: result.kind(),
                prediction: text,
                confidence,
            }),
        }
    }
}

fn status_message(status: &str, message: Option<&str>) -> Message {
    json_message(&StatusMessage { status, message })
}

fn json_message<T: Serialize>(value: &T) -> Message {
    let body = serde_json::to_string(value).unwrap_or_default();
    Message::Text(body.into())
}
