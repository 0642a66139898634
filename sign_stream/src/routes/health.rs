use crate::server::SharedState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use sign_inference::ModelHealth;

#[derive(Serialize, Deserialize)]
pub struct Status {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

pub async fn healthcheck(State(state): State<SharedState>) -> impl IntoResponse {
    match state.model.health() {
        ModelHealth::Healthy { version } => (
            StatusCode::OK,
            Json(Status {
                status: "healthy".into(),
                model_version: Some(version),
                reason: None,
            }),
        ),
        ModelHealth::Unhealthy { reason } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Status {
                status: "unhealthy".into(),
                model_version: None,
                reason: Some(reason),
            }),
        ),
    }
}
