use axum::{response::IntoResponse, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Banner {
    message: String,
    status: String,
}

pub async fn root() -> impl IntoResponse {
    Json(Banner {
        message: "Sign stream server ready".into(),
        status: "active".into(),
    })
}
