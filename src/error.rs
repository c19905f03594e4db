use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::tavus::TavusError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Configuration(String),

    #[error("Timeout connecting to Tavus API. Please try again.")]
    ProviderTimeout,

    #[error("Error connecting to Tavus API: {0}")]
    ProviderUnavailable(String),

    #[error("Tavus API error: {detail}")]
    ProviderRejected { status: u16, detail: String },
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            // Surface whatever status the provider returned
            ApiError::ProviderRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

impl From<TavusError> for ApiError {
    fn from(err: TavusError) -> Self {
        match err {
            TavusError::Timeout => ApiError::ProviderTimeout,
            TavusError::Connection(msg) => ApiError::ProviderUnavailable(msg),
            TavusError::Rejected { status, detail } => {
                ApiError::ProviderRejected { status, detail }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = json!({
            "error": true,
            "status_code": status.as_u16(),
            "message": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}
