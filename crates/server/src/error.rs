use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::orchestrator::IntakeError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Publish failed: {0}")]
    PublishFailed(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Multipart(_) => (StatusCode::BAD_REQUEST, "MultipartError"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IoError"),
            ApiError::Intake(IntakeError::Captioning(_)) => {
                (StatusCode::BAD_GATEWAY, "CaptioningError")
            }
            ApiError::Intake(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ProcessingError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::PublishFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PublishFailed"),
        };

        let error_message = match &self {
            ApiError::Multipart(_) => {
                "Failed to upload file. Please ensure the file is valid and try again.".to_string()
            }
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::PublishFailed(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        tracing::warn!(status = %status_code, "{}", self);
        let response = ApiResponse::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
