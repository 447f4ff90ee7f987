use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Request body too large, max allowed: {0} bytes")]
    RequestTooLarge(usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        ClassifierError::Decode(err.to_string())
    }
}

impl ClassifierError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClassifierError::Decode(_) => StatusCode::BAD_REQUEST,
            ClassifierError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ClassifierError::Base64(_) => StatusCode::BAD_REQUEST,
            ClassifierError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            ClassifierError::RequestTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ClassifierError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ClassifierError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            ClassifierError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ClassifierError::Decode(_) => "DECODE_ERROR",
            ClassifierError::ModelNotLoaded => "MODEL_NOT_LOADED",
            ClassifierError::Inference(_) => "INFERENCE_ERROR",
            ClassifierError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            ClassifierError::InvalidInput(_) => "INVALID_INPUT",
            ClassifierError::FileTooLarge(_, _) | ClassifierError::RequestTooLarge(_) => {
                "FILE_TOO_LARGE"
            }
            ClassifierError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ClassifierError::Config(_) => "CONFIG_ERROR",
            ClassifierError::Io(_) => "IO_ERROR",
            ClassifierError::Base64(_) => "BASE64_DECODE_ERROR",
            ClassifierError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ClassifierError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // 移动端直接读取 `error` 字段作为提示文本
        let error_response = serde_json::json!({
            "error": self.to_string(),
            "code": self.error_code(),
        });

        if status.is_server_error() {
            tracing::error!("Request failed: {} ({})", self, status);
        } else {
            tracing::warn!("Request rejected: {} ({})", self, status);
        }

        (status, axum::Json(error_response)).into_response()
    }
}
