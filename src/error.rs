use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("deletion log write failed: {0}")]
    DeletionLog(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Database(_) | ApiError::DeletionLog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Internal details stay out of the response body.
            ApiError::Database(err) => {
                tracing::error!(error = %err, "database error");
                "An unexpected error occurred".to_string()
            }
            ApiError::DeletionLog(err) => {
                tracing::error!(error = %err, "deletion log write failed");
                "An unexpected error occurred".to_string()
            }
            ApiError::Validation(msg) => msg.clone(),
        };

        let body = Json(json!({
            "error": message,
            "statusCode": status.as_u16(),
            "timestamp": Utc::now(),
        }));

        (status, body).into_response()
    }
}
