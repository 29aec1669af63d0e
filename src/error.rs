use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::repository::RepositoryError;

#[derive(Error, Debug)]
pub enum LabError {
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LabError {
    pub fn validation(message: impl Into<String>) -> Self {
        LabError::Validation(vec![message.into()])
    }
}

impl From<RepositoryError> for LabError {
    fn from(e: RepositoryError) -> Self {
        LabError::Internal(e.to_string())
    }
}

impl ResponseError for LabError {
    fn status_code(&self) -> StatusCode {
        match self {
            LabError::Validation(_) => StatusCode::BAD_REQUEST,
            LabError::NotFound(_) => StatusCode::NOT_FOUND,
            LabError::Conflict(_) => StatusCode::CONFLICT,
            LabError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            LabError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            LabError::Validation(errors) => json!({
                "message": self.to_string(),
                "errors": errors,
            }),
            LabError::Internal(detail) => {
                // details stay in the log
                tracing::error!(error = %detail, "Request failed");
                json!({ "message": "Internal server error." })
            }
            _ => json!({ "message": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
