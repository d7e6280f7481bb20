use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Expected outcomes of survey operations. None of them is fatal; storage
/// faults are reported generically so the caller can retry.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("no employee with email {0}")]
    NotFound(String),

    #[error("{email} has already submitted {survey_id}")]
    DuplicateSubmission { email: String, survey_id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not logged in")]
    Unauthorized,

    #[error("admin role required")]
    Forbidden,

    #[error("too many requests")]
    RateLimited,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl SurveyError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            SurveyError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            SurveyError::DuplicateSubmission { .. } => (StatusCode::CONFLICT, "already_submitted"),
            SurveyError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            SurveyError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            SurveyError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            SurveyError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            SurveyError::Internal(_) | SurveyError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for SurveyError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();
        let message = match &self {
            SurveyError::Storage(e) => {
                tracing::error!("Survey store failure: {:#}", e);
                "Something went wrong, please try again.".to_string()
            }
            SurveyError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Something went wrong, please try again.".to_string()
            }
            SurveyError::DuplicateSubmission { .. } => {
                "You have already completed this survey. Thank you!".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}
