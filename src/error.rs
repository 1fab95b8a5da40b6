//! # Error Handling
//!
//! HTTP-facing error type and how it is converted to a response.
//!
//! Pipeline stages raise [`PipelineError`]; handlers wrap it in [`AppError`]
//! together with any debug breadcrumbs, and actix turns it into JSON through
//! the [`ResponseError`] impl below.
//!
//! ## Status mapping:
//! - Invalid or missing URL → 400
//! - Transcription timeout → 408 (so clients can tell "try again later" apart)
//! - Everything else → 500

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

use crate::pipeline::{FailureDebug, PipelineError};

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **BadRequest**: Client sent invalid data (400 errors)
/// - **Pipeline**: A caption or download stage failed (400/408/500)
/// - **Internal**: Anything else on the server side (500 errors)
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),

    /// A stage failure plus the partial timing collected before it, when the
    /// caller asked for debug output.
    Pipeline {
        error: PipelineError,
        debug: Option<FailureDebug>,
    },

    Internal(String),
}

impl AppError {
    pub fn pipeline(error: PipelineError, debug: Option<FailureDebug>) -> Self {
        AppError::Pipeline { error, debug }
    }

    /// `(status, summary, details)` for this error.
    fn parts(&self) -> (StatusCode, String, Option<String>) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Pipeline { error, .. } => {
                let status = match error {
                    PipelineError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                    e if e.is_timeout() => StatusCode::REQUEST_TIMEOUT,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let details = match error {
                    PipelineError::InvalidUrl(msg) => Some(msg.clone()),
                    other => Some(other.to_string()),
                };
                (status, error.summary().to_string(), details)
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(msg.clone()),
            ),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Pipeline { error, .. } => write!(f, "{}", error),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Converts errors into JSON responses.
///
/// ## JSON Response Format:
/// ```json
/// {
///   "error": "Transcription request timed out",
///   "details": "transcription timed out after 120s",
///   "debug": { "timing": { ... }, "failedAt": "transcription" }
/// }
/// ```
/// `details` is omitted when there is nothing beyond the summary, and
/// `debug` only appears for pipeline failures in debug mode.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.parts().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status, summary, details) = self.parts();

        let mut body = json!({ "error": summary });
        if let Some(details) = details {
            body["details"] = json!(details);
        }
        if let AppError::Pipeline {
            debug: Some(debug), ..
        } = self
        {
            body["debug"] = json!(debug);
        }

        HttpResponse::build(status).json(body)
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::pipeline(err, None)
    }
}

pub type AppResult<T> = Result<T, AppError>;
