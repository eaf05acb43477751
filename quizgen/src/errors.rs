use crate::upstream::UpstreamError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The quiz endpoint only accepts POST
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Neither pasted text nor an uploaded file carried any notes
    #[error("No notes provided")]
    NoNotesProvided,

    /// Notes exceed the configured size limit
    #[error("Notes exceed the maximum size of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The multipart upload could not be read
    #[error("Failed to parse upload: {message}")]
    FileParsing { message: String },

    /// The upstream completion call failed
    #[error("Failed to generate quiz: {0}")]
    QuizGeneration(#[source] UpstreamError),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::NoNotesProvided => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::FileParsing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::QuizGeneration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::MethodNotAllowed => "Method not allowed".to_string(),
            Error::NoNotesProvided => "No notes provided".to_string(),
            Error::PayloadTooLarge { .. } => self.to_string(),
            Error::FileParsing { .. } => "File parsing error".to_string(),
            Error::QuizGeneration(_) => "Failed to generate quiz".to_string(),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
        }
    }

    /// Short label used for the rejected-notes metric
    pub fn reason_label(&self) -> &'static str {
        match self {
            Error::MethodNotAllowed => "method_not_allowed",
            Error::NoNotesProvided => "no_notes",
            Error::PayloadTooLarge { .. } => "too_large",
            Error::FileParsing { .. } => "file_parsing",
            Error::QuizGeneration(_) => "upstream",
            Error::Internal { .. } | Error::Other(_) => "internal",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::QuizGeneration(_) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::FileParsing { .. } => {
                tracing::warn!("Upload error: {}", self);
            }
            Error::MethodNotAllowed | Error::NoNotesProvided | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = json!({ "error": self.user_message() });
        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(error: Error) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_bodies_match_wire_contract() {
        let cases = [
            (Error::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
            (Error::NoNotesProvided, StatusCode::BAD_REQUEST, "No notes provided"),
            (
                Error::FileParsing {
                    message: "stream ended early".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "File parsing error",
            ),
            (
                Error::QuizGeneration(UpstreamError::Status {
                    status: reqwest::StatusCode::UNAUTHORIZED,
                    body: "invalid api key".to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate quiz",
            ),
            (
                Error::Other(anyhow::anyhow!("secret detail")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ),
        ];

        for (error, expected_status, expected_message) in cases {
            let (status, body) = render(error).await;
            assert_eq!(status, expected_status);
            assert_eq!(body, json!({ "error": expected_message }));
        }
    }

    #[tokio::test]
    async fn test_payload_too_large_reports_limit() {
        let (status, body) = render(Error::PayloadTooLarge { limit: 16 }).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "Notes exceed the maximum size of 16 bytes");
    }

    #[test]
    fn test_upstream_detail_kept_out_of_user_message() {
        let error = Error::QuizGeneration(UpstreamError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "upstream stack trace".to_string(),
        });
        assert!(error.to_string().contains("upstream stack trace"));
        assert!(!error.user_message().contains("upstream stack trace"));
    }
}
