/// Unified error types for the photo moderation service
use crate::moderation::ModerationStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the moderation service
#[derive(Error, Debug)]
pub enum ModerationError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(String),

    /// Request validation errors (missing reason/category, bad enum values)
    #[error("Validation error: {0}")]
    Validation(String),

    /// No record with that id at all
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conditional write matched zero rows because the record already left the open states
    #[error("Record {id} already moderated (status: {current_status})")]
    AlreadyModerated {
        id: String,
        current_status: ModerationStatus,
    },

    /// Record exists but is in the wrong state for the requested operation
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        current_status: Option<ModerationStatus>,
    },

    /// External content analysis failed or timed out
    #[error("Content analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    /// Asset relocation/deletion after a decision failed
    #[error("Storage side effect failed: {0}")]
    StorageSideEffect(String),

    /// Notification or alert delivery failed
    #[error("Notification delivery failed: {0}")]
    Notification(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ModerationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| "invalid value".to_string());
                format!("{}: {}", field, detail)
            })
            .collect();
        fields.sort();
        ModerationError::Validation(fields.join("; "))
    }
}

/// JSON error body returned by the API
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<ModerationStatus>,
}

/// Convert ModerationError to HTTP response
impl IntoResponse for ModerationError {
    fn into_response(self) -> Response {
        let (status, error_code, current_status) = match &self {
            ModerationError::Validation(_) => (StatusCode::BAD_REQUEST, "InvalidRequest", None),
            ModerationError::Authentication(_) => {
                (StatusCode::UNAUTHORIZED, "AuthenticationRequired", None)
            }
            ModerationError::Authorization(_) => (StatusCode::FORBIDDEN, "Forbidden", None),
            ModerationError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", None),
            ModerationError::AlreadyModerated { current_status, .. } => (
                StatusCode::CONFLICT,
                "AlreadyModerated",
                Some(*current_status),
            ),
            ModerationError::Conflict { current_status, .. } => {
                (StatusCode::CONFLICT, "Conflict", *current_status)
            }
            ModerationError::AnalysisUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "AnalysisUnavailable", None)
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError", None),
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            current_status,
        });

        (status, body).into_response()
    }
}

/// Result type alias for moderation operations
pub type ModerationResult<T> = Result<T, ModerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_moderated_maps_to_conflict() {
        let err = ModerationError::AlreadyModerated {
            id: "abc".to_string(),
            current_status: ModerationStatus::Approved,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ModerationError::Validation("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ModerationError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ModerationError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
