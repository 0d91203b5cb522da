//! Error types for VoiceDate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Auth provider errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or malformed authorization header")]
    MissingToken,

    #[error("Token rejected by auth provider")]
    InvalidToken,

    #[error("Auth provider request failed: {0}")]
    Provider(String),
}

/// Errors from the voice-cloning / conversational-agent platform.
#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    #[error("{vendor} request failed: {reason}")]
    RequestFailed { vendor: String, reason: String },

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from {vendor}: {reason}")]
    InvalidResponse { vendor: String, reason: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },
}

/// Agent prompt generation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
}

/// Error returned from HTTP handlers.
///
/// Rendered as `{"error": "<message>"}` with the matching status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken => {
                Self::unauthorized("Unauthorized - Missing or invalid authorization header")
            }
            AuthError::InvalidToken => Self::unauthorized("Unauthorized - Invalid token"),
            AuthError::Provider(reason) => {
                tracing::error!(error = %reason, "Auth provider unavailable");
                Self::unauthorized("Unauthorized - Invalid token")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<VendorError> for ApiError {
    fn from(e: VendorError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<PromptError> for ApiError {
    fn from(e: PromptError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_status_codes() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_errors_map_to_401_messages() {
        let missing: ApiError = AuthError::MissingToken.into();
        assert_eq!(
            missing,
            ApiError::unauthorized("Unauthorized - Missing or invalid authorization header")
        );

        let invalid: ApiError = AuthError::InvalidToken.into();
        assert_eq!(invalid, ApiError::unauthorized("Unauthorized - Invalid token"));
    }

    #[test]
    fn vendor_api_error_surfaces_message() {
        let err: ApiError = VendorError::Api {
            status: 422,
            message: "Audio too short".into(),
        }
        .into();
        assert_eq!(err, ApiError::internal("Audio too short"));
    }

    #[test]
    fn prompt_error_is_bad_request() {
        let err: ApiError = PromptError::MissingField {
            field: "user_profile_prompt",
        }
        .into();
        assert_eq!(err, ApiError::bad_request("user_profile_prompt is required"));
    }
}
