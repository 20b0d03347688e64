use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Error body every route failure is translated into.
///
/// The client surfaces `message` directly, so it must stay human-readable
/// and free of internal detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

/// Main API error enum.
///
/// Every route-level failure becomes one of these variants and is rendered
/// as an HTTP status plus `{"message": ...}`; nothing propagates to the
/// transport layer as an unhandled error.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    Conflict { message: String },

    /// Deliberately undifferentiated: never reveals whether the email exists.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{message}")]
    UnsupportedMediaType { message: String },

    #[error("{message}")]
    PayloadTooLarge { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::UnsupportedMediaType {
            message: message.into(),
        }
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            // Matches the login contract the client already handles.
            ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Database(_) | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// True when a store error is the unique-index violation that signals a
/// duplicate account field; the index is the authority for `Conflict`.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = errors.field_errors().keys().copied().collect();
        fields.sort_unstable();
        ApiError::validation(format!("Invalid value for: {}", fields.join(", ")))
    }
}

impl From<auth_identity::IdentityError> for ApiError {
    fn from(err: auth_identity::IdentityError) -> Self {
        use auth_identity::IdentityError;
        match err {
            IdentityError::TokenExpired => ApiError::unauthorized("Token has expired"),
            IdentityError::InvalidToken => ApiError::unauthorized("Token is not valid"),
            IdentityError::Hashing | IdentityError::MalformedDigest => {
                ApiError::internal("Server error")
            }
            IdentityError::TokenSigning(msg) => {
                error!(error = %msg, "token signing failed");
                ApiError::internal("Server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Store failures carry driver detail the client must never see.
        let message = match &self {
            ApiError::Database(db_err) => {
                error!(error = %db_err, "database error while handling request");
                "Server error".to_string()
            }
            ApiError::Internal { message } => {
                error!(error = %message, "internal error while handling request");
                "Server error".to_string()
            }
            _ => {
                warn!(status = status.as_u16(), error = %self, "request failed");
                self.to_string()
            }
        };

        (status, Json(ApiErrorBody { message })).into_response()
    }
}

/// Type alias for API results.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::InvalidCredentials.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::not_found("User").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::unsupported_media_type("x").status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ApiError::payload_too_large("x").status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_credentials_message_is_undifferentiated() {
        assert_eq!(ApiError::InvalidCredentials.to_string(), "Invalid credentials");
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let response = ApiError::internal("connection pool exhausted on node 3").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Body is rebuilt as a bare "Server error"; the detail only goes to logs.
    }

    #[test]
    fn expired_token_maps_to_unauthorized() {
        let err: ApiError = auth_identity::IdentityError::TokenExpired.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
