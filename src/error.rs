use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Why a credential was refused. Kept distinct internally for logging and
/// tests; every variant is surfaced to the client as 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    InvalidCredentials,
    MissingRefreshToken,
    UnknownRefreshToken,
    RevokedRefreshToken,
    ExpiredRefreshToken,
    UserGone,
    MissingAccessToken,
    InvalidAccessToken,
}

impl RejectReason {
    pub fn client_message(self) -> &'static str {
        match self {
            RejectReason::InvalidCredentials => "Invalid credentials",
            RejectReason::MissingRefreshToken => "No refresh token cookie present",
            RejectReason::UnknownRefreshToken => "Invalid refresh token",
            RejectReason::RevokedRefreshToken => "Refresh token has been revoked",
            RejectReason::ExpiredRefreshToken => "Refresh token has expired",
            RejectReason::UserGone => "User not found",
            // Signature, expiry and structure failures are indistinguishable to callers
            RejectReason::MissingAccessToken | RejectReason::InvalidAccessToken => {
                "Invalid or missing access token"
            }
        }
    }

    /// Short label used for log fields and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::InvalidCredentials => "invalid_credentials",
            RejectReason::MissingRefreshToken => "missing",
            RejectReason::UnknownRefreshToken => "unknown",
            RejectReason::RevokedRefreshToken => "revoked",
            RejectReason::ExpiredRefreshToken => "expired",
            RejectReason::UserGone => "user_gone",
            RejectReason::MissingAccessToken => "missing_access_token",
            RejectReason::InvalidAccessToken => "invalid_access_token",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.client_message())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No account found for email {0}")]
    UserNotFound(String),

    #[error("{0}")]
    Unauthorized(RejectReason),

    #[error("{0}")]
    Validation(String),

    #[error("Setup already completed. Users already exist in the database.")]
    SetupCompleted,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Validation(_) | AuthError::SetupCompleted => StatusCode::BAD_REQUEST,
            AuthError::Storage(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to a client. Infrastructure detail stays in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Storage(_) | AuthError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            AuthError::Unauthorized(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}
