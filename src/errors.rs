use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type AuthzResult<T> = Result<T, AuthzError>;

#[derive(thiserror::Error, Debug)]
pub enum AuthzError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("principal inactive: {0}")]
    PrincipalInactive(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Carries no detail on purpose: a denial must not tell the caller why.
    #[error("forbidden")]
    Forbidden,
    #[error("grant target not shareable: {0}")]
    GrantTargetNotShareable(String),
    #[error("invalid permission level: {0}")]
    InvalidLevel(String),
    /// A caller-supplied entity reference or capability that does not parse.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn inactive(message: impl Into<String>) -> Self {
        Self::PrincipalInactive(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn not_shareable(message: impl Into<String>) -> Self {
        Self::GrantTargetNotShareable(message.into())
    }

    pub fn invalid_level(message: impl Into<String>) -> Self {
        Self::InvalidLevel(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Status code the HTTP layer should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthzError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AuthzError::PrincipalInactive(_) => StatusCode::UNAUTHORIZED,
            AuthzError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthzError::Forbidden => StatusCode::FORBIDDEN,
            AuthzError::GrantTargetNotShareable(_) => StatusCode::BAD_REQUEST,
            AuthzError::InvalidLevel(_) => StatusCode::BAD_REQUEST,
            AuthzError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthzError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthzError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthzError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthzError::Unauthenticated(_) => "unauthenticated",
            AuthzError::PrincipalInactive(_) => "principal_inactive",
            AuthzError::NotFound(_) => "not_found",
            AuthzError::Forbidden => "forbidden",
            AuthzError::GrantTargetNotShareable(_) => "grant_target_not_shareable",
            AuthzError::InvalidLevel(_) => "invalid_level",
            AuthzError::InvalidInput(_) => "invalid_input",
            AuthzError::Configuration(_) => "configuration",
            AuthzError::Database(_) => "database",
            AuthzError::Internal(_) => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let status = self.status();
        let payload = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };

        (status, Json(payload)).into_response()
    }
}

impl From<anyhow::Error> for AuthzError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}
