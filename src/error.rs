use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy for the OTP and token protocol.
///
/// Credential failures deliberately collapse into generic response bodies so
/// a caller cannot tell which check rejected them.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("record not found")]
    NotFound,
    #[error("invalid otp code")]
    InvalidCode,
    #[error("otp code expired")]
    ExpiredCode,
    #[error("invalid token")]
    InvalidToken,
    #[error("missing bearer credentials")]
    Unauthenticated,
    #[error("already registered")]
    Forbidden,
    #[error("storage failure")]
    Storage(#[from] sqlx::Error),
    #[error("sms delivery failure: {0}")]
    Delivery(String),
    #[error("token signing failure")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("registration failure: {0}")]
    Registration(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound => (StatusCode::NOT_FOUND, "not found"),
            // One body for both: do not reveal which check failed
            Self::InvalidCode | Self::ExpiredCode => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid or expired code")
            }
            Self::InvalidToken | Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            Self::Forbidden => (StatusCode::FORBIDDEN, "already registered"),
            Self::Registration(_) => (StatusCode::UNPROCESSABLE_ENTITY, "registration failed"),
            Self::Storage(e) => {
                error!("storage failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
            Self::Delivery(e) => {
                error!("sms delivery failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
            Self::Signing(e) => {
                error!("token signing failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_share_status_and_body() {
        let invalid = AuthError::InvalidCode.into_response();
        let expired = AuthError::ExpiredCode.into_response();

        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(expired.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn token_failures_are_unauthorized() {
        assert_eq!(
            AuthError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn forbidden_is_distinguishable() {
        assert_eq!(
            AuthError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
