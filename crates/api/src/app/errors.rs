use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use keygate_identity::AuthError;

/// Map an [`AuthError`] to a response.
///
/// Credential and token failures use fixed messages. Storage and integrity
/// failures are logged where they happen and surface as a generic 500.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid username or password",
        ),
        AuthError::InvalidOrExpiredToken => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_token", "Invalid or expired token")
        }
        AuthError::NotFound => json_error(StatusCode::UNAUTHORIZED, "user_not_found", "User not found"),
        AuthError::RevocationDisabled => json_error(
            StatusCode::NOT_IMPLEMENTED,
            "revocation_disabled",
            "Token revocation is not enabled",
        ),
        AuthError::DependencyNotFound | AuthError::Unavailable | AuthError::Internal => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
