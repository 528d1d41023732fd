use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use keygate_core::DomainId;
use keygate_identity::AuthError;

use crate::app::dto::{LoginRequest, LoginResponse, ValidateResponse};
use crate::app::errors::{auth_error_to_response, json_error};
use crate::app::services::AppServices;
use crate::context::SessionContext;

/// Header naming the tenant a login targets.
pub const DOMAIN_HEADER: &str = "x-domain-id";

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let domain_id = match domain_from_headers(&headers) {
        Ok(id) => id,
        Err(res) => return res,
    };

    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text());
        }
    };

    let (username, password) = match (body.username, body.password) {
        (Some(u), Some(p)) if !u.trim().is_empty() && !p.is_empty() => (u, p),
        _ => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "username and password are required",
            );
        }
    };

    match services.auth.login(domain_id, username.trim(), &password).await {
        Ok(outcome) => (StatusCode::OK, Json(LoginResponse::from(outcome))).into_response(),
        Err(e @ AuthError::InvalidCredentials) => auth_error_to_response(e),
        // Login reports nothing but bad credentials to the client.
        Err(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error"),
    }
}

pub async fn validate(Extension(session): Extension<SessionContext>) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(ValidateResponse {
            valid: true,
            claims: session.claims().clone(),
        }),
    )
        .into_response()
}

pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    match services.auth.profile_for(session.claims()).await {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(e) => auth_error_to_response(e),
    }
}

pub async fn revoke(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    match services.auth.revoke_claims(session.claims()) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => auth_error_to_response(e),
    }
}

fn domain_from_headers(headers: &HeaderMap) -> Result<DomainId, axum::response::Response> {
    let raw = headers
        .get(DOMAIN_HEADER)
        .ok_or_else(|| {
            json_error(
                StatusCode::BAD_REQUEST,
                "missing_domain",
                "X-Domain-Id header is required",
            )
        })?
        .to_str()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_domain", "X-Domain-Id must be a UUID"))?;

    raw.parse::<DomainId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_domain", "X-Domain-Id must be a UUID"))
}
