use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod system;

/// Routes that don't require a session: login and probes.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/ping", get(system::ping))
        .route("/auth/login", post(auth::login))
}

/// Routes that require a valid bearer token.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/validate", post(auth::validate))
        .route("/auth/profile", get(auth::profile))
        .route("/auth/revoke", post(auth::revoke))
}
