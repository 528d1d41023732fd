//! Immutable authentication configuration.
//!
//! Built once at startup and handed to the codec/hasher constructors. Nothing
//! in this crate reads the environment.

use chrono::Duration;

use crate::password::HashingParams;

/// Tokens live for 24 hours unless configured otherwise.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Issuer tag embedded in (and required of) every session token.
pub const DEFAULT_ISSUER: &str = "keygate";

/// Shortest HS256 secret that doesn't trigger a startup warning.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct AuthConfig {
    signing_secret: Vec<u8>,
    pub token_ttl: Duration,
    pub issuer: String,
    pub hashing: HashingParams,
}

impl AuthConfig {
    pub fn new(signing_secret: impl Into<Vec<u8>>) -> Self {
        let signing_secret = signing_secret.into();
        if signing_secret.len() < MIN_SECRET_LEN {
            tracing::warn!(
                len = signing_secret.len(),
                min = MIN_SECRET_LEN,
                "signing secret is shorter than recommended"
            );
        }

        Self {
            signing_secret,
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            issuer: DEFAULT_ISSUER.to_string(),
            hashing: HashingParams::default(),
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_hashing(mut self, hashing: HashingParams) -> Self {
        self.hashing = hashing;
        self
    }

    pub fn signing_secret(&self) -> &[u8] {
        &self.signing_secret
    }
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("issuer", &self.issuer)
            .field("hashing", &self.hashing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_one_day_ttl_and_keygate_issuer() {
        let cfg = AuthConfig::new("0123456789abcdef0123456789abcdef");
        assert_eq!(cfg.token_ttl, Duration::hours(24));
        assert_eq!(cfg.issuer, "keygate");
    }

    #[test]
    fn debug_output_never_contains_the_secret() {
        let cfg = AuthConfig::new("super-secret-value-that-must-not-leak");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
