//! Session token signing and verification (HS256 only).

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{SessionClaims, SessionIdentity, TokenValidationError, validate_window};
use crate::config::AuthConfig;

/// Why a token was not accepted.
///
/// Detail is for logs only; callers facing clients should collapse every
/// variant into a single "invalid or expired" outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("signature mismatch")]
    Signature,

    #[error("unexpected signing algorithm")]
    Algorithm,

    #[error("issuer mismatch")]
    Issuer,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid token time window")]
    InvalidTimeWindow,

    #[error("token has been revoked")]
    Revoked,

    #[error("token encoding failed: {0}")]
    Encode(String),
}

impl From<TokenValidationError> for TokenError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => Self::Expired,
            TokenValidationError::NotYetValid => Self::NotYetValid,
            TokenValidationError::InvalidTimeWindow => Self::InvalidTimeWindow,
            TokenValidationError::SubjectMismatch => Self::Malformed(value.to_string()),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => Self::Signature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName | ErrorKind::MissingAlgorithm => {
                Self::Algorithm
            }
            ErrorKind::InvalidIssuer => Self::Issuer,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            _ => Self::Malformed(err.to_string()),
        }
    }
}

/// A freshly signed token with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: SessionClaims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }
}

/// Signs and verifies session tokens with a shared HS256 secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: chrono::Duration,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.signing_secret();

        // Time checks run in `validate_window` against the caller's clock, so
        // the library only handles signature, algorithm and issuer.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);
        validation.set_issuer(&[config.issuer.as_str()]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer: config.issuer.clone(),
            ttl: config.token_ttl,
        }
    }

    pub fn issue(&self, identity: SessionIdentity, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = SessionClaims::new(identity, &self.issuer, now, now + self.ttl);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))?;
        Ok(IssuedToken { token, claims })
    }

    /// Verify signature, algorithm, issuer and time window.
    ///
    /// Revocation is not checked here.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        validate_window(&data.claims, now)?;
        Ok(data.claims)
    }
}
