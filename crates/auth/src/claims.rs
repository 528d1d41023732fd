use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use keygate_core::{DomainId, RoleId, UserId};

/// The identity facts a session token asserts about its holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: UserId,
    pub domain_id: DomainId,
    pub username: String,
    pub role_id: RoleId,
}

/// Session claims carried inside a signed token.
///
/// Identity fields plus the registered temporal fields. Timestamps are seconds
/// since the Unix epoch, as on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: UserId,
    pub domain_id: DomainId,
    pub username: String,
    pub role_id: RoleId,

    /// Issuer tag.
    pub iss: String,

    /// Subject: the user id, stringified.
    pub sub: String,

    /// Issued-at.
    pub iat: i64,

    /// Not-before.
    pub nbf: i64,

    /// Expiry.
    pub exp: i64,

    /// Token id; only meaningful to the revocation denylist.
    pub jti: Uuid,
}

impl SessionClaims {
    pub fn new(identity: SessionIdentity, issuer: &str, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: identity.user_id.to_string(),
            user_id: identity.user_id,
            domain_id: identity.domain_id,
            username: identity.username,
            role_id: identity.role_id,
            iss: issuer.to_string(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        }
    }

    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            user_id: self.user_id,
            domain_id: self.domain_id,
            username: self.username.clone(),
            role_id: self.role_id,
        }
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        from_epoch(self.iat)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        from_epoch(self.exp)
    }
}

fn from_epoch(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (nbf is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("subject does not match user id")]
    SubjectMismatch,
}

/// Deterministically validate the claims' time window and internal consistency.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// [`crate::token::TokenCodec`] before this is called.
pub fn validate_window(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.nbf {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    if claims.sub != claims.user_id.to_string() {
        return Err(TokenValidationError::SubjectMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            user_id: UserId::new(),
            domain_id: DomainId::new(),
            username: "alice".to_string(),
            role_id: RoleId::new(),
        }
    }

    #[test]
    fn subject_is_the_user_id() {
        let id = identity();
        let now = Utc::now();
        let claims = SessionClaims::new(id.clone(), "keygate", now, now + Duration::hours(1));
        assert_eq!(claims.sub, id.user_id.to_string());
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.identity(), id);
    }

    #[test]
    fn accepts_inside_the_window() {
        let now = Utc::now();
        let claims = SessionClaims::new(identity(), "keygate", now, now + Duration::minutes(10));
        assert_eq!(validate_window(&claims, now), Ok(()));
        assert_eq!(validate_window(&claims, now + Duration::minutes(9)), Ok(()));
    }

    #[test]
    fn rejects_at_and_after_expiry() {
        let now = Utc::now();
        let claims = SessionClaims::new(identity(), "keygate", now, now + Duration::minutes(10));
        assert_eq!(
            validate_window(&claims, now + Duration::minutes(10)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn zero_ttl_is_never_valid() {
        let now = Utc::now();
        let claims = SessionClaims::new(identity(), "keygate", now, now);
        assert_eq!(validate_window(&claims, now), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn rejects_before_not_before() {
        let now = Utc::now();
        let claims = SessionClaims::new(identity(), "keygate", now, now + Duration::minutes(10));
        assert_eq!(
            validate_window(&claims, now - Duration::seconds(5)),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn rejects_subject_that_disagrees_with_user_id() {
        let now = Utc::now();
        let mut claims = SessionClaims::new(identity(), "keygate", now, now + Duration::minutes(10));
        claims.sub = UserId::new().to_string();
        assert_eq!(validate_window(&claims, now), Err(TokenValidationError::SubjectMismatch));
    }
}
