//! Authentication flow: login, token validation, profile lookup, revocation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use keygate_auth::{
    CredentialError, PasswordDigest, PasswordHasher, RevocationList, SessionClaims, TokenCodec, TokenError,
};
use keygate_core::{DomainId, UserId};

use crate::directory::{Directories, DirectoryError, UserDirectory};
use crate::model::User;
use crate::profile::{Profile, ProfileAssembler};

/// Outcome of a failed authentication operation.
///
/// Credential and token failures never say which check failed. The detail is logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("user not found")]
    NotFound,

    /// The user's role or domain is missing or inconsistent.
    #[error("user references a missing role or domain")]
    DependencyNotFound,

    #[error("identity store unavailable")]
    Unavailable,

    #[error("token revocation is not enabled")]
    RevocationDisabled,

    #[error("internal error")]
    Internal,
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        tracing::error!(error = %err, "directory lookup failed");
        Self::Unavailable
    }
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub claims: SessionClaims,
    pub profile: Profile,
}

#[derive(Clone)]
pub struct AuthService {
    directories: Directories,
    assembler: ProfileAssembler,
    codec: Arc<TokenCodec>,
    hasher: Arc<PasswordHasher>,
    /// Verified against when no user can match, so every login failure costs one hash.
    decoy: PasswordDigest,
    revocations: Option<Arc<RevocationList>>,
}

const DECOY_PASSWORD: &str = "keygate-decoy-password";

impl core::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthService")
            .field("codec", &self.codec)
            .field("revocation_enabled", &self.revocations.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(
        directories: Directories,
        codec: Arc<TokenCodec>,
        hasher: Arc<PasswordHasher>,
        revocations: Option<Arc<RevocationList>>,
    ) -> Result<Self, CredentialError> {
        let assembler = ProfileAssembler::new(directories.roles.clone(), directories.domains.clone());
        let decoy = hasher.hash(DECOY_PASSWORD)?;
        Ok(Self {
            directories,
            assembler,
            codec,
            hasher,
            decoy,
            revocations,
        })
    }

    pub fn revocation_enabled(&self) -> bool {
        self.revocations.is_some()
    }

    /// Authenticate `username` within `domain_id` and issue a session token.
    ///
    /// Unknown user, wrong tenant and wrong password all fail with the same
    /// [`AuthError::InvalidCredentials`], after the same amount of hashing work.
    #[instrument(skip(self, password), fields(domain_id = %domain_id), err)]
    pub async fn login(&self, domain_id: DomainId, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let found = self.directories.users.find_by_username(username).await?;
        let (digest, rejection) = match &found {
            None => (&self.decoy, Some("unknown username")),
            Some(u) if u.domain_id != domain_id => (&self.decoy, Some("user belongs to another domain")),
            Some(u) => (&u.password_hash, None),
        };

        // One verification on every path; the decoy never grants access.
        let matched = self.verify_password(digest, password).await?;

        let user = match (found, rejection) {
            (Some(user), None) if matched => user,
            (found, rejection) => {
                tracing::debug!(
                    user_id = ?found.map(|u| u.id),
                    reason = rejection.unwrap_or("password mismatch"),
                    "login rejected"
                );
                return Err(AuthError::InvalidCredentials);
            }
        };

        if self.hasher.needs_rehash(&user.password_hash) {
            tracing::warn!(user_id = %user.id, "stored password digest uses outdated parameters; reset to upgrade");
        }

        let issued = self.codec.issue(session_identity(&user), Utc::now()).map_err(|e| {
            tracing::error!(error = %e, "failed to issue session token");
            AuthError::Internal
        })?;

        let profile = self.assembler.assemble(&user).await?;

        tracing::info!(user_id = %user.id, jti = %issued.claims.jti, "login succeeded");
        Ok(LoginOutcome {
            expires_at: issued.expires_at(),
            token: issued.token,
            claims: issued.claims,
            profile,
        })
    }

    /// Verify a token without touching storage.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let claims = self.codec.verify(token, now).map_err(reject_token)?;

        if let Some(revocations) = &self.revocations {
            if revocations.is_revoked(claims.jti, now) {
                return Err(reject_token(TokenError::Revoked));
            }
        }

        Ok(claims)
    }

    /// Live profile for `user_id`.
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    pub async fn get_profile(&self, user_id: UserId) -> Result<Profile, AuthError> {
        let user = self.find_user(user_id).await?;
        self.assembler.assemble(&user).await
    }

    /// Live profile for the holder of `claims`.
    ///
    /// The stored user must still belong to the domain the token was issued
    /// for; otherwise the user is treated as not found.
    #[instrument(skip(self, claims), fields(user_id = %claims.user_id, domain_id = %claims.domain_id), err)]
    pub async fn profile_for(&self, claims: &SessionClaims) -> Result<Profile, AuthError> {
        let user = self.find_user(claims.user_id).await?;
        if user.domain_id != claims.domain_id {
            tracing::warn!(stored_domain_id = %user.domain_id, "token domain no longer matches stored user");
            return Err(AuthError::NotFound);
        }
        self.assembler.assemble(&user).await
    }

    /// Validate `token`, then deny it for the rest of its lifetime.
    pub fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate(token)?;
        self.revoke_claims(&claims)
    }

    /// Deny an already validated token for the rest of its lifetime.
    pub fn revoke_claims(&self, claims: &SessionClaims) -> Result<(), AuthError> {
        let revocations = self.revocations.as_ref().ok_or(AuthError::RevocationDisabled)?;
        revocations.purge_expired(Utc::now());
        revocations.revoke(claims.jti, claims.expires_at());
        tracing::info!(user_id = %claims.user_id, jti = %claims.jti, "token revoked");
        Ok(())
    }

    async fn find_user(&self, user_id: UserId) -> Result<User, AuthError> {
        UserDirectory::find_by_id(&*self.directories.users, user_id)
            .await?
            .ok_or(AuthError::NotFound)
    }

    async fn verify_password(&self, digest: &PasswordDigest, password: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let digest = digest.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify(&digest, &password))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "password verification task failed");
                AuthError::Internal
            })
    }
}

fn session_identity(user: &User) -> keygate_auth::SessionIdentity {
    keygate_auth::SessionIdentity {
        user_id: user.id,
        domain_id: user.domain_id,
        username: user.username.clone(),
        role_id: user.role_id,
    }
}

fn reject_token(err: TokenError) -> AuthError {
    tracing::debug!(reason = %err, "token rejected");
    AuthError::InvalidOrExpiredToken
}
