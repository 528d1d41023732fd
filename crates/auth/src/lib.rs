//! `keygate-auth` — pure authentication primitives.
//!
//! Credential hashing, session claims, token signing/verification and the
//! revocation denylist. This crate is intentionally decoupled from HTTP and
//! storage: callers pass identities in and get claims out.

pub mod claims;
pub mod config;
pub mod password;
pub mod revocation;
pub mod token;

pub use claims::{SessionClaims, SessionIdentity, TokenValidationError, validate_window};
pub use config::{AuthConfig, DEFAULT_ISSUER, DEFAULT_TOKEN_TTL_SECS, MIN_SECRET_LEN};
pub use password::{CredentialError, HashingParams, PasswordDigest, PasswordHasher};
pub use revocation::RevocationList;
pub use token::{IssuedToken, TokenCodec, TokenError};
