//! Credential hashing (Argon2id, with legacy SHA-256 verification).
//!
//! New digests are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$<salt>$<hash>`),
//! so the algorithm, version, cost parameters and salt travel with the digest
//! and can be upgraded without a flag day.
//!
//! Digests written by the previous system are bare, unsalted SHA-256 hex
//! strings. They still verify, but always report `needs_rehash`.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version};
use sha2::{Digest, Sha256};
use thiserror::Error;

const LEGACY_SHA256_HEX_LEN: usize = 64;

/// A stored credential representation.
///
/// Never log or serialize this value; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap a digest loaded from storage.
    pub fn from_stored(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a bare SHA-256 digest from the previous system.
    pub fn is_legacy(&self) -> bool {
        self.0.len() == LEGACY_SHA256_HEX_LEN && self.0.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl core::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Argon2id cost parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HashingParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashingParams {
    /// Cheap parameters for tests. Never use in production.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn to_argon2(self) -> Result<Params, CredentialError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| CredentialError::InvalidParams(e.to_string()))
    }
}

/// One-way password hasher.
///
/// Pure and stateless apart from its cost parameters; safe to share and clone.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(params: HashingParams) -> Result<Self, CredentialError> {
        Ok(Self {
            params: params.to_argon2()?,
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<PasswordDigest, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| PasswordDigest(h.to_string()))
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// Returns true iff `plaintext` is the password `digest` was derived from.
    ///
    /// Malformed digests never verify.
    pub fn verify(&self, digest: &PasswordDigest, plaintext: &str) -> bool {
        if digest.is_legacy() {
            return verify_legacy_sha256(digest.as_str(), plaintext);
        }

        let parsed = match PasswordHash::new(digest.as_str()) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "stored password digest is malformed");
                return false;
            }
        };

        // Parameters come from the digest itself, not from `self`.
        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Whether `digest` should be replaced with a fresh hash under the current
    /// parameters (legacy format, different algorithm, or weaker costs).
    pub fn needs_rehash(&self, digest: &PasswordDigest) -> bool {
        if digest.is_legacy() {
            return true;
        }

        let Ok(parsed) = PasswordHash::new(digest.as_str()) else {
            return true;
        };
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }

        match Params::try_from(&parsed) {
            Ok(p) => {
                p.m_cost() < self.params.m_cost()
                    || p.t_cost() < self.params.t_cost()
                    || p.p_cost() < self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}

fn verify_legacy_sha256(digest: &str, plaintext: &str) -> bool {
    let computed = hex::encode(Sha256::digest(plaintext.as_bytes()));
    computed == digest
}
