//! Storage abstractions for tenants, roles and users.
//!
//! Read traits are what the authentication flow depends on. [`DirectoryWriter`]
//! is the provisioning side and is where cross-entity invariants are enforced:
//!
//! - a user's role must belong to the user's domain
//! - usernames and emails are globally unique
//! - role names are unique within a domain
//! - domain keys are globally unique

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use keygate_auth::PasswordDigest;
use keygate_core::{DomainId, RoleId, UserId};

use crate::model::{Domain, Role, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Backend unreachable, pool exhausted, or the statement timed out.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// Unique constraint violated on write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Cross-entity invariant violated on write (e.g. role from another domain).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DirectoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DirectoryError>;
}

#[async_trait::async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, DirectoryError>;
}

#[async_trait::async_trait]
pub trait DomainDirectory: Send + Sync {
    async fn find_by_id(&self, id: DomainId) -> Result<Option<Domain>, DirectoryError>;
}

#[async_trait::async_trait]
pub trait DirectoryWriter: Send + Sync {
    async fn insert_domain(&self, domain: &Domain) -> Result<(), DirectoryError>;

    async fn insert_role(&self, role: &Role) -> Result<(), DirectoryError>;

    async fn insert_user(&self, user: &User) -> Result<(), DirectoryError>;

    /// Replace a user's password digest. Returns `false` if the user doesn't exist.
    async fn update_password(
        &self,
        user_id: UserId,
        digest: &PasswordDigest,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DirectoryError>;
}

#[async_trait::async_trait]
impl<S> UserDirectory for Arc<S>
where
    S: UserDirectory + ?Sized,
{
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DirectoryError> {
        (**self).find_by_username(username).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        UserDirectory::find_by_id(&**self, id).await
    }
}

#[async_trait::async_trait]
impl<S> RoleDirectory for Arc<S>
where
    S: RoleDirectory + ?Sized,
{
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, DirectoryError> {
        RoleDirectory::find_by_id(&**self, id).await
    }
}

#[async_trait::async_trait]
impl<S> DomainDirectory for Arc<S>
where
    S: DomainDirectory + ?Sized,
{
    async fn find_by_id(&self, id: DomainId) -> Result<Option<Domain>, DirectoryError> {
        DomainDirectory::find_by_id(&**self, id).await
    }
}

#[async_trait::async_trait]
impl<S> DirectoryWriter for Arc<S>
where
    S: DirectoryWriter + ?Sized,
{
    async fn insert_domain(&self, domain: &Domain) -> Result<(), DirectoryError> {
        (**self).insert_domain(domain).await
    }

    async fn insert_role(&self, role: &Role) -> Result<(), DirectoryError> {
        (**self).insert_role(role).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), DirectoryError> {
        (**self).insert_user(user).await
    }

    async fn update_password(
        &self,
        user_id: UserId,
        digest: &PasswordDigest,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DirectoryError> {
        (**self).update_password(user_id, digest, updated_at).await
    }
}

/// The three read directories the authentication flow needs, type-erased.
#[derive(Clone)]
pub struct Directories {
    pub users: Arc<dyn UserDirectory>,
    pub roles: Arc<dyn RoleDirectory>,
    pub domains: Arc<dyn DomainDirectory>,
}

impl Directories {
    /// Use one backend for all three directories.
    pub fn shared<D>(backend: Arc<D>) -> Self
    where
        D: UserDirectory + RoleDirectory + DomainDirectory + 'static,
    {
        Self {
            users: backend.clone(),
            roles: backend.clone(),
            domains: backend,
        }
    }
}

impl core::fmt::Debug for Directories {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Directories").finish_non_exhaustive()
    }
}
