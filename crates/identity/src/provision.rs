//! Creating tenants, roles and users.
//!
//! Input is validated here; uniqueness and the role/domain invariant are
//! checked again by the [`DirectoryWriter`] so concurrent writers can't slip
//! past a read-then-write race.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use keygate_auth::{CredentialError, PasswordDigest, PasswordHasher};
use keygate_core::{DomainError, DomainId, RoleId, UserId};

use crate::directory::{DirectoryError, DirectoryWriter, DomainDirectory, RoleDirectory};
use crate::model::{Domain, Role, RoleClaims, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("background task failed: {0}")]
    Task(String),
}

/// Input for [`Provisioner::create_user`].
#[derive(Clone)]
pub struct NewUser {
    pub domain_id: DomainId,
    pub role_id: RoleId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewUser")
            .field("domain_id", &self.domain_id)
            .field("role_id", &self.role_id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Provisioner {
    writer: Arc<dyn DirectoryWriter>,
    roles: Arc<dyn RoleDirectory>,
    domains: Arc<dyn DomainDirectory>,
    hasher: Arc<PasswordHasher>,
}

impl Provisioner {
    /// Use one backend for reads and writes.
    pub fn shared<D>(backend: Arc<D>, hasher: Arc<PasswordHasher>) -> Self
    where
        D: DirectoryWriter + RoleDirectory + DomainDirectory + 'static,
    {
        Self {
            writer: backend.clone(),
            roles: backend.clone(),
            domains: backend,
            hasher,
        }
    }

    #[instrument(skip(self), err)]
    pub async fn create_domain(&self, name: &str, key: &str) -> Result<Domain, ProvisionError> {
        let domain = Domain {
            id: DomainId::new(),
            name: required("domain name", name)?,
            key: required("domain key", key)?,
        };
        self.writer.insert_domain(&domain).await?;
        tracing::info!(domain_id = %domain.id, key = %domain.key, "domain created");
        Ok(domain)
    }

    #[instrument(skip(self, claims), fields(domain_id = %domain_id), err)]
    pub async fn create_role(
        &self,
        domain_id: DomainId,
        name: &str,
        claims: Option<Value>,
    ) -> Result<Role, ProvisionError> {
        let name = required("role name", name)?;
        let claims = RoleClaims::from_value(claims)?;

        if DomainDirectory::find_by_id(&*self.domains, domain_id).await?.is_none() {
            return Err(DomainError::not_found().into());
        }

        let now = Utc::now();
        let role = Role {
            id: RoleId::new(),
            domain_id,
            name,
            claims,
            created_at: now,
            updated_at: now,
        };
        self.writer.insert_role(&role).await?;
        tracing::info!(role_id = %role.id, "role created");
        Ok(role)
    }

    #[instrument(skip(self, new), fields(domain_id = %new.domain_id, username = %new.username), err)]
    pub async fn create_user(&self, new: NewUser) -> Result<User, ProvisionError> {
        let first_name = required("first name", &new.first_name)?;
        let last_name = required("last name", &new.last_name)?;
        let username = required("username", &new.username)?;
        let email = required("email", &new.email)?;
        if !email.contains('@') {
            return Err(DomainError::validation("email must contain '@'").into());
        }
        if new.password.is_empty() {
            return Err(DomainError::validation("password is required").into());
        }

        let role = RoleDirectory::find_by_id(&*self.roles, new.role_id)
            .await?
            .ok_or_else(DomainError::not_found)?;
        if role.domain_id != new.domain_id {
            return Err(DomainError::invariant("role belongs to a different domain").into());
        }

        let password_hash = self.hash(new.password).await?;
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            domain_id: new.domain_id,
            role_id: new.role_id,
            first_name,
            last_name,
            username,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        };
        self.writer.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Store a fresh digest of `new_password`. Also the way legacy digests get upgraded.
    #[instrument(skip(self, new_password), fields(user_id = %user_id), err)]
    pub async fn reset_password(&self, user_id: UserId, new_password: &str) -> Result<(), ProvisionError> {
        if new_password.is_empty() {
            return Err(DomainError::validation("password is required").into());
        }
        let digest = self.hash(new_password.to_owned()).await?;
        if !self.writer.update_password(user_id, &digest, Utc::now()).await? {
            return Err(DomainError::not_found().into());
        }
        tracing::info!("password reset");
        Ok(())
    }

    async fn hash(&self, password: String) -> Result<PasswordDigest, ProvisionError> {
        let hasher = self.hasher.clone();
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ProvisionError::Task(e.to_string()))??;
        Ok(digest)
    }
}

impl core::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Provisioner").finish_non_exhaustive()
    }
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
