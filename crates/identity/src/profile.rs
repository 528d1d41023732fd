//! Client-facing profile view: user joined with role and domain.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use keygate_core::{DomainId, RoleId, UserId};

use crate::directory::{DomainDirectory, RoleDirectory};
use crate::model::{RoleClaims, User};
use crate::service::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleView {
    pub id: RoleId,
    pub name: String,
    /// Roles carry no description; always empty.
    pub description: String,
    pub claims: RoleClaims,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainView {
    pub id: DomainId,
    pub name: String,
    /// The tenant key.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: RoleView,
    pub domain: DomainView,
}

#[derive(Clone)]
pub struct ProfileAssembler {
    roles: Arc<dyn RoleDirectory>,
    domains: Arc<dyn DomainDirectory>,
}

impl ProfileAssembler {
    pub fn new(roles: Arc<dyn RoleDirectory>, domains: Arc<dyn DomainDirectory>) -> Self {
        Self { roles, domains }
    }

    /// Join `user` with its role and domain.
    ///
    /// A missing role or domain, or a role from another domain, means the
    /// stored data is inconsistent and yields [`AuthError::DependencyNotFound`].
    #[instrument(skip(self, user), fields(user_id = %user.id, role_id = %user.role_id, domain_id = %user.domain_id), err)]
    pub async fn assemble(&self, user: &User) -> Result<Profile, AuthError> {
        let role = RoleDirectory::find_by_id(&*self.roles, user.role_id).await?.ok_or_else(|| {
            tracing::error!("user references a role that does not exist");
            AuthError::DependencyNotFound
        })?;

        if role.domain_id != user.domain_id {
            tracing::error!(role_domain_id = %role.domain_id, "user's role belongs to another domain");
            return Err(AuthError::DependencyNotFound);
        }

        let domain = DomainDirectory::find_by_id(&*self.domains, user.domain_id).await?.ok_or_else(|| {
            tracing::error!("user references a domain that does not exist");
            AuthError::DependencyNotFound
        })?;

        Ok(Profile {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: RoleView {
                id: role.id,
                name: role.name,
                description: String::new(),
                claims: role.claims,
            },
            domain: DomainView {
                id: domain.id,
                name: domain.name,
                description: domain.key,
            },
        })
    }
}

impl core::fmt::Debug for ProfileAssembler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProfileAssembler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, acme};
    use serde_json::json;

    #[tokio::test]
    async fn joins_user_with_role_and_domain() {
        let fx = Fixture::new();
        let acme = acme(&fx).await;
        let assembler = fx.assembler();

        let profile = assembler.assemble(&acme.user).await.unwrap();

        assert_eq!(profile.id, acme.user.id);
        assert_eq!(profile.role.name, "admin");
        assert_eq!(profile.role.description, "");
        assert_eq!(profile.domain.name, "Acme Corp");
        assert_eq!(profile.domain.description, "acme");
    }

    #[tokio::test]
    async fn serializes_to_the_nested_client_shape() {
        let fx = Fixture::new();
        let acme = acme(&fx).await;

        let profile = fx.assembler().assemble(&acme.user).await.unwrap();
        let value = serde_json::to_value(&profile).unwrap();

        assert_eq!(value["username"], "alice");
        assert_eq!(value["first_name"], "Alice");
        assert_eq!(value["role"]["claims"], json!({}));
        assert_eq!(value["domain"]["description"], "acme");
        assert!(value.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn missing_role_is_a_dependency_failure() {
        let fx = Fixture::new();
        let acme = acme(&fx).await;
        fx.store.remove_role(acme.role.id);

        let err = fx.assembler().assemble(&acme.user).await.unwrap_err();
        assert_eq!(err, AuthError::DependencyNotFound);
    }

    #[tokio::test]
    async fn missing_domain_is_a_dependency_failure() {
        let fx = Fixture::new();
        let acme = acme(&fx).await;
        fx.store.remove_domain(acme.domain.id);

        let err = fx.assembler().assemble(&acme.user).await.unwrap_err();
        assert_eq!(err, AuthError::DependencyNotFound);
    }

    #[tokio::test]
    async fn role_from_another_domain_is_a_dependency_failure() {
        let fx = Fixture::new();
        let acme = acme(&fx).await;
        let other = fx.store.put_domain("Globex", "globex");
        let foreign = fx.store.put_role(other.id, "admin");

        let mut user = acme.user.clone();
        user.role_id = foreign.id;

        let err = fx.assembler().assemble(&user).await.unwrap_err();
        assert_eq!(err, AuthError::DependencyNotFound);
    }

    #[tokio::test]
    async fn storage_failure_is_unavailable() {
        let fx = Fixture::new();
        let acme = acme(&fx).await;
        fx.store.fail_with_unavailable(true);

        let err = fx.assembler().assemble(&acme.user).await.unwrap_err();
        assert_eq!(err, AuthError::Unavailable);
    }
}
