//! Service wiring: directory backend, codec, hasher, denylist.

use std::sync::Arc;

use anyhow::Context;

use keygate_auth::{AuthConfig, PasswordHasher, RevocationList, TokenCodec};
use keygate_identity::{
    AuthService, Directories, DirectoryWriter, DomainDirectory, NewUser, Provisioner, RoleDirectory,
    UserDirectory,
};
use keygate_infra::{InMemoryDirectory, PostgresDirectory};

use crate::config::{AppConfig, BootstrapConfig};

pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub provisioner: Provisioner,
    pub users: Arc<dyn UserDirectory>,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices").field("auth", &self.auth).finish_non_exhaustive()
    }
}

/// Build services for `config`: Postgres when `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match &config.database {
        Some(db) => {
            let directory = PostgresDirectory::connect(&db.url, db.options).context("failed to set up Postgres pool")?;
            directory
                .ensure_schema()
                .await
                .context("failed to ensure database schema")?;
            tracing::info!(max_connections = db.options.max_connections, "using Postgres directory");
            wire(Arc::new(directory), &config.auth, config.revocation_enabled)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory directory (data is lost on restart)");
            in_memory(&config.auth, config.revocation_enabled)
        }
    }
}

/// In-memory services; used for local runs and tests.
pub fn in_memory(auth: &AuthConfig, revocation_enabled: bool) -> anyhow::Result<AppServices> {
    wire(Arc::new(InMemoryDirectory::new()), auth, revocation_enabled)
}

fn wire<D>(backend: Arc<D>, auth: &AuthConfig, revocation_enabled: bool) -> anyhow::Result<AppServices>
where
    D: UserDirectory + RoleDirectory + DomainDirectory + DirectoryWriter + 'static,
{
    let hasher = Arc::new(PasswordHasher::new(auth.hashing).context("invalid password hashing parameters")?);
    let codec = Arc::new(TokenCodec::new(auth));
    let revocations = revocation_enabled.then(|| Arc::new(RevocationList::new()));

    let service = AuthService::new(Directories::shared(backend.clone()), codec, hasher.clone(), revocations)
        .context("failed to prepare login decoy digest")?;

    Ok(AppServices {
        auth: Arc::new(service),
        provisioner: Provisioner::shared(backend.clone(), hasher),
        users: backend,
    })
}

/// Provision the configured tenant and admin unless the admin already exists.
pub async fn bootstrap(services: &AppServices, config: &BootstrapConfig) -> anyhow::Result<()> {
    if services
        .users
        .find_by_username(&config.admin_username)
        .await
        .context("failed to look up bootstrap admin")?
        .is_some()
    {
        tracing::info!(username = %config.admin_username, "bootstrap admin already exists; skipping");
        return Ok(());
    }

    let provisioner = &services.provisioner;
    let domain = provisioner
        .create_domain(&config.domain_name, &config.domain_key)
        .await
        .context("failed to create bootstrap domain")?;
    let role = provisioner
        .create_role(domain.id, "admin", None)
        .await
        .context("failed to create bootstrap role")?;
    let user = provisioner
        .create_user(NewUser {
            domain_id: domain.id,
            role_id: role.id,
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            username: config.admin_username.clone(),
            email: config.admin_email.clone(),
            password: config.admin_password.clone(),
        })
        .await
        .context("failed to create bootstrap admin")?;

    tracing::info!(
        domain_id = %domain.id,
        user_id = %user.id,
        key = %domain.key,
        "bootstrapped tenant and admin user"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keygate_auth::HashingParams;

    fn auth_config() -> AuthConfig {
        AuthConfig::new("services-test-secret-services-test-secret").with_hashing(HashingParams::insecure_fast())
    }

    fn bootstrap_config() -> BootstrapConfig {
        BootstrapConfig {
            domain_key: "acme".into(),
            domain_name: "Acme Corp".into(),
            admin_username: "root".into(),
            admin_email: "root@acme.local".into(),
            admin_password: "hunter2!".into(),
        }
    }

    #[tokio::test]
    async fn bootstrap_creates_a_loginable_admin_once() {
        let services = in_memory(&auth_config(), true).unwrap();
        let boot = bootstrap_config();

        bootstrap(&services, &boot).await.unwrap();
        // Second run is a no-op rather than a conflict.
        bootstrap(&services, &boot).await.unwrap();

        let admin = services.users.find_by_username("root").await.unwrap().unwrap();
        let outcome = services.auth.login(admin.domain_id, "root", "hunter2!").await.unwrap();
        assert_eq!(outcome.profile.role.name, "admin");
        assert_eq!(outcome.profile.domain.description, "acme");
    }

    #[tokio::test]
    async fn revocation_follows_configuration() {
        assert!(in_memory(&auth_config(), true).unwrap().auth.revocation_enabled());
        assert!(!in_memory(&auth_config(), false).unwrap().auth.revocation_enabled());
    }
}
