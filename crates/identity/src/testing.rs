//! Test doubles shared by this crate's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use keygate_auth::{AuthConfig, HashingParams, PasswordDigest, PasswordHasher, RevocationList, TokenCodec};
use keygate_core::{DomainId, RoleId, UserId};

use crate::directory::{
    Directories, DirectoryError, DirectoryWriter, DomainDirectory, RoleDirectory, UserDirectory,
};
use crate::model::{Domain, Role, RoleClaims, User};
use crate::profile::ProfileAssembler;
use crate::provision::{NewUser, Provisioner};
use crate::service::AuthService;

pub(crate) const SECRET: &str = "unit-test-secret-unit-test-secret!!";

/// Bare map-backed store with fault injection. Only enforces username uniqueness.
#[derive(Default)]
pub(crate) struct MemoryStore {
    domains: Mutex<HashMap<DomainId, Domain>>,
    roles: Mutex<HashMap<RoleId, Role>>,
    users: Mutex<HashMap<UserId, User>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    fn check(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("injected outage".into()));
        }
        Ok(())
    }

    pub(crate) fn fail_with_unavailable(&self, on: bool) {
        self.unavailable.store(on, Ordering::SeqCst);
    }

    pub(crate) fn put_domain(&self, name: &str, key: &str) -> Domain {
        let domain = Domain {
            id: DomainId::new(),
            name: name.into(),
            key: key.into(),
        };
        self.domains.lock().unwrap().insert(domain.id, domain.clone());
        domain
    }

    pub(crate) fn put_role(&self, domain_id: DomainId, name: &str) -> Role {
        let now = Utc::now();
        let role = Role {
            id: RoleId::new(),
            domain_id,
            name: name.into(),
            claims: RoleClaims::empty(),
            created_at: now,
            updated_at: now,
        };
        self.roles.lock().unwrap().insert(role.id, role.clone());
        role
    }

    pub(crate) fn put_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub(crate) fn remove_role(&self, id: RoleId) {
        self.roles.lock().unwrap().remove(&id);
    }

    pub(crate) fn remove_domain(&self, id: DomainId) {
        self.domains.lock().unwrap().remove(&id);
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DirectoryError> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        self.check()?;
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait::async_trait]
impl RoleDirectory for MemoryStore {
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, DirectoryError> {
        self.check()?;
        Ok(self.roles.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait::async_trait]
impl DomainDirectory for MemoryStore {
    async fn find_by_id(&self, id: DomainId) -> Result<Option<Domain>, DirectoryError> {
        self.check()?;
        Ok(self.domains.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait::async_trait]
impl DirectoryWriter for MemoryStore {
    async fn insert_domain(&self, domain: &Domain) -> Result<(), DirectoryError> {
        self.check()?;
        self.domains.lock().unwrap().insert(domain.id, domain.clone());
        Ok(())
    }

    async fn insert_role(&self, role: &Role) -> Result<(), DirectoryError> {
        self.check()?;
        self.roles.lock().unwrap().insert(role.id, role.clone());
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), DirectoryError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.username == user.username) {
            return Err(DirectoryError::Conflict(format!("username {} taken", user.username)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: UserId,
        digest: &PasswordDigest,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DirectoryError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(false);
        };
        user.password_hash = digest.clone();
        user.updated_at = updated_at;
        Ok(true)
    }
}

pub(crate) struct Fixture {
    pub store: Arc<MemoryStore>,
    pub hasher: Arc<PasswordHasher>,
    pub codec: Arc<TokenCodec>,
    pub revocations: Arc<RevocationList>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_config(AuthConfig::new(SECRET).with_hashing(HashingParams::insecure_fast()))
    }

    pub(crate) fn with_config(config: AuthConfig) -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            hasher: Arc::new(PasswordHasher::new(config.hashing).unwrap()),
            codec: Arc::new(TokenCodec::new(&config)),
            revocations: Arc::new(RevocationList::new()),
        }
    }

    pub(crate) fn directories(&self) -> Directories {
        Directories::shared(self.store.clone())
    }

    pub(crate) fn assembler(&self) -> ProfileAssembler {
        ProfileAssembler::new(self.store.clone(), self.store.clone())
    }

    pub(crate) fn provisioner(&self) -> Provisioner {
        Provisioner::shared(self.store.clone(), self.hasher.clone())
    }

    pub(crate) fn service(&self) -> AuthService {
        AuthService::new(
            self.directories(),
            self.codec.clone(),
            self.hasher.clone(),
            Some(self.revocations.clone()),
        )
        .unwrap()
    }
}

pub(crate) struct Tenant {
    pub domain: Domain,
    pub role: Role,
    pub user: User,
}

pub(crate) fn alice(domain_id: DomainId, role_id: RoleId) -> NewUser {
    NewUser {
        domain_id,
        role_id,
        first_name: "Alice".into(),
        last_name: "Liddell".into(),
        username: "alice".into(),
        email: "alice@acme.test".into(),
        password: "s3cret!".into(),
    }
}

/// Domain "acme", role "admin" with `{}` claims, user "alice" / "s3cret!".
pub(crate) async fn acme(fx: &Fixture) -> Tenant {
    let provisioner = fx.provisioner();
    let domain = provisioner.create_domain("Acme Corp", "acme").await.unwrap();
    let role = provisioner.create_role(domain.id, "admin", None).await.unwrap();
    let user = provisioner.create_user(alice(domain.id, role.id)).await.unwrap();
    Tenant { domain, role, user }
}
