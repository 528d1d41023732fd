use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use keygate_auth::PasswordDigest;
use keygate_core::{DomainId, RoleId, UserId};
use keygate_identity::{
    DirectoryError, DirectoryWriter, Domain, DomainDirectory, Role, RoleDirectory, User, UserDirectory,
};

#[derive(Debug, Default)]
struct State {
    domains: HashMap<DomainId, Domain>,
    roles: HashMap<RoleId, Role>,
    users: HashMap<UserId, User>,
}

/// In-memory directory.
///
/// Intended for tests/dev. Lookups by username and key are linear scans.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, DirectoryError> {
        self.state
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, DirectoryError> {
        self.state
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DirectoryError> {
        let state = self.read()?;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        Ok(self.read()?.users.get(&id).cloned())
    }
}

#[async_trait::async_trait]
impl RoleDirectory for InMemoryDirectory {
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, DirectoryError> {
        Ok(self.read()?.roles.get(&id).cloned())
    }
}

#[async_trait::async_trait]
impl DomainDirectory for InMemoryDirectory {
    async fn find_by_id(&self, id: DomainId) -> Result<Option<Domain>, DirectoryError> {
        Ok(self.read()?.domains.get(&id).cloned())
    }
}

#[async_trait::async_trait]
impl DirectoryWriter for InMemoryDirectory {
    async fn insert_domain(&self, domain: &Domain) -> Result<(), DirectoryError> {
        let mut state = self.write()?;
        if state.domains.contains_key(&domain.id) {
            return Err(DirectoryError::Conflict(format!("domain {} already exists", domain.id)));
        }
        if state.domains.values().any(|d| d.key == domain.key) {
            return Err(DirectoryError::Conflict(format!("domain key '{}' is taken", domain.key)));
        }
        state.domains.insert(domain.id, domain.clone());
        Ok(())
    }

    async fn insert_role(&self, role: &Role) -> Result<(), DirectoryError> {
        let mut state = self.write()?;
        if !state.domains.contains_key(&role.domain_id) {
            return Err(DirectoryError::Integrity(format!("domain {} does not exist", role.domain_id)));
        }
        if state.roles.contains_key(&role.id) {
            return Err(DirectoryError::Conflict(format!("role {} already exists", role.id)));
        }
        if state
            .roles
            .values()
            .any(|r| r.domain_id == role.domain_id && r.name == role.name)
        {
            return Err(DirectoryError::Conflict(format!(
                "role '{}' already exists in domain {}",
                role.name, role.domain_id
            )));
        }
        state.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), DirectoryError> {
        let mut state = self.write()?;
        if !state.domains.contains_key(&user.domain_id) {
            return Err(DirectoryError::Integrity(format!("domain {} does not exist", user.domain_id)));
        }
        match state.roles.get(&user.role_id) {
            None => {
                return Err(DirectoryError::Integrity(format!("role {} does not exist", user.role_id)));
            }
            Some(role) if role.domain_id != user.domain_id => {
                return Err(DirectoryError::Integrity(format!(
                    "role {} belongs to domain {}, not {}",
                    role.id, role.domain_id, user.domain_id
                )));
            }
            Some(_) => {}
        }
        if state.users.contains_key(&user.id) {
            return Err(DirectoryError::Conflict(format!("user {} already exists", user.id)));
        }
        if state.users.values().any(|u| u.username == user.username) {
            return Err(DirectoryError::Conflict(format!("username '{}' is taken", user.username)));
        }
        if state.users.values().any(|u| u.email == user.email) {
            return Err(DirectoryError::Conflict(format!("email '{}' is taken", user.email)));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: UserId,
        digest: &PasswordDigest,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, DirectoryError> {
        let mut state = self.write()?;
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(false);
        };
        user.password_hash = digest.clone();
        user.updated_at = updated_at;
        Ok(true)
    }
}
