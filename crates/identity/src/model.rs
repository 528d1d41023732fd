//! Tenants, roles and users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use keygate_auth::PasswordDigest;
use keygate_core::{DomainError, DomainId, DomainResult, RoleId, UserId};

/// A tenant. `key` is the globally unique tenant key (e.g. `"acme"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub key: String,
}

/// Opaque claim document attached to a role.
///
/// Stored and returned verbatim; nothing in the system interprets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleClaims(Map<String, Value>);

impl RoleClaims {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Accepts a JSON object; `None` and `null` become `{}`.
    pub fn from_value(value: Option<Value>) -> DomainResult<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::empty()),
            Some(Value::Object(map)) => Ok(Self(map)),
            Some(other) => Err(DomainError::validation(format!(
                "role claims must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for RoleClaims {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A named role, scoped to exactly one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub domain_id: DomainId,
    pub name: String,
    pub claims: RoleClaims,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user account.
///
/// Not `Serialize`: the password digest must never leave the service. Client
/// facing views go through [`crate::profile::Profile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub domain_id: DomainId,
    pub role_id: RoleId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: PasswordDigest,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
