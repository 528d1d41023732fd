//! In-process token denylist.
//!
//! Holds revoked token ids only until the token would have expired anyway, so
//! the set stays small without a background sweeper.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct RevocationList {
    // jti -> exp (epoch seconds)
    entries: RwLock<HashMap<Uuid, i64>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(jti, expires_at.timestamp());
    }

    pub fn is_revoked(&self, jti: Uuid, now: DateTime<Utc>) -> bool {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.get(&jti).is_some_and(|exp| now.timestamp() < *exp)
    }

    /// Drop entries whose tokens have expired. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = entries.len();
        let now = now.timestamp();
        entries.retain(|_, exp| now < *exp);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
