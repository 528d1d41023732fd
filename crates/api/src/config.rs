//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Duration as ChronoDuration;

use keygate_auth::{AuthConfig, DEFAULT_TOKEN_TTL_SECS};
use keygate_infra::DbOptions;

const DEV_SECRET: &str = "keygate-insecure-development-secret";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub options: DbOptions,
}

/// Seed a first tenant and administrator when the directory is empty.
#[derive(Clone)]
pub struct BootstrapConfig {
    pub domain_key: String,
    pub domain_name: String,
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl core::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("domain_key", &self.domain_key)
            .field("domain_name", &self.domain_name)
            .field("admin_username", &self.admin_username)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub auth: AuthConfig,
    /// `None` selects the in-memory directory.
    pub database: Option<DatabaseConfig>,
    pub revocation_enabled: bool,
    pub bootstrap: Option<BootstrapConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_SECRET.to_string()
        });

        let ttl_secs: i64 = parse_or(get("TOKEN_TTL_SECS"), "TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if ttl_secs <= 0 {
            bail!("TOKEN_TTL_SECS must be positive, got {ttl_secs}");
        }

        let mut auth = AuthConfig::new(secret).with_token_ttl(ChronoDuration::seconds(ttl_secs));
        if let Some(issuer) = get("TOKEN_ISSUER") {
            auth = auth.with_issuer(issuer);
        }

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address like 0.0.0.0:8080")?;

        let database = match get("DATABASE_URL") {
            Some(url) => {
                let timeout_ms: u64 = parse_or(get("DB_TIMEOUT_MS"), "DB_TIMEOUT_MS", 5000)?;
                let max_connections: u32 = parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?;
                Some(DatabaseConfig {
                    url,
                    options: DbOptions {
                        max_connections,
                        statement_timeout: Duration::from_millis(timeout_ms),
                    },
                })
            }
            None => None,
        };

        let revocation_enabled = parse_bool(get("REVOCATION_ENABLED"), "REVOCATION_ENABLED", true)?;

        let bootstrap = match (
            get("BOOTSTRAP_DOMAIN_KEY"),
            get("BOOTSTRAP_ADMIN_USERNAME"),
            get("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(domain_key), Some(admin_username), Some(admin_password)) => Some(BootstrapConfig {
                domain_name: get("BOOTSTRAP_DOMAIN_NAME").unwrap_or_else(|| domain_key.clone()),
                admin_email: get("BOOTSTRAP_ADMIN_EMAIL")
                    .unwrap_or_else(|| format!("{admin_username}@{domain_key}.local")),
                domain_key,
                admin_username,
                admin_password,
            }),
            (None, None, None) => None,
            _ => bail!(
                "BOOTSTRAP_DOMAIN_KEY, BOOTSTRAP_ADMIN_USERNAME and BOOTSTRAP_ADMIN_PASSWORD must be set together"
            ),
        };

        Ok(Self {
            bind_addr,
            auth,
            database,
            revocation_enabled,
            bootstrap,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v.trim().parse::<T>().with_context(|| format!("{key} has invalid value '{v}'")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("{key} must be a boolean, got '{v}'"),
        },
    }
}
