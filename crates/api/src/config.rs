//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";

const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;
const MAX_CLOCK_SKEW_SECS: i64 = 24 * 60 * 60;

// Argon2 crate defaults (OWASP minimums for Argon2id).
const DEFAULT_ARGON2_MEMORY_KIB: u32 = 19 * 1024;
const DEFAULT_ARGON2_ITERATIONS: u32 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is required when {reason}")]
    Missing { key: &'static str, reason: &'static str },

    #[error("invalid {key}='{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Credentials for the administrator created at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub clock_skew: Duration,
    pub default_role: String,
    pub bind_addr: SocketAddr,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub seed_admin: Option<SeedAdmin>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl: Duration::seconds(3600),
            clock_skew: Duration::seconds(30),
            default_role: "EMPLOYEE".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            use_persistent_stores: false,
            database_url: None,
            database_max_connections: 5,
            argon2_memory_kib: DEFAULT_ARGON2_MEMORY_KIB,
            argon2_iterations: DEFAULT_ARGON2_ITERATIONS,
            seed_admin: None,
        }
    }
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl.num_seconds())
            .field("clock_skew_secs", &self.clock_skew.num_seconds())
            .field("default_role", &self.default_role)
            .field("bind_addr", &self.bind_addr)
            .field("use_persistent_stores", &self.use_persistent_stores)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("argon2_memory_kib", &self.argon2_memory_kib)
            .field("argon2_iterations", &self.argon2_iterations)
            .field("seed_admin", &self.seed_admin)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys take defaults; set but
    /// unparseable values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if secret.is_empty() => {
                return Err(invalid("JWT_SECRET", &secret, "must not be empty"));
            }
            Some(secret) => {
                if secret.len() < 32 {
                    tracing::warn!("JWT_SECRET is shorter than 32 bytes");
                }
                secret
            }
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                defaults.jwt_secret
            }
        };

        let token_ttl = seconds_in_range(
            "TOKEN_TTL_SECS",
            &lookup,
            defaults.token_ttl,
            1,
            MAX_TOKEN_TTL_SECS,
        )?;
        let clock_skew = seconds_in_range(
            "TOKEN_CLOCK_SKEW_SECS",
            &lookup,
            defaults.clock_skew,
            0,
            MAX_CLOCK_SKEW_SECS,
        )?;

        let use_persistent_stores = match lookup("USE_PERSISTENT_STORES") {
            Some(v) => parse_bool("USE_PERSISTENT_STORES", &v)?,
            None => false,
        };
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing {
                key: "DATABASE_URL",
                reason: "USE_PERSISTENT_STORES=true",
            });
        }

        let seed_admin = lookup("SEED_ADMIN_PASSWORD").map(|password| SeedAdmin {
            username: lookup("SEED_ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            email: lookup("SEED_ADMIN_EMAIL").unwrap_or_else(|| "admin@taskdesk.local".to_string()),
            password,
        });

        Ok(Self {
            jwt_secret,
            token_ttl,
            clock_skew,
            default_role: lookup("DEFAULT_ROLE").unwrap_or(defaults.default_role),
            bind_addr: parse_or("BIND_ADDR", &lookup, defaults.bind_addr)?,
            use_persistent_stores,
            database_url,
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                &lookup,
                defaults.database_max_connections,
            )?,
            argon2_memory_kib: parse_or("ARGON2_MEMORY_KIB", &lookup, defaults.argon2_memory_kib)?,
            argon2_iterations: parse_or("ARGON2_ITERATIONS", &lookup, defaults.argon2_iterations)?,
            seed_admin,
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T>(
    key: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(key, &raw, e.to_string())),
        None => Ok(default),
    }
}

/// A whole number of seconds within `min..=max`.
fn seconds_in_range(
    key: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: Duration,
    min: i64,
    max: i64,
) -> Result<Duration, ConfigError> {
    let secs = parse_or(key, lookup, default.num_seconds())?;
    if !(min..=max).contains(&secs) {
        return Err(invalid(key, &secs.to_string(), format!("must be between {min} and {max}")));
    }
    Duration::try_seconds(secs).ok_or_else(|| invalid(key, &secs.to_string(), "out of range"))
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, raw, "expected true or false")),
    }
}
