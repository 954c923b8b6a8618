use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use chrono::{Duration, Utc};
use thiserror::Error;

use crate::auth::SessionPolicy;
use crate::nutrition::DEFAULT_MAX_SLOTS;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    Memory,
}

impl FromStr for Storage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(Storage::Postgres),
            "memory" => Ok(Storage::Memory),
            other => Err(format!("unknown storage backend {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: Storage,
    pub database_url: Option<String>,
    /// JSON array of nutrition records, used to seed in-memory storage.
    pub products_file: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub db_pool_size: u32,
    pub max_ingredient_slots: usize,
    pub session_policy: SessionPolicy,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage: Storage = try_load(&lookup, "STORAGE", "postgres")?;
        let database_url = lookup("DATABASE_URL");
        if storage == Storage::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            storage,
            database_url,
            products_file: lookup("PRODUCTS_FILE").map(PathBuf::from),
            host: try_load(&lookup, "HOST", "0.0.0.0")?,
            port: try_load(&lookup, "PORT", "8080")?,
            db_pool_size: try_load(&lookup, "DB_POOL_SIZE", "10")?,
            max_ingredient_slots: try_load(
                &lookup,
                "MAX_INGREDIENT_SLOTS",
                &DEFAULT_MAX_SLOTS.to_string(),
            )?,
            session_policy: SessionPolicy {
                ttl: try_load_ttl(&lookup, "SESSION_TTL_HOURS", "24", Duration::try_hours)?,
                remember_me_ttl: try_load_ttl(
                    &lookup,
                    "REMEMBER_ME_TTL_DAYS",
                    "30",
                    Duration::try_days,
                )?,
            },
            run_migrations: try_load(&lookup, "RUN_MIGRATIONS", "true")?,
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

/// Loads a positive session lifetime. The expiry of a session created now
/// must still be a representable timestamp.
fn try_load_ttl<F>(
    lookup: &F,
    key: &'static str,
    default: &str,
    unit: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let amount: i64 = try_load(lookup, key, default)?;
    let invalid = |reason: &str| ConfigError::Invalid {
        key,
        value: amount.to_string(),
        reason: reason.to_string(),
    };

    if amount < 1 {
        return Err(invalid("must be at least 1"));
    }
    unit(amount)
        .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| invalid("out of range"))
}
