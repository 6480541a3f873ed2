use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::FixedOffset;
use dotenvy::dotenv;
use strum_macros::{Display, EnumString};

use crate::service::geofence::DEFAULT_MAX_ACCURACY_METERS;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum StoreBackend {
    Memory,
    Mysql,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub api_prefix: String,

    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    /// JSON seed for the memory backend
    pub seed_file: Option<String>,

    pub org_utc_offset: FixedOffset,
    pub max_accuracy_meters: f64,
    pub recent_session_limit: usize,
    pub store_timeout: Duration,
    pub employee_cache_ttl: Duration,

    // Rate limiting
    pub rate_exec_per_min: u32,

    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let store_backend: StoreBackend = parse_or("STORE_BACKEND", StoreBackend::Memory)?;
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Mysql && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when STORE_BACKEND=mysql"));
        }

        let offset_raw = env::var("ORG_UTC_OFFSET").unwrap_or_else(|_| "+07:00".to_string()); // Asia/Bangkok
        let org_utc_offset = FixedOffset::from_str(&offset_raw)
            .map_err(|e| anyhow!("ORG_UTC_OFFSET {offset_raw:?} is not an offset: {e}"))?;

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            store_backend,
            database_url,
            seed_file: env::var("SEED_FILE").ok(),

            org_utc_offset,
            max_accuracy_meters: parse_or("MAX_ACCURACY_METERS", DEFAULT_MAX_ACCURACY_METERS)?,
            recent_session_limit: parse_or("RECENT_SESSION_LIMIT", 20)?,
            store_timeout: Duration::from_millis(parse_or("STORE_TIMEOUT_MS", 5000)?), // default 5 s
            employee_cache_ttl: Duration::from_secs(parse_or("EMPLOYEE_CACHE_TTL_SECS", 300)?), // default 5 min

            rate_exec_per_min: parse_or("RATE_EXEC_PER_MIN", 120)?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        Err(_) => Ok(default),
    }
}
