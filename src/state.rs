use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::{Config, StoreBackend};
use crate::db::init_db;
use crate::service::geofence::GeofenceValidator;
use crate::service::ledger::AttendanceLedger;
use crate::service::overtime::OvertimeRequestStore;
use crate::store::memory::MemoryStore;
use crate::store::mysql::MySqlStore;
use crate::store::Backends;
use crate::utils::clock::OrgClock;

/// Everything a request handler needs, shared across workers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: AttendanceLedger,
    pub overtime: OvertimeRequestStore,
    pub clock: OrgClock,
}

impl AppState {
    pub fn new(config: &Config, backends: Backends, clock: OrgClock) -> Self {
        let geofence = GeofenceValidator::new(
            backends.sites.clone(),
            config.max_accuracy_meters,
            config.store_timeout,
        );
        let ledger = AttendanceLedger::new(
            backends.directory,
            backends.sessions,
            geofence,
            clock.clone(),
            config.store_timeout,
            config.recent_session_limit,
        );
        let overtime =
            OvertimeRequestStore::new(backends.overtime, clock.clone(), config.store_timeout);

        Self {
            ledger,
            overtime,
            clock,
        }
    }
}

/// Opens the configured storage backend.
pub async fn open_backends(config: &Config) -> anyhow::Result<Backends> {
    match config.store_backend {
        StoreBackend::Memory => {
            let store = match &config.seed_file {
                Some(path) => MemoryStore::from_seed_file(path)?,
                None => {
                    warn!("SEED_FILE not set, memory store starts empty");
                    MemoryStore::new()
                }
            };
            info!("Using in-memory store");
            Ok(Backends::single(Arc::new(store)))
        }
        StoreBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url, config.store_timeout).await?;
            info!("Using MySQL store");
            Ok(Backends::single(Arc::new(MySqlStore::new(pool))))
        }
    }
}
