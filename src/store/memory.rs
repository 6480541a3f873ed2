use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::auth::password::hash_password;
use crate::error::ClockError;
use crate::model::attendance::{AttendanceSession, ClockOutMark, NewSession};
use crate::model::employee::{Employee, EmployeeRole, RoleKind};
use crate::model::overtime::{Decision, OtStatus, OvertimeRequest, Viewer};
use crate::model::site::SiteConfig;
use crate::store::{EmployeeDirectory, OvertimeBackend, SessionBackend, SiteRegistry};

/// Process-local store. Everything lives behind async locks; each mutating
/// operation holds one write lock for its whole check-and-write.
#[derive(Default)]
pub struct MemoryStore {
    employees: RwLock<HashMap<String, Employee>>,
    sites: RwLock<HashMap<String, SiteConfig>>,
    sessions: RwLock<SessionTable>,
    overtime: RwLock<Vec<OvertimeRequest>>,
}

#[derive(Default)]
struct SessionTable {
    /// Append order is clock-in order
    rows: Vec<AttendanceSession>,
    /// employee id -> row index of its open session
    open: HashMap<String, usize>,
    next_id: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Seed {
    #[serde(default)]
    employees: Vec<SeedEmployee>,
    #[serde(default)]
    sites: Vec<SiteConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedEmployee {
    identifier: String,
    name: String,
    role: RoleKind,
    #[serde(default)]
    site_id: Option<String>,
    #[serde(default)]
    position: String,
    credential: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads employees and sites from a JSON seed file. Credentials in the
    /// file are plain text and hashed on load.
    pub fn from_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let seed: Seed = serde_json::from_str(&raw)
            .with_context(|| format!("parsing seed file {}", path.display()))?;

        let mut store = Self::new();
        for site in seed.sites {
            store = store.with_site(site);
        }
        for e in seed.employees {
            let role = EmployeeRole::from_parts(e.role, e.site_id).ok_or_else(|| {
                anyhow!("employee {} has role {} but no site", e.identifier, e.role)
            })?;
            let credential_hash = hash_password(&e.credential)
                .map_err(|err| anyhow!("hashing credential of {}: {}", e.identifier, err))?;
            store = store.with_employee(Employee {
                identifier: e.identifier,
                name: e.name,
                role,
                position: e.position,
                credential_hash,
            });
        }
        Ok(store)
    }

    pub fn with_employee(mut self, employee: Employee) -> Self {
        self.employees
            .get_mut()
            .insert(employee.identifier.clone(), employee);
        self
    }

    pub fn with_site(mut self, site: SiteConfig) -> Self {
        self.sites.get_mut().insert(site.site_id.clone(), site);
        self
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryStore {
    async fn find_employee(&self, identifier: &str) -> Result<Option<Employee>, ClockError> {
        Ok(self.employees.read().await.get(identifier).cloned())
    }

    async fn all_employees(&self) -> Result<Vec<Employee>, ClockError> {
        Ok(self.employees.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl SiteRegistry for MemoryStore {
    async fn find_site(&self, site_id: &str) -> Result<Option<SiteConfig>, ClockError> {
        Ok(self.sites.read().await.get(site_id).cloned())
    }
}

#[async_trait]
impl SessionBackend for MemoryStore {
    async fn open_session(&self, new: NewSession) -> Result<AttendanceSession, ClockError> {
        let mut table = self.sessions.write().await;
        if table.open.contains_key(&new.employee_id) {
            return Err(ClockError::AlreadyOpenSession);
        }

        table.next_id += 1;
        let session = AttendanceSession {
            id: table.next_id,
            employee_id: new.employee_id,
            name: new.name,
            site_id: new.site_id,
            clock_in_at: new.clock_in_at,
            clock_in_coord: new.coordinate,
            clock_out_at: None,
            clock_out_coord: None,
            worked_seconds: None,
        };
        let index = table.rows.len();
        table.open.insert(session.employee_id.clone(), index);
        table.rows.push(session.clone());
        Ok(session)
    }

    async fn close_latest_open(
        &self,
        employee_id: &str,
        mark: ClockOutMark,
    ) -> Result<AttendanceSession, ClockError> {
        let mut table = self.sessions.write().await;
        let index = table
            .open
            .remove(employee_id)
            .ok_or(ClockError::NoOpenSession)?;
        let row = &mut table.rows[index];
        row.close(&mark);
        Ok(row.clone())
    }

    async fn recent_sessions(
        &self,
        employee_id: &str,
        limit: usize,
    ) -> Result<Vec<AttendanceSession>, ClockError> {
        let table = self.sessions.read().await;
        Ok(table
            .rows
            .iter()
            .rev()
            .filter(|s| s.employee_id == employee_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn sessions_since(
        &self,
        employee_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<AttendanceSession>, ClockError> {
        let table = self.sessions.read().await;
        Ok(table
            .rows
            .iter()
            .rev()
            .filter(|s| s.employee_id == employee_id && s.clock_in_at >= since)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OvertimeBackend for MemoryStore {
    async fn insert_request(&self, request: &OvertimeRequest) -> Result<(), ClockError> {
        let mut requests = self.overtime.write().await;
        if requests.iter().any(|r| r.id == request.id) {
            return Err(ClockError::StoreUnavailable(format!(
                "duplicate overtime request id {}",
                request.id
            )));
        }
        requests.push(request.clone());
        Ok(())
    }

    async fn find_request(&self, id: &str) -> Result<Option<OvertimeRequest>, ClockError> {
        Ok(self
            .overtime
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn decide_if_pending(&self, id: &str, decision: &Decision) -> Result<bool, ClockError> {
        let mut requests = self.overtime.write().await;
        match requests
            .iter_mut()
            .find(|r| r.id == id && r.status == OtStatus::Pending)
        {
            Some(request) => {
                request.apply(decision);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn requests_for(&self, viewer: &Viewer) -> Result<Vec<OvertimeRequest>, ClockError> {
        let requests = self.overtime.read().await;
        let mut visible: Vec<OvertimeRequest> = requests
            .iter()
            .filter(|r| viewer.can_see(r))
            .cloned()
            .collect();
        // stable sort keeps later inserts ahead on equal timestamps once reversed
        visible.sort_by_key(|r| r.created_at);
        visible.reverse();
        Ok(visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::Coordinate;
    use chrono::{Duration, TimeZone};

    const HERE: Coordinate = Coordinate {
        latitude: 13.75,
        longitude: 100.5,
    };

    fn new_session(employee_id: &str, at: DateTime<Utc>) -> NewSession {
        NewSession {
            employee_id: employee_id.into(),
            name: "Niran".into(),
            site_id: Some("S".into()),
            clock_in_at: at,
            coordinate: HERE,
        }
    }

    #[tokio::test]
    async fn second_open_session_is_refused() {
        let store = MemoryStore::new();
        let t = Utc.with_ymd_and_hms(2026, 2, 1, 1, 0, 0).unwrap();
        store.open_session(new_session("E1", t)).await.unwrap();
        let err = store.open_session(new_session("E1", t)).await.unwrap_err();
        assert!(matches!(err, ClockError::AlreadyOpenSession));
        // a different employee is unaffected
        store.open_session(new_session("E2", t)).await.unwrap();
        assert_eq!(store.recent_sessions("E1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn close_targets_open_row_and_frees_employee() {
        let store = MemoryStore::new();
        let t = Utc.with_ymd_and_hms(2026, 2, 1, 1, 0, 0).unwrap();
        store.open_session(new_session("E1", t)).await.unwrap();
        let closed = store
            .close_latest_open(
                "E1",
                ClockOutMark {
                    at: t + Duration::hours(8),
                    coordinate: HERE,
                },
            )
            .await
            .unwrap();
        assert_eq!(closed.worked_seconds, Some(8 * 3600));

        let err = store
            .close_latest_open(
                "E1",
                ClockOutMark {
                    at: t + Duration::hours(9),
                    coordinate: HERE,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClockError::NoOpenSession));
        store
            .open_session(new_session("E1", t + Duration::hours(20)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn recent_sessions_are_newest_first_and_limited() {
        let store = MemoryStore::new();
        let t = Utc.with_ymd_and_hms(2026, 2, 1, 1, 0, 0).unwrap();
        for day in 0..5 {
            let at = t + Duration::days(day);
            store.open_session(new_session("E1", at)).await.unwrap();
            store
                .close_latest_open(
                    "E1",
                    ClockOutMark {
                        at: at + Duration::hours(1),
                        coordinate: HERE,
                    },
                )
                .await
                .unwrap();
        }
        let recent = store.recent_sessions("E1", 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].clock_in_at, t + Duration::days(4));
        assert_eq!(recent[2].clock_in_at, t + Duration::days(2));

        let since = store
            .sessions_since("E1", t + Duration::days(3))
            .await
            .unwrap();
        assert_eq!(since.len(), 2);
    }

    #[tokio::test]
    async fn seed_file_is_loaded_and_hashed() {
        let dir = std::env::temp_dir().join(format!("geoclock-seed-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("seed.json");
        std::fs::write(
            &path,
            r#"{
                "sites": [{"siteId": "S", "latitude": 13.75, "longitude": 100.5}],
                "employees": [{"identifier": "somchai", "name": "Somchai", "role": "Fixed",
                               "siteId": "S", "position": "Guard", "credential": "1001"}]
            }"#,
        )
        .unwrap();

        let store = MemoryStore::from_seed_file(&path).unwrap();
        let employee = store.find_employee("somchai").await.unwrap().unwrap();
        assert_eq!(employee.role, EmployeeRole::FixedSite("S".into()));
        assert_ne!(employee.credential_hash, "1001");
        let site = store.find_site("S").await.unwrap().unwrap();
        assert_eq!(site.allowed_radius(), 200.0);
        std::fs::remove_dir_all(dir).ok();
    }
}
