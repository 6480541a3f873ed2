use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ClockError;
use crate::model::attendance::{AttendanceSession, ClockOutMark, NewSession};
use crate::model::employee::Employee;
use crate::model::overtime::{Decision, OvertimeRequest, Viewer};
use crate::model::site::SiteConfig;

pub mod memory;
pub mod mysql;

/// Read-only employee reference data.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn find_employee(&self, identifier: &str) -> Result<Option<Employee>, ClockError>;

    async fn all_employees(&self) -> Result<Vec<Employee>, ClockError>;
}

/// Read-only site reference data.
#[async_trait]
pub trait SiteRegistry: Send + Sync {
    async fn find_site(&self, site_id: &str) -> Result<Option<SiteConfig>, ClockError>;
}

/// Durable attendance sessions.
///
/// Implementations make `open_session` and `close_latest_open` atomic per
/// employee: two concurrent clock-ins can never both create an open session.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Appends a session unless the employee already has an open one
    /// (`AlreadyOpenSession`).
    async fn open_session(&self, new: NewSession) -> Result<AttendanceSession, ClockError>;

    /// Closes the most recently opened open session (`NoOpenSession` if none).
    async fn close_latest_open(
        &self,
        employee_id: &str,
        mark: ClockOutMark,
    ) -> Result<AttendanceSession, ClockError>;

    /// Newest first.
    async fn recent_sessions(
        &self,
        employee_id: &str,
        limit: usize,
    ) -> Result<Vec<AttendanceSession>, ClockError>;

    /// Sessions clocked in at or after `since`, newest first.
    async fn sessions_since(
        &self,
        employee_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<AttendanceSession>, ClockError>;
}

/// Durable overtime requests.
#[async_trait]
pub trait OvertimeBackend: Send + Sync {
    async fn insert_request(&self, request: &OvertimeRequest) -> Result<(), ClockError>;

    async fn find_request(&self, id: &str) -> Result<Option<OvertimeRequest>, ClockError>;

    /// Compare-and-swap on status: applies the decision only while the request
    /// is still pending. Returns whether it was applied.
    async fn decide_if_pending(&self, id: &str, decision: &Decision) -> Result<bool, ClockError>;

    /// Requests the viewer may see, newest first.
    async fn requests_for(&self, viewer: &Viewer) -> Result<Vec<OvertimeRequest>, ClockError>;
}

/// The four backends the core runs on.
#[derive(Clone)]
pub struct Backends {
    pub directory: Arc<dyn EmployeeDirectory>,
    pub sites: Arc<dyn SiteRegistry>,
    pub sessions: Arc<dyn SessionBackend>,
    pub overtime: Arc<dyn OvertimeBackend>,
}

impl Backends {
    /// All four concerns served by one store.
    pub fn single<S>(store: Arc<S>) -> Self
    where
        S: EmployeeDirectory + SiteRegistry + SessionBackend + OvertimeBackend + 'static,
    {
        Self {
            directory: store.clone(),
            sites: store.clone(),
            sessions: store.clone(),
            overtime: store,
        }
    }
}
