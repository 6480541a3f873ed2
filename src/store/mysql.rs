use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures_util::StreamExt;
use sqlx::{FromRow, MySqlPool};

use crate::error::ClockError;
use crate::model::attendance::{AttendanceSession, ClockOutMark, Coordinate, NewSession};
use crate::model::employee::{Employee, EmployeeRole, RoleKind};
use crate::model::overtime::{Decision, OtInterval, OtStatus, OvertimeRequest, Viewer};
use crate::model::site::SiteConfig;
use crate::store::{EmployeeDirectory, OvertimeBackend, SessionBackend, SiteRegistry};

/// MySQL-backed store. Timestamps are stored as UTC `DATETIME(3)`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    identifier: String,
    name: String,
    role: String,
    site_id: Option<String>,
    position: String,
    credential_hash: String,
}

impl EmployeeRow {
    fn into_employee(self) -> Option<Employee> {
        let role = RoleKind::from_str(&self.role)
            .ok()
            .and_then(|kind| EmployeeRole::from_parts(kind, self.site_id));
        let Some(role) = role else {
            tracing::warn!(identifier = %self.identifier, role = %self.role, "Skipping employee with invalid role");
            return None;
        };
        Some(Employee {
            identifier: self.identifier,
            name: self.name,
            role,
            position: self.position,
            credential_hash: self.credential_hash,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: u64,
    employee_id: String,
    name: String,
    site_id: Option<String>,
    clock_in_at: NaiveDateTime,
    in_lat: f64,
    in_lng: f64,
    clock_out_at: Option<NaiveDateTime>,
    out_lat: Option<f64>,
    out_lng: Option<f64>,
    worked_seconds: Option<i64>,
}

impl From<SessionRow> for AttendanceSession {
    fn from(row: SessionRow) -> Self {
        let clock_out_coord = match (row.out_lat, row.out_lng) {
            (Some(latitude), Some(longitude)) => Some(Coordinate {
                latitude,
                longitude,
            }),
            _ => None,
        };
        AttendanceSession {
            id: row.id,
            employee_id: row.employee_id,
            name: row.name,
            site_id: row.site_id,
            clock_in_at: row.clock_in_at.and_utc(),
            clock_in_coord: Coordinate {
                latitude: row.in_lat,
                longitude: row.in_lng,
            },
            clock_out_at: row.clock_out_at.map(|t| t.and_utc()),
            clock_out_coord,
            worked_seconds: row.worked_seconds,
        }
    }
}

#[derive(FromRow)]
struct OvertimeRow {
    id: String,
    employee_id: String,
    name: String,
    site_id: String,
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
    reason: String,
    status: String,
    approver_name: Option<String>,
    decided_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

impl TryFrom<OvertimeRow> for OvertimeRequest {
    type Error = ClockError;

    fn try_from(row: OvertimeRow) -> Result<Self, Self::Error> {
        let status = OtStatus::from_str(&row.status).map_err(|_| {
            ClockError::StoreUnavailable(format!("request {} has status {}", row.id, row.status))
        })?;
        let interval = OtInterval::new(row.start_at.and_utc(), row.end_at.and_utc())
            .map_err(|_| ClockError::StoreUnavailable(format!("request {} has empty interval", row.id)))?;
        Ok(OvertimeRequest {
            id: row.id,
            employee_id: row.employee_id,
            name: row.name,
            site_id: row.site_id,
            interval,
            reason: row.reason,
            status,
            approver_name: row.approver_name,
            decided_at: row.decided_at.map(|t| t.and_utc()),
            created_at: row.created_at.and_utc(),
        })
    }
}

const SESSION_COLUMNS: &str = "id, employee_id, name, site_id, clock_in_at, in_lat, in_lng, \
     clock_out_at, out_lat, out_lng, worked_seconds";

const OVERTIME_COLUMNS: &str = "id, employee_id, name, site_id, start_at, end_at, reason, \
     status, approver_name, decided_at, created_at";

#[async_trait]
impl EmployeeDirectory for MySqlStore {
    async fn find_employee(&self, identifier: &str) -> Result<Option<Employee>, ClockError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT identifier, name, role, site_id, position, credential_hash
            FROM employees
            WHERE identifier = ?
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(EmployeeRow::into_employee))
    }

    async fn all_employees(&self) -> Result<Vec<Employee>, ClockError> {
        let mut stream = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT identifier, name, role, site_id, position, credential_hash
            FROM employees
            "#,
        )
        .fetch(&self.pool);

        let mut employees = Vec::new();
        while let Some(row) = stream.next().await {
            if let Some(employee) = row?.into_employee() {
                employees.push(employee);
            }
        }
        Ok(employees)
    }
}

#[async_trait]
impl SiteRegistry for MySqlStore {
    async fn find_site(&self, site_id: &str) -> Result<Option<SiteConfig>, ClockError> {
        let site = sqlx::query_as::<_, SiteConfig>(
            r#"
            SELECT site_id, name, latitude, longitude, radius_meters
            FROM sites
            WHERE site_id = ?
            "#,
        )
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(site)
    }
}

#[async_trait]
impl SessionBackend for MySqlStore {
    async fn open_session(&self, new: NewSession) -> Result<AttendanceSession, ClockError> {
        let mut tx = self.pool.begin().await?;

        // the employee row is the per-employee lock
        let locked = sqlx::query_scalar::<_, String>(
            "SELECT identifier FROM employees WHERE identifier = ? FOR UPDATE",
        )
        .bind(&new.employee_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(ClockError::EmployeeNotFound);
        }

        let open = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT id FROM attendance_sessions
            WHERE employee_id = ? AND clock_out_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(&new.employee_id)
        .fetch_optional(&mut *tx)
        .await?;
        if open.is_some() {
            return Err(ClockError::AlreadyOpenSession);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO attendance_sessions
                (employee_id, name, site_id, clock_in_at, in_lat, in_lng)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.employee_id)
        .bind(&new.name)
        .bind(&new.site_id)
        .bind(new.clock_in_at.naive_utc())
        .bind(new.coordinate.latitude)
        .bind(new.coordinate.longitude)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AttendanceSession {
            id: result.last_insert_id(),
            employee_id: new.employee_id,
            name: new.name,
            site_id: new.site_id,
            clock_in_at: new.clock_in_at,
            clock_in_coord: new.coordinate,
            clock_out_at: None,
            clock_out_coord: None,
            worked_seconds: None,
        })
    }

    async fn close_latest_open(
        &self,
        employee_id: &str,
        mark: ClockOutMark,
    ) -> Result<AttendanceSession, ClockError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT identifier FROM employees WHERE identifier = ? FOR UPDATE")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM attendance_sessions
            WHERE employee_id = ? AND clock_out_at IS NULL
            ORDER BY clock_in_at DESC, id DESC
            LIMIT 1
            FOR UPDATE
            "#
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut session: AttendanceSession = match row {
            Some(row) => row.into(),
            None => return Err(ClockError::NoOpenSession),
        };

        session.close(&mark);

        sqlx::query(
            r#"
            UPDATE attendance_sessions
            SET clock_out_at = ?, out_lat = ?, out_lng = ?, worked_seconds = ?
            WHERE id = ? AND clock_out_at IS NULL
            "#,
        )
        .bind(mark.at.naive_utc())
        .bind(mark.coordinate.latitude)
        .bind(mark.coordinate.longitude)
        .bind(session.worked_seconds)
        .bind(session.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(session)
    }

    async fn recent_sessions(
        &self,
        employee_id: &str,
        limit: usize,
    ) -> Result<Vec<AttendanceSession>, ClockError> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM attendance_sessions
            WHERE employee_id = ?
            ORDER BY clock_in_at DESC, id DESC
            LIMIT ?
            "#
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(employee_id)
            .bind(limit as u64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn sessions_since(
        &self,
        employee_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<AttendanceSession>, ClockError> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM attendance_sessions
            WHERE employee_id = ? AND clock_in_at >= ?
            ORDER BY clock_in_at DESC, id DESC
            "#
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(employee_id)
            .bind(since.naive_utc())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl OvertimeBackend for MySqlStore {
    async fn insert_request(&self, request: &OvertimeRequest) -> Result<(), ClockError> {
        sqlx::query(
            r#"
            INSERT INTO overtime_requests
                (id, employee_id, name, site_id, start_at, end_at, reason, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.employee_id)
        .bind(&request.name)
        .bind(&request.site_id)
        .bind(request.interval.start().naive_utc())
        .bind(request.interval.end().naive_utc())
        .bind(&request.reason)
        .bind(request.status.as_ref())
        .bind(request.created_at.naive_utc())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_request(&self, id: &str) -> Result<Option<OvertimeRequest>, ClockError> {
        let sql = format!("SELECT {OVERTIME_COLUMNS} FROM overtime_requests WHERE id = ?");
        sqlx::query_as::<_, OvertimeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(OvertimeRequest::try_from)
            .transpose()
    }

    async fn decide_if_pending(&self, id: &str, decision: &Decision) -> Result<bool, ClockError> {
        let result = sqlx::query(
            r#"
            UPDATE overtime_requests
            SET status = ?, approver_name = ?, decided_at = ?
            WHERE id = ?
            AND status = 'Pending'
            "#,
        )
        .bind(decision.status.as_ref())
        .bind(&decision.approver_name)
        .bind(decision.decided_at.naive_utc())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn requests_for(&self, viewer: &Viewer) -> Result<Vec<OvertimeRequest>, ClockError> {
        let rows = match viewer {
            Viewer::Supervisor { site_id } => {
                let sql = format!(
                    r#"
                    SELECT {OVERTIME_COLUMNS}
                    FROM overtime_requests
                    WHERE site_id = ? OR status = 'Pending'
                    ORDER BY created_at DESC
                    "#
                );
                sqlx::query_as::<_, OvertimeRow>(&sql)
                    .bind(site_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            Viewer::Staff { employee_id } => {
                let sql = format!(
                    r#"
                    SELECT {OVERTIME_COLUMNS}
                    FROM overtime_requests
                    WHERE employee_id = ?
                    ORDER BY created_at DESC
                    "#
                );
                sqlx::query_as::<_, OvertimeRow>(&sql)
                    .bind(employee_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(OvertimeRequest::try_from).collect()
    }
}
