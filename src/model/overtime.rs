use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ClockError;
use crate::model::attendance::hours_from_seconds;
use crate::model::employee::{Employee, EmployeeRole};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum OtStatus {
    Pending,
    Approved,
    Rejected,
}

impl OtStatus {
    pub fn is_decision(&self) -> bool {
        matches!(self, OtStatus::Approved | OtStatus::Rejected)
    }
}

/// Requested overtime window, end strictly after start.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OtInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl OtInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ClockError> {
        if end <= start {
            return Err(ClockError::BadRequest(
                "overtime end must be after start".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn hours(&self) -> f64 {
        hours_from_seconds((self.end - self.start).num_seconds())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OvertimeRequest {
    pub id: String,
    pub employee_id: String,
    pub name: String,
    pub site_id: String,
    pub interval: OtInterval,
    pub reason: String,
    pub status: OtStatus,
    pub approver_name: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OvertimeRequest {
    /// Applies a decision. Only valid on a pending request.
    pub fn apply(&mut self, decision: &Decision) {
        self.status = decision.status;
        self.approver_name = Some(decision.approver_name.clone());
        self.decided_at = Some(decision.decided_at);
    }
}

#[derive(Debug, Clone)]
pub struct NewOvertime {
    pub employee_id: String,
    pub name: String,
    pub site_id: String,
    pub interval: OtInterval,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub status: OtStatus,
    pub approver_name: String,
    pub decided_at: DateTime<Utc>,
}

/// Who is looking at the request list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// Sees its own site plus every pending request
    Supervisor { site_id: String },
    /// Sees only its own requests
    Staff { employee_id: String },
}

impl Viewer {
    pub fn for_employee(employee: &Employee) -> Self {
        match &employee.role {
            EmployeeRole::Supervisor(site_id) => Viewer::Supervisor {
                site_id: site_id.clone(),
            },
            _ => Viewer::Staff {
                employee_id: employee.identifier.clone(),
            },
        }
    }

    pub fn can_see(&self, request: &OvertimeRequest) -> bool {
        match self {
            Viewer::Supervisor { site_id } => {
                request.site_id == *site_id || request.status == OtStatus::Pending
            }
            Viewer::Staff { employee_id } => request.employee_id == *employee_id,
        }
    }
}

/// `OT-<utc millis stamp>-<employee>-<random>`; the random tail keeps two
/// requests from the same employee in the same millisecond apart.
pub fn generate_request_id(now: DateTime<Utc>, employee_id: &str) -> String {
    let nonce = Uuid::new_v4().to_string();
    format!(
        "OT-{}-{}-{}",
        now.format("%Y%m%d%H%M%S%3f"),
        employee_id,
        &nonce[..8]
    )
}
