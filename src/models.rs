use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ClockError;
use crate::model::attendance::{AttendanceSession, AttendanceSummary};
use crate::model::employee::{Employee, RoleKind};
use crate::model::overtime::{OtStatus, OvertimeRequest};
use crate::utils::clock::OrgClock;

/* =========================
Inbound payloads
========================= */

#[derive(Deserialize, ToSchema)]
pub struct ActionEnvelope {
    #[schema(example = "CLOCK_IN")]
    pub action: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[serde(alias = "username")]
    #[schema(example = "somchai")]
    pub identifier: String,
    #[serde(alias = "password")]
    #[schema(example = "1001")]
    pub credential: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClockPayload {
    #[serde(alias = "username")]
    #[schema(example = "somchai")]
    pub employee_identifier: String,
    #[schema(example = 13.7501)]
    pub latitude: f64,
    #[schema(example = 100.5001)]
    pub longitude: f64,
    /// GPS accuracy radius in meters
    #[serde(default)]
    #[schema(example = 15.0)]
    pub accuracy: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtPayload {
    #[serde(alias = "staffId")]
    #[schema(example = "somchai")]
    pub employee_id: String,
    #[schema(example = "Somchai")]
    pub name: String,
    #[schema(example = "S01")]
    pub site_id: String,
    /// RFC 3339, or local `YYYY-MM-DDTHH:MM`
    #[schema(example = "2026-01-10T18:00")]
    pub start: String,
    #[schema(example = "2026-01-10T20:00")]
    pub end: String,
    #[schema(example = "inventory count")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecideOtPayload {
    #[schema(example = "OT-20260110093000123-somchai-1a2b3c4d")]
    pub request_id: String,
    #[serde(alias = "status")]
    #[schema(example = "Approved")]
    pub decision: String,
    #[schema(example = "Malee")]
    pub approver_name: String,
    #[serde(alias = "role")]
    #[schema(example = "Supervisor")]
    pub acting_role: String,
    #[schema(example = "S01")]
    pub site_id: String,
}

/* =========================
Outbound views
========================= */

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[schema(example = "somchai")]
    pub identifier: String,
    #[schema(example = "Somchai")]
    pub name: String,
    pub role: RoleKind,
    #[schema(example = "S01", nullable = true)]
    pub site_id: Option<String>,
    #[schema(example = "Security guard")]
    pub position: String,
}

impl From<&Employee> for UserView {
    fn from(e: &Employee) -> Self {
        Self {
            identifier: e.identifier.clone(),
            name: e.name.clone(),
            role: e.role.kind(),
            site_id: e.site_id().map(str::to_string),
            position: e.position.clone(),
        }
    }
}

/// A session split into local date and time columns.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: u64,
    pub employee_id: String,
    pub name: String,
    pub site_id: Option<String>,
    #[schema(example = "2026-01-10")]
    pub date_in: String,
    #[schema(example = "22:00:00")]
    pub time_in: String,
    pub in_lat: f64,
    pub in_lng: f64,
    #[schema(example = "2026-01-11", nullable = true)]
    pub date_out: Option<String>,
    #[schema(example = "02:00:00", nullable = true)]
    pub time_out: Option<String>,
    pub out_lat: Option<f64>,
    pub out_lng: Option<f64>,
    #[schema(example = 4.0, nullable = true)]
    pub working_hours: Option<f64>,
}

impl SessionView {
    pub fn new(s: &AttendanceSession, clock: &OrgClock) -> Self {
        Self {
            id: s.id,
            employee_id: s.employee_id.clone(),
            name: s.name.clone(),
            site_id: s.site_id.clone(),
            date_in: clock.format_date(s.clock_in_at),
            time_in: clock.format_time(s.clock_in_at),
            in_lat: s.clock_in_coord.latitude,
            in_lng: s.clock_in_coord.longitude,
            date_out: s.clock_out_at.map(|t| clock.format_date(t)),
            time_out: s.clock_out_at.map(|t| clock.format_time(t)),
            out_lat: s.clock_out_coord.map(|c| c.latitude),
            out_lng: s.clock_out_coord.map(|c| c.longitude),
            working_hours: s.worked_hours(),
        }
    }

    pub fn list(sessions: &[AttendanceSession], clock: &OrgClock) -> Vec<Self> {
        sessions.iter().map(|s| Self::new(s, clock)).collect()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeView {
    pub id: String,
    pub employee_id: String,
    pub name: String,
    pub site_id: String,
    #[schema(example = "2026-01-10T18:00:00+07:00")]
    pub start: String,
    #[schema(example = "2026-01-10T20:00:00+07:00")]
    pub end: String,
    #[schema(example = 2.0)]
    pub hours: f64,
    pub reason: String,
    pub status: OtStatus,
    pub approver_name: Option<String>,
    pub decided_at: Option<String>,
    pub created_at: String,
}

impl OvertimeView {
    pub fn new(r: &OvertimeRequest, clock: &OrgClock) -> Self {
        Self {
            id: r.id.clone(),
            employee_id: r.employee_id.clone(),
            name: r.name.clone(),
            site_id: r.site_id.clone(),
            start: clock.format_rfc3339(r.interval.start()),
            end: clock.format_rfc3339(r.interval.end()),
            hours: r.interval.hours(),
            reason: r.reason.clone(),
            status: r.status,
            approver_name: r.approver_name.clone(),
            decided_at: r.decided_at.map(|t| clock.format_rfc3339(t)),
            created_at: clock.format_rfc3339(r.created_at),
        }
    }

    pub fn list(requests: &[OvertimeRequest], clock: &OrgClock) -> Vec<Self> {
        requests.iter().map(|r| Self::new(r, clock)).collect()
    }
}

/* =========================
Response envelope
========================= */

/// `{ success, message, ...data }` for every core outcome.
#[derive(Debug, Serialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "success": true,
    "message": "Clocked in at 08:01:12",
    "recentSessions": [],
    "visibleOTRequests": []
}))]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_sessions: Option<Vec<SessionView>>,
    #[serde(rename = "visibleOTRequests", skip_serializing_if = "Option::is_none")]
    pub visible_ot_requests: Option<Vec<OvertimeView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<OvertimeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_summary: Option<AttendanceSummary>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn failure(err: &ClockError) -> Self {
        Self {
            success: false,
            message: err.user_message(),
            ..Default::default()
        }
    }
}
