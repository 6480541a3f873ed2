use std::str::FromStr;

use crate::error::ClockError;
use crate::model::employee::RoleKind;
use crate::model::overtime::{NewOvertime, OtInterval, OtStatus, Viewer};
use crate::models::{ApiResponse, DecideOtPayload, OvertimeView, RequestOtPayload};
use crate::state::AppState;

/* =========================
Create overtime request
========================= */
pub async fn request_ot(
    state: &AppState,
    payload: RequestOtPayload,
) -> Result<ApiResponse, ClockError> {
    for (field, value) in [
        ("employeeId", &payload.employee_id),
        ("name", &payload.name),
        ("siteId", &payload.site_id),
    ] {
        if value.trim().is_empty() {
            return Err(ClockError::BadRequest(format!("{field} is required")));
        }
    }

    let start = parse_timestamp(state, "start", &payload.start)?;
    let end = parse_timestamp(state, "end", &payload.end)?;
    let interval = OtInterval::new(start, end)?;

    // the requester's role decides which list comes back
    let requester = state.ledger.resolve_employee(&payload.employee_id).await?;

    let request = state
        .overtime
        .create(NewOvertime {
            employee_id: requester.identifier.clone(),
            name: payload.name,
            site_id: payload.site_id,
            interval,
            reason: payload.reason,
        })
        .await?;

    let visible = state
        .overtime
        .visible_to(&Viewer::for_employee(&requester))
        .await?;

    Ok(ApiResponse {
        request: Some(OvertimeView::new(&request, &state.clock)),
        visible_ot_requests: Some(OvertimeView::list(&visible, &state.clock)),
        ..ApiResponse::ok(format!(
            "Overtime request submitted ({:.2} hours), waiting for approval",
            request.interval.hours()
        ))
    })
}

/* =========================
Approve / reject (Supervisor)
========================= */
pub async fn decide_ot(
    state: &AppState,
    payload: DecideOtPayload,
) -> Result<ApiResponse, ClockError> {
    let decision = OtStatus::from_str(payload.decision.trim()).map_err(|_| {
        ClockError::BadRequest("decision must be Approved or Rejected".to_string())
    })?;
    let acting_role = RoleKind::from_str(payload.acting_role.trim())
        .map_err(|_| ClockError::BadRequest(format!("unknown role {}", payload.acting_role)))?;

    let request = state
        .overtime
        .decide(&payload.request_id, decision, &payload.approver_name, acting_role)
        .await?;

    let visible = state
        .overtime
        .visible_to(&Viewer::Supervisor {
            site_id: payload.site_id,
        })
        .await?;

    Ok(ApiResponse {
        request: Some(OvertimeView::new(&request, &state.clock)),
        visible_ot_requests: Some(OvertimeView::list(&visible, &state.clock)),
        ..ApiResponse::ok(format!("Overtime request {}", request.status))
    })
}

fn parse_timestamp(
    state: &AppState,
    field: &str,
    raw: &str,
) -> Result<chrono::DateTime<chrono::Utc>, ClockError> {
    state
        .clock
        .parse_timestamp(raw)
        .ok_or_else(|| ClockError::BadRequest(format!("{field} is not a valid timestamp")))
}
