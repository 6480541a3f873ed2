use tracing::warn;

use crate::error::ClockError;
use crate::model::attendance::Coordinate;
use crate::model::overtime::Viewer;
use crate::models::{ApiResponse, ClockPayload, OvertimeView, SessionView};
use crate::service::ledger::ClockOutcome;
use crate::state::AppState;

/* =========================
Clock in
========================= */
pub async fn clock_in(state: &AppState, payload: ClockPayload) -> Result<ApiResponse, ClockError> {
    let coordinate = coordinate_of(&payload)?;
    let outcome = state
        .ledger
        .clock_in(&payload.employee_identifier, coordinate, payload.accuracy)
        .await?;

    let message = format!(
        "Clocked in at {}",
        state.clock.format_time(outcome.session.clock_in_at)
    );
    Ok(snapshot(state, outcome, message).await)
}

/* =========================
Clock out
========================= */
pub async fn clock_out(state: &AppState, payload: ClockPayload) -> Result<ApiResponse, ClockError> {
    let coordinate = coordinate_of(&payload)?;
    let outcome = state
        .ledger
        .clock_out(&payload.employee_identifier, coordinate, payload.accuracy)
        .await?;

    let out_time = outcome
        .session
        .clock_out_at
        .map(|t| state.clock.format_time(t))
        .unwrap_or_default();
    let message = format!(
        "Clocked out at {}, worked {:.2} hours",
        out_time,
        outcome.session.worked_hours().unwrap_or_default()
    );
    Ok(snapshot(state, outcome, message).await)
}

fn coordinate_of(payload: &ClockPayload) -> Result<Coordinate, ClockError> {
    if payload.employee_identifier.trim().is_empty() {
        return Err(ClockError::BadRequest(
            "employeeIdentifier is required".to_string(),
        ));
    }
    if !(-90.0..=90.0).contains(&payload.latitude) || !(-180.0..=180.0).contains(&payload.longitude)
    {
        return Err(ClockError::BadRequest(
            "latitude/longitude out of range".to_string(),
        ));
    }
    if payload.accuracy.is_some_and(|a| a < 0.0) {
        return Err(ClockError::BadRequest(
            "accuracy cannot be negative".to_string(),
        ));
    }
    Ok(Coordinate {
        latitude: payload.latitude,
        longitude: payload.longitude,
    })
}

/// The write is committed by now; the extra lists are best effort.
async fn snapshot(state: &AppState, outcome: ClockOutcome, message: String) -> ApiResponse {
    let employee_id = outcome.employee.identifier.as_str();

    let visible = match state
        .overtime
        .visible_to(&Viewer::for_employee(&outcome.employee))
        .await
    {
        Ok(requests) => Some(OvertimeView::list(&requests, &state.clock)),
        Err(e) => {
            warn!(error = %e, employee_id, "Failed to load overtime requests");
            None
        }
    };
    let summary = match state.ledger.summary(employee_id).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!(error = %e, employee_id, "Failed to build attendance summary");
            None
        }
    };

    ApiResponse {
        session: Some(SessionView::new(&outcome.session, &state.clock)),
        recent_sessions: Some(SessionView::list(&outcome.recent, &state.clock)),
        visible_ot_requests: visible,
        attendance_summary: summary,
        ..ApiResponse::ok(message)
    }
}
