use tracing::{debug, info};

use crate::auth::password::verify_password;
use crate::error::ClockError;
use crate::model::attendance::SessionOrder;
use crate::model::overtime::Viewer;
use crate::models::{ApiResponse, LoginPayload, OvertimeView, SessionView, UserView};
use crate::state::AppState;

/// Verifies the credential and returns the employee's dashboard data.
pub async fn login(state: &AppState, payload: LoginPayload) -> Result<ApiResponse, ClockError> {
    // 1️⃣ Basic validation
    if payload.identifier.trim().is_empty() || payload.credential.is_empty() {
        return Err(ClockError::BadRequest(
            "identifier and credential are required".to_string(),
        ));
    }

    // 2️⃣ Fetch employee; unknown and wrong credential look the same
    let employee = match state.ledger.resolve_employee(payload.identifier.trim()).await {
        Ok(employee) => employee,
        Err(ClockError::EmployeeNotFound) => {
            info!("Invalid credentials: employee not found");
            return Err(ClockError::InvalidCredentials);
        }
        Err(e) => return Err(e),
    };

    // 3️⃣ Verify credential
    debug!("Verifying credential");
    if !verify_password(&payload.credential, &employee.credential_hash) {
        info!(identifier = %employee.identifier, "Invalid credentials: mismatch");
        return Err(ClockError::InvalidCredentials);
    }

    // 4️⃣ Dashboard data
    let recent = state
        .ledger
        .recent_sessions(
            &employee.identifier,
            state.ledger.recent_limit(),
            SessionOrder::NewestFirst,
        )
        .await?;
    let visible = state
        .overtime
        .visible_to(&Viewer::for_employee(&employee))
        .await?;
    let summary = state.ledger.summary(&employee.identifier).await?;

    info!(identifier = %employee.identifier, "Login successful");

    Ok(ApiResponse {
        user: Some(UserView::from(&employee)),
        recent_sessions: Some(SessionView::list(&recent, &state.clock)),
        visible_ot_requests: Some(OvertimeView::list(&visible, &state.clock)),
        attendance_summary: Some(summary),
        ..ApiResponse::ok(format!("Welcome, {}", employee.name))
    })
}
