use crate::model::attendance::{AttendanceSummary, Coordinate, DailyHours};
use crate::model::employee::RoleKind;
use crate::model::overtime::OtStatus;
use crate::models::{
    ActionEnvelope, ApiResponse, ClockPayload, DecideOtPayload, LoginPayload, OvertimeView,
    RequestOtPayload, SessionView, UserView,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GeoClock API",
        version = "1.0.0",
        description = r#"
## GPS-verified attendance and overtime

Every operation goes through a single **exec** endpoint that takes an
`action` plus its payload and always answers `200` with
`{ success, message, ...data }`.

### 🔹 Actions
- **LOGIN** `{ identifier, credential }`
- **CLOCK_IN** / **CLOCK_OUT** `{ employeeIdentifier, latitude, longitude, accuracy? }`
  - Fixed-site staff must be inside their site radius (default 200 m)
  - Sessions may cross midnight
- **REQUEST_OT** `{ employeeId, name, siteId, start, end, reason }`
- **DECIDE_OT** `{ requestId, decision, approverName, actingRole, siteId }`
  - Supervisors only, each request is decided once

### 📦 Response Format
Denials are `success: false` with a human readable `message`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::router::exec,
        crate::routes::health,
    ),
    components(
        schemas(
            ActionEnvelope,
            LoginPayload,
            ClockPayload,
            RequestOtPayload,
            DecideOtPayload,
            ApiResponse,
            UserView,
            SessionView,
            OvertimeView,
            AttendanceSummary,
            DailyHours,
            Coordinate,
            RoleKind,
            OtStatus
        )
    ),
    tags(
        (name = "Exec", description = "Attendance and overtime actions"),
        (name = "Health", description = "Liveness probe"),
    )
)]
pub struct ApiDoc;
