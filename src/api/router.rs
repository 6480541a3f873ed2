use std::str::FromStr;

use actix_web::{HttpResponse, Responder, web};
use serde::de::DeserializeOwned;
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{error, info, instrument};

use crate::api::{attendance, login, overtime};
use crate::error::ClockError;
use crate::models::{ActionEnvelope, ApiResponse};
use crate::state::AppState;

/// Actions accepted on the exec endpoint.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum Action {
    #[strum(serialize = "LOGIN", serialize = "LOGIN_USER")]
    Login,
    #[strum(serialize = "CLOCK_IN")]
    ClockIn,
    #[strum(serialize = "CLOCK_OUT")]
    ClockOut,
    #[strum(serialize = "REQUEST_OT")]
    RequestOt,
    #[strum(serialize = "DECIDE_OT", serialize = "UPDATE_OT_STATUS")]
    DecideOt,
}

#[utoipa::path(
    post,
    path = "/api/exec",
    request_body(
        content = ActionEnvelope,
        description = "`{ action, ...payload }` or `{ action, payload: {...} }`",
        example = json!({
            "action": "CLOCK_IN",
            "employeeIdentifier": "somchai",
            "latitude": 13.7501,
            "longitude": 100.5001,
            "accuracy": 12.0
        })
    ),
    responses(
        (status = 200, description = "Outcome envelope, success or denial", body = ApiResponse),
        (status = 429, description = "Too many requests")
    ),
    tag = "Exec"
)]
#[instrument(skip(state, body))]
pub async fn exec(state: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    let response = match dispatch(&state, &body).await {
        Ok(response) => response,
        Err(e) if e.is_transient() => {
            error!(error = %e, "Backend failure");
            ApiResponse::failure(&e)
        }
        Err(e) => {
            info!(reason = %e, "Request denied");
            ApiResponse::failure(&e)
        }
    };
    HttpResponse::Ok().json(response)
}

/// Reads the action and routes the payload. Shape validation only.
pub async fn dispatch(state: &AppState, body: &[u8]) -> Result<ApiResponse, ClockError> {
    let mut envelope: Value = serde_json::from_slice(body)
        .map_err(|e| ClockError::BadRequest(format!("malformed JSON: {e}")))?;

    let raw_action = envelope
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| ClockError::BadRequest("action is required".to_string()))?
        .trim()
        .to_string();
    let action = Action::from_str(&raw_action)
        .map_err(|_| ClockError::InvalidAction(raw_action.clone()))?;

    // nested `payload` wins over top-level fields
    let nested = envelope
        .get_mut("payload")
        .filter(|p| p.is_object())
        .map(Value::take);
    let payload = nested.unwrap_or(envelope);

    info!(action = %action, "Dispatching");

    match action {
        Action::Login => login::login(state, parse(payload)?).await,
        Action::ClockIn => attendance::clock_in(state, parse(payload)?).await,
        Action::ClockOut => attendance::clock_out(state, parse(payload)?).await,
        Action::RequestOt => overtime::request_ot(state, parse(payload)?).await,
        Action::DecideOt => overtime::decide_ot(state, parse(payload)?).await,
    }
}

fn parse<T: DeserializeOwned>(payload: Value) -> Result<T, ClockError> {
    serde_json::from_value(payload)
        .map_err(|e| ClockError::BadRequest(format!("invalid payload: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test};
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    use super::*;
    use crate::config::Config;
    use crate::service::testing::{SITE_LAT, SITE_LNG, local, manual_clock, seeded_store};
    use crate::store::Backends;
    use crate::utils::clock::ManualClock;
    use crate::utils::geo::degrees_north;

    fn test_config() -> Config {
        Config {
            server_addr: "127.0.0.1:0".into(),
            api_prefix: "/api".into(),
            store_backend: crate::config::StoreBackend::Memory,
            database_url: None,
            seed_file: None,
            org_utc_offset: crate::service::testing::bangkok(),
            max_accuracy_meters: 200.0,
            recent_session_limit: 10,
            store_timeout: std::time::Duration::from_secs(2),
            employee_cache_ttl: std::time::Duration::from_secs(60),
            rate_exec_per_min: 600,
            log_dir: "logs".into(),
        }
    }

    fn state_at(at: chrono::DateTime<chrono::Utc>) -> (Arc<ManualClock>, AppState) {
        let (manual, clock) = manual_clock(at);
        let backends = Backends::single(Arc::new(seeded_store()));
        (manual, AppState::new(&test_config(), backends, clock))
    }

    async fn run(state: &AppState, body: Value) -> Value {
        let response = match dispatch(state, body.to_string().as_bytes()).await {
            Ok(r) => r,
            Err(e) => ApiResponse::failure(&e),
        };
        serde_json::to_value(response).unwrap()
    }

    fn clock(action: &str, who: &str, lat: f64, lng: f64) -> Value {
        json!({
            "action": action,
            "employeeIdentifier": who,
            "latitude": lat,
            "longitude": lng,
            "accuracy": 10.0
        })
    }

    #[actix_web::test]
    async fn shift_in_and_out_through_the_router() {
        let (manual, state) = state_at(local(2026, 1, 10, 22, 0));

        let v = run(&state, clock("CLOCK_IN", "fixed", SITE_LAT, SITE_LNG)).await;
        assert_eq!(v["success"], true, "{v}");
        assert_eq!(v["message"], "Clocked in at 22:00:00");
        assert_eq!(v["session"]["dateIn"], "2026-01-10");
        assert_eq!(v["recentSessions"].as_array().unwrap().len(), 1);

        manual.advance(ChronoDuration::hours(4));
        let v = run(&state, clock("CLOCK_OUT", "fixed", SITE_LAT, SITE_LNG)).await;
        assert_eq!(v["success"], true, "{v}");
        assert_eq!(v["message"], "Clocked out at 02:00:00, worked 4.00 hours");
        assert_eq!(v["session"]["dateOut"], "2026-01-11");
        assert_eq!(v["session"]["workingHours"], 4.0);
    }

    #[actix_web::test]
    async fn second_clock_in_is_denied() {
        let (_, state) = state_at(local(2026, 1, 10, 8, 0));
        run(&state, clock("CLOCK_IN", "fixed", SITE_LAT, SITE_LNG)).await;

        let v = run(&state, clock("CLOCK_IN", "fixed", SITE_LAT, SITE_LNG)).await;
        assert_eq!(v["success"], false);
        assert_eq!(v["message"], ClockError::AlreadyOpenSession.to_string());
    }

    #[actix_web::test]
    async fn out_of_range_message_names_distance() {
        let (_, state) = state_at(local(2026, 1, 10, 8, 0));
        let v = run(
            &state,
            clock("CLOCK_IN", "fixed", SITE_LAT + degrees_north(450.0), SITE_LNG),
        )
        .await;
        assert_eq!(v["success"], false);
        let message = v["message"].as_str().unwrap();
        assert!(message.contains("outside the work area"), "{message}");
        assert!(message.contains("allowed 200 m"), "{message}");
    }

    #[actix_web::test]
    async fn nested_payload_is_accepted() {
        let (_, state) = state_at(local(2026, 1, 10, 8, 0));
        let v = run(
            &state,
            json!({
                "action": "clock_in",
                "payload": {
                    "employeeIdentifier": "rover",
                    "latitude": 1.0,
                    "longitude": 2.0
                }
            }),
        )
        .await;
        assert_eq!(v["success"], true, "{v}");
    }

    #[actix_web::test]
    async fn unknown_action_is_invalid() {
        let (_, state) = state_at(local(2026, 1, 10, 8, 0));
        let err = dispatch(&state, br#"{"action":"DELETE_EVERYTHING"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ClockError::InvalidAction(a) if a == "DELETE_EVERYTHING"));
    }

    #[actix_web::test]
    async fn malformed_bodies_are_bad_requests() {
        let (_, state) = state_at(local(2026, 1, 10, 8, 0));
        for body in [
            &b"not json"[..],
            br#"{"payload":{}}"#,
            br#"{"action":"CLOCK_IN","employeeIdentifier":"fixed"}"#,
            br#"{"action":"CLOCK_IN","employeeIdentifier":"fixed","latitude":91,"longitude":0}"#,
            br#"{"action":"CLOCK_IN","employeeIdentifier":"fixed","latitude":13.75,"longitude":100.5,"accuracy":-500}"#,
        ] {
            let err = dispatch(&state, body).await.unwrap_err();
            assert!(matches!(err, ClockError::BadRequest(_)), "{err:?}");
        }
    }

    #[actix_web::test]
    async fn login_returns_dashboard() {
        let (_, state) = state_at(local(2026, 1, 10, 8, 0));
        run(&state, clock("CLOCK_IN", "boss", 0.0, 0.0)).await;

        let v = run(
            &state,
            json!({"action": "LOGIN_USER", "username": "boss", "password": "1234"}),
        )
        .await;
        assert_eq!(v["success"], true, "{v}");
        assert_eq!(v["user"]["role"], "Supervisor");
        assert_eq!(v["user"]["siteId"], "S");
        assert_eq!(v["recentSessions"].as_array().unwrap().len(), 1);
        assert!(v["attendanceSummary"].is_object());
    }

    #[actix_web::test]
    async fn login_hides_which_part_was_wrong() {
        let (_, state) = state_at(local(2026, 1, 10, 8, 0));
        let unknown = run(
            &state,
            json!({"action": "LOGIN", "identifier": "ghost", "credential": "1234"}),
        )
        .await;
        let wrong = run(
            &state,
            json!({"action": "LOGIN", "identifier": "fixed", "credential": "9999"}),
        )
        .await;
        assert_eq!(unknown["message"], "Invalid credentials");
        assert_eq!(wrong["message"], unknown["message"]);
    }

    #[actix_web::test]
    async fn overtime_request_then_decisions() {
        let (_, state) = state_at(local(2026, 1, 10, 9, 0));

        let v = run(
            &state,
            json!({
                "action": "REQUEST_OT",
                "employeeId": "fixed",
                "name": "Staff fixed",
                "siteId": "S",
                "start": "2026-01-10T18:00",
                "end": "2026-01-10T20:30",
                "reason": "inventory"
            }),
        )
        .await;
        assert_eq!(v["success"], true, "{v}");
        assert_eq!(v["request"]["status"], "Pending");
        assert_eq!(v["request"]["hours"], 2.5);
        assert_eq!(v["visibleOTRequests"].as_array().unwrap().len(), 1);
        let id = v["request"]["id"].as_str().unwrap().to_string();

        let forbidden = run(
            &state,
            json!({
                "action": "DECIDE_OT",
                "requestId": id,
                "decision": "Approved",
                "approverName": "Staff fixed",
                "actingRole": "FixedSite",
                "siteId": "S"
            }),
        )
        .await;
        assert_eq!(forbidden["success"], false);
        assert_eq!(forbidden["message"], ClockError::Forbidden.to_string());

        let approved = run(
            &state,
            json!({
                "action": "UPDATE_OT_STATUS",
                "requestId": id,
                "status": "approved",
                "approverName": "Boss",
                "role": "Supervisor",
                "siteId": "S"
            }),
        )
        .await;
        assert_eq!(approved["success"], true, "{approved}");
        assert_eq!(approved["request"]["status"], "Approved");
        assert_eq!(approved["request"]["approverName"], "Boss");

        let again = run(
            &state,
            json!({
                "action": "DECIDE_OT",
                "requestId": id,
                "decision": "Rejected",
                "approverName": "Boss",
                "actingRole": "Supervisor",
                "siteId": "S"
            }),
        )
        .await;
        assert_eq!(again["success"], false);
        assert_eq!(again["message"], "Overtime request was already Approved");
    }

    #[actix_web::test]
    async fn inverted_overtime_interval_is_rejected() {
        let (_, state) = state_at(local(2026, 1, 10, 9, 0));
        let err = dispatch(
            &state,
            json!({
                "action": "REQUEST_OT",
                "employeeId": "fixed",
                "name": "Staff fixed",
                "siteId": "S",
                "start": "2026-01-10T20:00",
                "end": "2026-01-10T18:00",
                "reason": "inventory"
            })
            .to_string()
            .as_bytes(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClockError::BadRequest(_)));
    }

    #[actix_web::test]
    async fn exec_endpoint_always_answers_200() {
        let (_, state) = state_at(local(2026, 1, 10, 8, 0));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/api/exec", web::post().to(exec)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/exec")
            .set_payload(r#"{"action":"NOPE"}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid action: NOPE");
    }
}
