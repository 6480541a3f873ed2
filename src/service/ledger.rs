use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime};
use tracing::{debug, info, warn};

use crate::error::ClockError;
use crate::model::attendance::{
    AttendanceSession, AttendanceSummary, ClockOutMark, Coordinate, DailyHours, NewSession,
    SessionOrder, attributed_date, hours_from_seconds, round2,
};
use crate::model::employee::Employee;
use crate::service::bounded;
use crate::service::geofence::GeofenceValidator;
use crate::store::{EmployeeDirectory, SessionBackend};
use crate::utils::clock::OrgClock;

/// Result of a successful clock-in or clock-out.
#[derive(Debug)]
pub struct ClockOutcome {
    pub employee: Employee,
    pub session: AttendanceSession,
    /// Newest first
    pub recent: Vec<AttendanceSession>,
}

/// Attendance sessions per employee: clock-in, clock-out and history.
#[derive(Clone)]
pub struct AttendanceLedger {
    directory: Arc<dyn EmployeeDirectory>,
    sessions: Arc<dyn SessionBackend>,
    geofence: GeofenceValidator,
    clock: OrgClock,
    store_timeout: Duration,
    recent_limit: usize,
}

impl AttendanceLedger {
    pub fn new(
        directory: Arc<dyn EmployeeDirectory>,
        sessions: Arc<dyn SessionBackend>,
        geofence: GeofenceValidator,
        clock: OrgClock,
        store_timeout: Duration,
        recent_limit: usize,
    ) -> Self {
        Self {
            directory,
            sessions,
            geofence,
            clock,
            store_timeout,
            recent_limit,
        }
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    pub async fn resolve_employee(&self, employee_id: &str) -> Result<Employee, ClockError> {
        bounded(self.store_timeout, self.directory.find_employee(employee_id))
            .await?
            .ok_or(ClockError::EmployeeNotFound)
    }

    /// Opens a session stamped with the current time. Nothing is written when
    /// the geofence denies or a session is already open.
    pub async fn clock_in(
        &self,
        employee_id: &str,
        coordinate: Coordinate,
        accuracy: Option<f64>,
    ) -> Result<ClockOutcome, ClockError> {
        let employee = self.resolve_employee(employee_id).await?;
        self.geofence.require(&employee, coordinate, accuracy).await?;

        let new = NewSession {
            employee_id: employee.identifier.clone(),
            name: employee.name.clone(),
            site_id: employee.site_id().map(str::to_string),
            clock_in_at: self.clock.now(),
            coordinate,
        };
        let session = bounded(self.store_timeout, self.sessions.open_session(new)).await?;

        info!(
            employee_id = %employee.identifier,
            session_id = session.id,
            "Clocked in"
        );

        let recent = self.recent_after_write(&employee.identifier, &session).await;
        Ok(ClockOutcome {
            employee,
            session,
            recent,
        })
    }

    /// Closes the most recently opened session and records worked time.
    pub async fn clock_out(
        &self,
        employee_id: &str,
        coordinate: Coordinate,
        accuracy: Option<f64>,
    ) -> Result<ClockOutcome, ClockError> {
        let employee = self.resolve_employee(employee_id).await?;
        self.geofence.require(&employee, coordinate, accuracy).await?;

        let mark = ClockOutMark {
            at: self.clock.now(),
            coordinate,
        };
        let session = bounded(
            self.store_timeout,
            self.sessions.close_latest_open(&employee.identifier, mark),
        )
        .await?;

        if session.worked_seconds == Some(0) {
            debug!(session_id = session.id, "Clock-out not after clock-in, duration clamped to zero");
        }
        info!(
            employee_id = %employee.identifier,
            session_id = session.id,
            hours = session.worked_hours().unwrap_or_default(),
            "Clocked out"
        );

        let recent = self.recent_after_write(&employee.identifier, &session).await;
        Ok(ClockOutcome {
            employee,
            session,
            recent,
        })
    }

    /// History after a committed write; a failed read degrades to the touched session.
    async fn recent_after_write(
        &self,
        employee_id: &str,
        session: &AttendanceSession,
    ) -> Vec<AttendanceSession> {
        match self
            .recent_sessions(employee_id, self.recent_limit, SessionOrder::NewestFirst)
            .await
        {
            Ok(recent) => recent,
            Err(e) => {
                warn!(error = %e, employee_id, "Failed to load recent sessions");
                vec![session.clone()]
            }
        }
    }

    /// The newest `limit` sessions, arranged in `order`.
    pub async fn recent_sessions(
        &self,
        employee_id: &str,
        limit: usize,
        order: SessionOrder,
    ) -> Result<Vec<AttendanceSession>, ClockError> {
        let mut sessions = bounded(
            self.store_timeout,
            self.sessions.recent_sessions(employee_id, limit),
        )
        .await?;
        if order == SessionOrder::OldestFirst {
            sessions.reverse();
        }
        Ok(sessions)
    }

    /// Hours this month, days worked this month and the last seven days.
    pub async fn summary(&self, employee_id: &str) -> Result<AttendanceSummary, ClockError> {
        let today = self.clock.today();
        let since_date = month_start(today).min(today - chrono::Duration::days(6));
        let since = self.clock.anchor(since_date, NaiveTime::MIN);

        let sessions = bounded(
            self.store_timeout,
            self.sessions.sessions_since(employee_id, since),
        )
        .await?;
        Ok(summarize(&sessions, today, self.clock.offset()))
    }
}

fn month_start(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

/// Worked time is attributed to the local date of the clock-in. Open
/// sessions count for nothing yet.
pub fn summarize(
    sessions: &[AttendanceSession],
    today: NaiveDate,
    offset: &FixedOffset,
) -> AttendanceSummary {
    let window: Vec<NaiveDate> = (0..7)
        .rev()
        .map(|back| today - chrono::Duration::days(back))
        .collect();

    let mut month_seconds = 0i64;
    let mut worked_days = BTreeSet::new();
    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();

    for session in sessions {
        let Some(seconds) = session.worked_seconds else {
            continue;
        };
        let date = attributed_date(session, offset);

        if date.year() == today.year() && date.month() == today.month() {
            month_seconds += seconds;
            if seconds > 0 {
                worked_days.insert(date);
            }
        }
        if window.contains(&date) {
            *per_day.entry(date).or_default() += seconds;
        }
    }

    let days_worked = worked_days.len() as u32;
    let avg_hours_per_day = if days_worked > 0 {
        round2(month_seconds as f64 / 3600.0 / f64::from(days_worked))
    } else {
        0.0
    };

    AttendanceSummary {
        month_hours: hours_from_seconds(month_seconds),
        days_worked,
        avg_hours_per_day,
        last_7_days: window
            .into_iter()
            .map(|date| DailyHours {
                date: date.format("%Y-%m-%d").to_string(),
                day: date.format("%a").to_string(),
                hours: hours_from_seconds(per_day.get(&date).copied().unwrap_or(0)),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::geofence::DEFAULT_MAX_ACCURACY_METERS;
    use crate::service::testing::{bangkok, local, manual_clock, seeded_store};
    use crate::store::memory::MemoryStore;
    use crate::utils::clock::ManualClock;

    const AT_SITE: Coordinate = Coordinate {
        latitude: 13.7501,
        longitude: 100.5001,
    };

    const FAR_AWAY: Coordinate = Coordinate {
        latitude: 14.0,
        longitude: 100.9,
    };

    fn ledger_on(store: Arc<MemoryStore>, clock: OrgClock) -> AttendanceLedger {
        let timeout = Duration::from_secs(1);
        AttendanceLedger::new(
            store.clone(),
            store.clone(),
            GeofenceValidator::new(store, DEFAULT_MAX_ACCURACY_METERS, timeout),
            clock,
            timeout,
            20,
        )
    }

    fn ledger_at(y: i32, m: u32, d: u32, h: u32) -> (Arc<ManualClock>, AttendanceLedger) {
        let (manual, clock) = manual_clock(local(y, m, d, h, 0));
        (manual, ledger_on(Arc::new(seeded_store()), clock))
    }

    #[actix_web::test]
    async fn clock_in_then_duplicate_then_clock_out() {
        let (manual, ledger) = ledger_at(2026, 4, 1, 8);

        let first = ledger.clock_in("fixed", AT_SITE, Some(12.0)).await.unwrap();
        assert!(first.session.is_open());
        assert_eq!(first.recent.len(), 1);
        assert_eq!(first.session.site_id.as_deref(), Some("S"));

        let again = ledger.clock_in("fixed", AT_SITE, Some(12.0)).await.unwrap_err();
        assert!(matches!(again, ClockError::AlreadyOpenSession));
        let history = ledger
            .recent_sessions("fixed", 20, SessionOrder::NewestFirst)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);

        manual.advance(chrono::Duration::hours(9));
        let out = ledger.clock_out("fixed", AT_SITE, Some(12.0)).await.unwrap();
        assert!(!out.session.is_open());
        assert_eq!(out.session.worked_hours(), Some(9.0));
        assert_eq!(out.session.id, first.session.id);
    }

    #[actix_web::test]
    async fn overnight_shift_yields_four_hours() {
        let (manual, ledger) = ledger_at(2026, 4, 1, 22);
        ledger.clock_in("fixed", AT_SITE, None).await.unwrap();

        manual.set(local(2026, 4, 2, 2, 0));
        let out = ledger.clock_out("fixed", AT_SITE, None).await.unwrap();
        assert_eq!(out.session.worked_seconds, Some(4 * 3600));
        assert_eq!(out.session.worked_hours(), Some(4.0));
    }

    #[actix_web::test]
    async fn clock_out_without_open_session_changes_nothing() {
        let (_, ledger) = ledger_at(2026, 4, 1, 8);
        let err = ledger.clock_out("rover", AT_SITE, None).await.unwrap_err();
        assert!(matches!(err, ClockError::NoOpenSession));
        assert!(
            ledger
                .recent_sessions("rover", 20, SessionOrder::NewestFirst)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[actix_web::test]
    async fn denied_clock_in_writes_no_row() {
        let (_, ledger) = ledger_at(2026, 4, 1, 8);

        let err = ledger.clock_in("fixed", FAR_AWAY, None).await.unwrap_err();
        assert!(matches!(err, ClockError::OutOfRange { .. }));

        let err = ledger.clock_in("fixed", AT_SITE, Some(500.0)).await.unwrap_err();
        assert!(matches!(err, ClockError::WeakSignal { .. }));

        let err = ledger.clock_in("nobody", AT_SITE, None).await.unwrap_err();
        assert!(matches!(err, ClockError::EmployeeNotFound));

        assert!(
            ledger
                .recent_sessions("fixed", 20, SessionOrder::NewestFirst)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[actix_web::test]
    async fn clock_out_is_geofenced_too() {
        let (_, ledger) = ledger_at(2026, 4, 1, 8);
        ledger.clock_in("fixed", AT_SITE, None).await.unwrap();

        let err = ledger.clock_out("fixed", FAR_AWAY, None).await.unwrap_err();
        assert!(matches!(err, ClockError::OutOfRange { .. }));
        let recent = ledger
            .recent_sessions("fixed", 20, SessionOrder::NewestFirst)
            .await
            .unwrap();
        assert!(recent[0].is_open());
    }

    #[actix_web::test]
    async fn roaming_staff_clock_in_anywhere() {
        let (_, ledger) = ledger_at(2026, 4, 1, 8);
        let outcome = ledger.clock_in("rover", FAR_AWAY, Some(30.0)).await.unwrap();
        assert_eq!(outcome.session.site_id, None);
    }

    #[actix_web::test]
    async fn concurrent_clock_ins_open_one_session() {
        let (_, ledger) = ledger_at(2026, 4, 1, 8);

        let attempts = (0..16).map(|_| ledger.clock_in("fixed", AT_SITE, None));
        let results = futures::future::join_all(attempts).await;

        let opened = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(opened, 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, ClockError::AlreadyOpenSession))
        );

        let open = ledger
            .recent_sessions("fixed", 20, SessionOrder::NewestFirst)
            .await
            .unwrap()
            .into_iter()
            .filter(AttendanceSession::is_open)
            .count();
        assert_eq!(open, 1);
    }

    #[actix_web::test]
    async fn recent_sessions_honor_limit_and_order() {
        let (manual, ledger) = ledger_at(2026, 4, 1, 8);
        for _ in 0..4 {
            ledger.clock_in("rover", AT_SITE, None).await.unwrap();
            manual.advance(chrono::Duration::hours(8));
            ledger.clock_out("rover", AT_SITE, None).await.unwrap();
            manual.advance(chrono::Duration::hours(16));
        }

        let newest = ledger
            .recent_sessions("rover", 3, SessionOrder::NewestFirst)
            .await
            .unwrap();
        let oldest = ledger
            .recent_sessions("rover", 3, SessionOrder::OldestFirst)
            .await
            .unwrap();
        assert_eq!(newest.len(), 3);
        assert!(newest[0].clock_in_at > newest[2].clock_in_at);
        assert_eq!(oldest[0].id, newest[2].id);
        assert_eq!(oldest[2].id, newest[0].id);
    }

    #[actix_web::test]
    async fn summary_covers_month_and_week() {
        let (manual, ledger) = ledger_at(2026, 3, 31, 22);
        // overnight shift from March 31 counts toward March only
        ledger.clock_in("rover", AT_SITE, None).await.unwrap();
        manual.set(local(2026, 4, 1, 6, 0));
        ledger.clock_out("rover", AT_SITE, None).await.unwrap();

        for day in [6, 8] {
            manual.set(local(2026, 4, day, 9, 0));
            ledger.clock_in("rover", AT_SITE, None).await.unwrap();
            manual.set(local(2026, 4, day, 17, 30));
            ledger.clock_out("rover", AT_SITE, None).await.unwrap();
        }

        // Thursday
        manual.set(local(2026, 4, 9, 12, 0));
        let summary = ledger.summary("rover").await.unwrap();
        assert_eq!(summary.month_hours, 17.0);
        assert_eq!(summary.days_worked, 2);
        assert_eq!(summary.avg_hours_per_day, 8.5);
        assert_eq!(summary.last_7_days.len(), 7);
        assert_eq!(summary.last_7_days[0].date, "2026-04-03");
        assert_eq!(summary.last_7_days[6].date, "2026-04-09");
        assert_eq!(summary.last_7_days[6].day, "Thu");
        let week_total: f64 = summary.last_7_days.iter().map(|d| d.hours).sum();
        assert_eq!(week_total, 17.0);
    }

    #[test]
    fn summarize_ignores_open_sessions() {
        let open = AttendanceSession {
            id: 1,
            employee_id: "E".into(),
            name: "E".into(),
            site_id: None,
            clock_in_at: local(2026, 4, 9, 8, 0),
            clock_in_coord: AT_SITE,
            clock_out_at: None,
            clock_out_coord: None,
            worked_seconds: None,
        };
        let today = NaiveDate::from_ymd_opt(2026, 4, 9).unwrap();
        let summary = summarize(&[open], today, &bangkok());
        assert_eq!(summary.month_hours, 0.0);
        assert_eq!(summary.days_worked, 0);
        assert_eq!(summary.avg_hours_per_day, 0.0);
    }
}
