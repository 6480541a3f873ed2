use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    #[schema(example = 13.7501)]
    pub latitude: f64,
    #[schema(example = 100.5001)]
    pub longitude: f64,
}

/// One work session of one employee. Clock-out fields stay empty while the session is open.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSession {
    pub id: u64,
    pub employee_id: String,
    pub name: String,
    pub site_id: Option<String>,
    pub clock_in_at: DateTime<Utc>,
    pub clock_in_coord: Coordinate,
    pub clock_out_at: Option<DateTime<Utc>>,
    pub clock_out_coord: Option<Coordinate>,
    pub worked_seconds: Option<i64>,
}

impl AttendanceSession {
    pub fn is_open(&self) -> bool {
        self.clock_out_at.is_none()
    }

    pub fn worked_hours(&self) -> Option<f64> {
        self.worked_seconds.map(hours_from_seconds)
    }

    /// Closes the session in place. Callers guarantee it is open.
    pub fn close(&mut self, mark: &ClockOutMark) {
        let worked = worked_duration(self.clock_in_at, mark.at);
        self.clock_out_at = Some(mark.at);
        self.clock_out_coord = Some(mark.coordinate);
        self.worked_seconds = Some(worked.num_seconds());
    }
}

/// Row written by a successful clock-in.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub employee_id: String,
    pub name: String,
    pub site_id: Option<String>,
    pub clock_in_at: DateTime<Utc>,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, Copy)]
pub struct ClockOutMark {
    pub at: DateTime<Utc>,
    pub coordinate: Coordinate,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SessionOrder {
    NewestFirst,
    OldestFirst,
}

/// Time between two absolute timestamps, never negative.
///
/// Both ends carry their full date, so a shift crossing midnight yields the
/// real elapsed time. A clock-out at or before the clock-in is a data anomaly
/// and counts as zero.
pub fn worked_duration(clock_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> Duration {
    let elapsed = clock_out - clock_in;
    if elapsed > Duration::zero() {
        elapsed
    } else {
        Duration::zero()
    }
}

/// Decimal hours rounded to two places.
pub fn hours_from_seconds(seconds: i64) -> f64 {
    round2(seconds as f64 / 3600.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyHours {
    #[schema(example = "2026-01-01")]
    pub date: String,
    #[schema(example = "Mon")]
    pub day: String,
    #[schema(example = 8.5)]
    pub hours: f64,
}

/// Worked-time rollup for the current month and the last seven days.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    #[schema(example = 152.25)]
    pub month_hours: f64,
    #[schema(example = 19)]
    pub days_worked: u32,
    /// Month hours over days worked, 0 with no days
    #[schema(example = 8.01)]
    pub avg_hours_per_day: f64,
    pub last_7_days: Vec<DailyHours>,
}

/// Local calendar date a session is attributed to.
pub fn attributed_date(session: &AttendanceSession, offset: &FixedOffset) -> NaiveDate {
    session.clock_in_at.with_timezone(offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn overnight_shift_is_positive() {
        let bangkok = FixedOffset::east_opt(7 * 3600).unwrap();
        let clock_in = bangkok.with_ymd_and_hms(2026, 3, 1, 22, 0, 0).unwrap();
        let clock_out = bangkok.with_ymd_and_hms(2026, 3, 2, 2, 0, 0).unwrap();
        let worked = worked_duration(clock_in.with_timezone(&Utc), clock_out.with_timezone(&Utc));
        assert_eq!(worked, Duration::hours(4));
    }

    #[test]
    fn reversed_timestamps_clamp_to_zero() {
        let clock_in = Utc.with_ymd_and_hms(2026, 3, 2, 2, 0, 0).unwrap();
        let clock_out = Utc.with_ymd_and_hms(2026, 3, 1, 22, 0, 0).unwrap();
        assert_eq!(worked_duration(clock_in, clock_out), Duration::zero());
        assert_eq!(worked_duration(clock_in, clock_in), Duration::zero());
    }

    #[test]
    fn hours_round_to_two_places() {
        assert_eq!(hours_from_seconds(4 * 3600), 4.0);
        assert_eq!(hours_from_seconds(5000), 1.39);
    }

    #[test]
    fn close_fills_every_clock_out_field() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 1, 0, 0).unwrap();
        let coord = Coordinate {
            latitude: 13.75,
            longitude: 100.5,
        };
        let mut session = AttendanceSession {
            id: 1,
            employee_id: "E1".into(),
            name: "Somchai".into(),
            site_id: Some("S".into()),
            clock_in_at: at,
            clock_in_coord: coord,
            clock_out_at: None,
            clock_out_coord: None,
            worked_seconds: None,
        };
        assert!(session.is_open());
        session.close(&ClockOutMark {
            at: at + Duration::minutes(90),
            coordinate: coord,
        });
        assert!(!session.is_open());
        assert_eq!(session.worked_hours(), Some(1.5));
        assert_eq!(session.clock_out_coord, Some(coord));
    }
}
