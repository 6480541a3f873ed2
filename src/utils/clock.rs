use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Source of "now". Swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The organization's wall clock: absolute time plus the fixed UTC offset
/// used to split timestamps into local date and time.
#[derive(Clone)]
pub struct OrgClock {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl OrgClock {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self { clock, offset }
    }

    pub fn system(offset: FixedOffset) -> Self {
        Self::new(Arc::new(SystemClock), offset)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn offset(&self) -> &FixedOffset {
        &self.offset
    }

    pub fn local(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.local(self.now()).date_naive()
    }

    /// Absolute timestamp of a local date and time.
    pub fn anchor(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        self.anchor_naive(date.and_time(time))
    }

    fn anchor_naive(&self, local: NaiveDateTime) -> DateTime<Utc> {
        // a fixed offset maps every local time to exactly one instant
        (local - self.offset).and_utc()
    }

    /// Accepts RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` read as local time.
    pub fn parse_timestamp(&self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|local| self.anchor_naive(local))
    }

    pub fn format_date(&self, at: DateTime<Utc>) -> String {
        self.local(at).format("%Y-%m-%d").to_string()
    }

    pub fn format_time(&self, at: DateTime<Utc>) -> String {
        self.local(at).format("%H:%M:%S").to_string()
    }

    pub fn format_rfc3339(&self, at: DateTime<Utc>) -> String {
        self.local(at).to_rfc3339()
    }
}

#[cfg(test)]
pub use manual::ManualClock;


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bangkok() -> OrgClock {
        OrgClock::system(FixedOffset::east_opt(7 * 3600).unwrap())
    }

    #[test]
    fn anchor_applies_offset() {
        let clock = bangkok();
        let at = clock.anchor(
            NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
        );
        assert_eq!(at, Utc.with_ymd_and_hms(2026, 1, 9, 23, 30, 0).unwrap());
        assert_eq!(clock.format_date(at), "2026-01-10");
        assert_eq!(clock.format_time(at), "06:30:00");
    }

    #[test]
    fn parses_naive_and_zoned_timestamps() {
        let clock = bangkok();
        let naive = clock.parse_timestamp("2026-01-10T18:00").unwrap();
        let zoned = clock.parse_timestamp("2026-01-10T11:00:00Z").unwrap();
        assert_eq!(naive, zoned);
        assert!(clock.parse_timestamp("tomorrow evening").is_none());
    }

    #[test]
    fn manual_clock_moves_on_demand() {
        let start = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        let manual = Arc::new(ManualClock::at(start));
        let clock = OrgClock::new(manual.clone(), FixedOffset::east_opt(0).unwrap());
        manual.advance(chrono::Duration::hours(3));
        assert_eq!(clock.now(), start + chrono::Duration::hours(3));
        manual.set(start);
        assert_eq!(clock.now(), start);
    }
}
