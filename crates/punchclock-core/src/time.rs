//! Civil-time helpers.
//!
//! The backend stores naive UTC strings; everything shown to users is rendered
//! in one fixed timezone (`attendance.timezone`).

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::error::{PunchclockError, Result};

/// Wire format of `check_in` / `check_out` on the backend.
pub const BACKEND_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_TIMEZONE: &str = "America/Havana";

/// Parse an IANA timezone name such as `America/Havana`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| PunchclockError::InvalidTimezone(name.to_string()))
}

/// Parse a backend timestamp (`YYYY-MM-DD HH:MM:SS`, naive UTC).
pub fn parse_backend_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), BACKEND_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_backend_timestamp(at: DateTime<Utc>) -> String {
    at.format(BACKEND_TIMESTAMP_FORMAT).to_string()
}

/// The fixed local clock used for stamping and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    tz: Tz,
}

impl LocalClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current wall-clock time, truncated to whole seconds so that what is
    /// written to the backend and what is reported to the user agree.
    pub fn now(&self) -> DateTime<Tz> {
        let now = Utc::now();
        let whole = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        whole.with_timezone(&self.tz)
    }

    pub fn to_local(&self, at: DateTime<Utc>) -> DateTime<Tz> {
        at.with_timezone(&self.tz)
    }
}

impl Default for LocalClock {
    fn default() -> Self {
        Self::new(chrono_tz::America::Havana)
    }
}

/// `HH:MM:SS`
pub fn format_clock(at: &DateTime<Tz>) -> String {
    at.format("%H:%M:%S").to_string()
}

/// `DD/MM/YYYY`
pub fn format_date(at: &DateTime<Tz>) -> String {
    at.format("%d/%m/%Y").to_string()
}

/// Render an elapsed duration as `H:MM:SS`; negative spans clamp to zero.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn backend_timestamp_parses_as_utc() {
        let at = parse_backend_timestamp("2026-03-02 13:00:05").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2026, 3, 2, 13, 0, 5).unwrap());
        assert_eq!(format_backend_timestamp(at), "2026-03-02 13:00:05");
    }

    #[test]
    fn backend_timestamp_rejects_garbage() {
        assert!(parse_backend_timestamp("false").is_none());
        assert!(parse_backend_timestamp("2026-03-02T13:00:05Z").is_none());
    }

    #[test]
    fn havana_is_behind_utc() {
        let clock = LocalClock::default();
        // January: Cuba standard time is UTC-5.
        let utc = Utc.with_ymd_and_hms(2026, 1, 12, 13, 0, 0).unwrap();
        let local = clock.to_local(utc);
        assert_eq!(local.hour(), 8);
        assert_eq!(format_clock(&local), "08:00:00");
        assert_eq!(format_date(&local), "12/01/2026");
    }

    #[test]
    fn now_has_whole_seconds() {
        assert_eq!(LocalClock::default().now().nanosecond(), 0);
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::seconds(3 * 3600 + 5 * 60 + 9)), "3:05:09");
        assert_eq!(format_elapsed(Duration::seconds(-10)), "0:00:00");
    }

    #[test]
    fn timezone_lookup() {
        assert!(parse_timezone("Europe/Madrid").is_ok());
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(PunchclockError::InvalidTimezone(_))
        ));
    }
}
