use chrono::{DateTime, Datelike, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use punchclock_core::config::TriggerRule;
use tracing::warn;

/// Compute the next instant strictly *after* `from` at which `rule` fires,
/// reading its `hour:minute` as wall-clock time in `tz`.
///
/// Returns `None` when the rule has no days or an invalid time. A local
/// time that does not exist on some day (DST gap) skips that day.
pub fn compute_next_run(rule: &TriggerRule, tz: Tz, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let at = NaiveTime::from_hms_opt(u32::from(rule.hour), u32::from(rule.minute), 0)?;
    let today = from.with_timezone(&tz).date_naive();

    // Eight days covers "same weekday next week, time already passed today".
    for offset in 0..=7u64 {
        let day = today.checked_add_days(Days::new(offset))?;
        if !rule.days.contains(&day.weekday()) {
            continue;
        }
        let Some(local) = tz.from_local_datetime(&day.and_time(at)).earliest() else {
            warn!(date = %day, hour = rule.hour, minute = rule.minute, %tz, "local time does not exist; skipping day");
            continue;
        };
        let candidate = local.with_timezone(&Utc);
        if candidate > from {
            return Some(candidate);
        }
    }
    None
}
