//! Calendar arithmetic for placing reminders into their daily slots.
//!
//! Everything in here is pure and operates on timestamps in millis, so
//! it can be tested without a running clock. Calendar days are evaluated
//! in the timezone of the `ReminderSettings`.

use crate::{ReminderSettings, TimeOfDay};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

fn to_local(ts: i64, tz: &Tz) -> DateTime<Tz> {
    Utc.timestamp_millis_opt(ts)
        .single()
        .unwrap_or_default()
        .with_timezone(tz)
}

pub fn local_date(ts: i64, tz: &Tz) -> NaiveDate {
    to_local(ts, tz).date_naive()
}

/// Timestamp of the given wall clock time on the given date.
/// A time that falls into a DST gap is moved forward by one hour.
pub fn timestamp_at(date: NaiveDate, time: NaiveTime, tz: &Tz) -> i64 {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive).timestamp_millis())
}

pub fn is_same_day(ts1: i64, ts2: i64, tz: &Tz) -> bool {
    local_date(ts1, tz) == local_date(ts2, tz)
}

/// The earliest daily slot on the same calendar day that is strictly later than `after`
pub fn next_same_day_slot(after: i64, settings: &ReminderSettings) -> Option<i64> {
    let date = local_date(after, &settings.timezone);
    settings
        .daily_slots()
        .into_iter()
        .map(|slot| timestamp_at(date, slot.naive(), &settings.timezone))
        .find(|ts| *ts > after)
}

/// The first slot on the calendar day after the one `after` falls on.
///
/// The day resumes at the start of office hours when they are enabled,
/// otherwise at 00:01.
pub fn first_slot_next_day(after: i64, settings: &ReminderSettings) -> i64 {
    let tz = &settings.timezone;
    let today = local_date(after, tz);
    let tomorrow = today.succ_opt().unwrap_or(today);

    let resume_at = if settings.office_hours.enabled {
        settings.office_hours.start
    } else {
        TimeOfDay::new(0, 1).unwrap_or(settings.office_hours.start)
    };
    let slot = settings
        .daily_slots()
        .into_iter()
        .find(|slot| *slot >= resume_at)
        .unwrap_or(resume_at);

    timestamp_at(tomorrow, slot.naive(), tz)
}

/// Next reminder slot after `last`: a later slot the same day if there is one,
/// otherwise the first slot of the next day
pub fn next_slot(last: i64, settings: &ReminderSettings) -> i64 {
    next_same_day_slot(last, settings).unwrap_or_else(|| first_slot_next_day(last, settings))
}
