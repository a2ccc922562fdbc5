//! Reminder trigger time computation

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

use crate::models::ReminderTime;

/// When a reminder for a task due on `due_date` should fire, using the
/// current local time.
///
/// A missing or malformed `reminder_time` falls back to 09:00. Returns `None`
/// unless the instant is strictly in the future.
pub fn compute_trigger_time(
    due_date: NaiveDate,
    reminder_time: Option<&str>,
) -> Option<DateTime<Utc>> {
    trigger_time_at(due_date, reminder_time, ReminderTime::DEFAULT, &Local::now())
}

/// Same as [`compute_trigger_time`] with an explicit default time and clock.
///
/// The due date is combined with the time of day in `now`'s time zone, so a
/// date is never shifted by a UTC reinterpretation.
pub fn trigger_time_at<Tz: TimeZone>(
    due_date: NaiveDate,
    reminder_time: Option<&str>,
    default_time: ReminderTime,
    now: &DateTime<Tz>,
) -> Option<DateTime<Utc>> {
    let time = reminder_time
        .and_then(ReminderTime::parse)
        .unwrap_or(default_time);
    let naive = due_date.and_time(time.to_naive_time());
    let zone = now.timezone();

    // A wall-clock time inside a DST gap does not exist; use the hour after.
    let local = zone
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())?;

    let trigger = local.with_timezone(&Utc);
    (trigger > now.with_timezone(&Utc)).then_some(trigger)
}
