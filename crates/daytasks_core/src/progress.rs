//! Daily completion streak. The record mutates at most once per calendar
//! day, the first time a completed task created that day is observed.

use crate::model::{STREAK_DATE_CAP, StreakRecord, Task};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

fn format_date(date: Date) -> Result<String, time::error::Format> {
    date.format(format_description!("[year]-[month]-[day]"))
}

fn created_on(task: &Task, date: Date, offset: UtcOffset) -> bool {
    match OffsetDateTime::parse(&task.created_at, &Rfc3339) {
        Ok(created) => created.to_offset(offset).date() == date,
        Err(_) => false,
    }
}

/// Returns the record advanced for `today`. The count increments when the
/// previous streak day was yesterday, otherwise restarts at 1; a second call
/// on the same day returns the record unchanged.
pub fn update_streak(
    record: &StreakRecord,
    tasks: &[Task],
    today: Date,
    offset: UtcOffset,
) -> StreakRecord {
    let mut next = record.clone();

    let completed_today = tasks
        .iter()
        .any(|task| task.completed && created_on(task, today, offset));
    if !completed_today {
        return next;
    }

    let today_str = match format_date(today) {
        Ok(formatted) => formatted,
        Err(_) => return next,
    };
    if next.last_date.as_deref() == Some(today_str.as_str()) {
        return next;
    }

    let yesterday = format_date(today - Duration::days(1)).unwrap_or_default();
    next.count = if next.last_date.as_deref() == Some(yesterday.as_str()) {
        next.count + 1
    } else {
        1
    };
    next.last_date = Some(today_str.clone());
    next.dates.push(today_str);
    if next.dates.len() > STREAK_DATE_CAP {
        let overflow = next.dates.len() - STREAK_DATE_CAP;
        next.dates.drain(..overflow);
    }

    next
}
