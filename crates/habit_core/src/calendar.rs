use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const DAYS_IN_WEEK: usize = 7;
pub const WEEKS_TRACKED: usize = 4;
/// Length of every habit's day array.
pub const TRACKED_DAYS: usize = DAYS_IN_WEEK * WEEKS_TRACKED;
/// First index of the current week; today always falls in 21..=27.
pub const CURRENT_WEEK_START: usize = TRACKED_DAYS - DAYS_IN_WEEK;

/// Visual state of a single slot in a habit's 28-day window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DayState {
    Completed,
    NotYetApplicable,
    Missed,
}

/// Absolute index into the day array for a weekday slot of a given week.
/// `week` counts from the oldest tracked week (0) to the current one (3);
/// `slot` counts weekdays from Sunday (0).
pub fn day_index(week: usize, slot: usize) -> usize {
    debug_assert!(week < WEEKS_TRACKED);
    debug_assert!(slot < DAYS_IN_WEEK);
    slot + week * DAYS_IN_WEEK
}

/// Index representing `today` in the day array. The current week is anchored
/// at index 21, so Sunday maps to 21 and Saturday to 27.
pub fn current_day_index(today: NaiveDate) -> usize {
    today.weekday().num_days_from_sunday() as usize + CURRENT_WEEK_START
}

/// Whole days elapsed since the habit started, measured against today's
/// local midnight. Discarding the time of day keeps the count stable across
/// a calendar-day boundary.
pub fn days_since_start(start: DateTime<Utc>, now: DateTime<Local>) -> i64 {
    let midnight = now
        .date_naive()
        .and_time(NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    (midnight - start.with_timezone(&Local).naive_local()).num_days()
}

/// Classify one day of a habit. The pre-start rule is checked before the
/// future-day rule, so a day that somehow satisfies both resolves to
/// `NotYetApplicable` via the pre-start branch. Today itself is never
/// `Missed`, even when unchecked.
pub fn classify(
    days: &[bool; TRACKED_DAYS],
    index: usize,
    current_day: usize,
    days_since_start: i64,
) -> DayState {
    if days[index] {
        return DayState::Completed;
    }
    let first_tracked = current_day as i64 - days_since_start;
    if (index as i64) < first_tracked {
        return DayState::NotYetApplicable;
    }
    if current_day <= index {
        return DayState::NotYetApplicable;
    }
    DayState::Missed
}
