use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{self, DayState, TRACKED_DAYS};

/// A tracked habit: a name plus one completion flag per day of a rolling
/// 28-day window. Index 0 of `days` is the day the habit started, index 27
/// is 27 days later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub days: [bool; TRACKED_DAYS],
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
}

/// Persisted shape that predates `startDate`. Only ever read back as a
/// migration source; the `editing` flag it carried is UI state and is not
/// resurrected.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LegacyHabit {
    pub id: String,
    pub name: String,
    pub days: [bool; TRACKED_DAYS],
    pub editing: bool,
}

/// One stored record, in whichever shape the collection was written.
/// Current records carry `startDate`; legacy ones carry `editing` instead.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum HabitRecord {
    Current(Habit),
    Legacy(LegacyHabit),
}

impl Habit {
    /// A fresh habit: unique id, no completed days, tracking starts now.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            days: [false; TRACKED_DAYS],
            start_date: Utc::now(),
        }
    }

    /// Flip the completion flag for one day.
    pub fn toggle_day(&mut self, index: usize) {
        self.days[index] = !self.days[index];
    }

    /// Visual state of the given day as of `now`.
    pub fn day_state(&self, index: usize, now: DateTime<Local>) -> DayState {
        calendar::classify(
            &self.days,
            index,
            calendar::current_day_index(now.date_naive()),
            calendar::days_since_start(self.start_date, now),
        )
    }
}

/// Rewrite legacy records into the current shape. The true start of a legacy
/// habit is unknown, so each one is assumed to have a full 28-day history;
/// id, name and days carry over verbatim.
pub fn migrate(legacy: Vec<LegacyHabit>, now: DateTime<Utc>) -> Vec<Habit> {
    let start_date = now - Duration::days(TRACKED_DAYS as i64);
    legacy
        .into_iter()
        .map(|habit| Habit {
            id: habit.id,
            name: habit.name,
            days: habit.days,
            start_date,
        })
        .collect()
}
