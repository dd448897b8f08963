use std::collections::HashMap;
use std::fmt;

use crate::calendar::WEEKS_TRACKED;

const CURRENT_WEEK: u8 = (WEEKS_TRACKED - 1) as u8;

/// Which 7-day slice of the tracked window is visible: 0 is the oldest
/// week, 3 the current one. Moves saturate at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekSelection(u8);

impl Default for WeekSelection {
    fn default() -> Self {
        Self(CURRENT_WEEK)
    }
}

impl WeekSelection {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn back(&mut self) {
        if self.0 > 0 {
            self.0 -= 1;
        }
    }

    pub fn forward(&mut self) {
        if self.0 < CURRENT_WEEK {
            self.0 += 1;
        }
    }

    pub fn at_oldest(self) -> bool {
        self.0 == 0
    }

    pub fn at_current(self) -> bool {
        self.0 == CURRENT_WEEK
    }
}

impl fmt::Display for WeekSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.at_current() {
            return write!(f, "Current Week");
        }
        let weeks_ago = CURRENT_WEEK - self.0;
        if weeks_ago == 1 {
            write!(f, "1 Week ago")
        } else {
            write!(f, "{weeks_ago} Weeks ago")
        }
    }
}

/// View-offset state: one global selection plus per-habit overrides. Moving
/// the global selection pushes it to every habit (their overrides are
/// dropped); a per-habit move touches only that habit and never feeds back
/// into the global value.
#[derive(Debug, Default)]
pub struct WeekNavigator {
    global: WeekSelection,
    overrides: HashMap<String, WeekSelection>,
}

impl WeekNavigator {
    pub fn global(&self) -> WeekSelection {
        self.global
    }

    pub fn global_back(&mut self) {
        let before = self.global;
        self.global.back();
        if self.global != before {
            self.overrides.clear();
        }
    }

    pub fn global_forward(&mut self) {
        let before = self.global;
        self.global.forward();
        if self.global != before {
            self.overrides.clear();
        }
    }

    /// The selection shown for one habit: its override if it has one,
    /// otherwise the global selection.
    pub fn selection(&self, habit_id: &str) -> WeekSelection {
        self.overrides
            .get(habit_id)
            .copied()
            .unwrap_or(self.global)
    }

    pub fn back(&mut self, habit_id: &str) {
        let global = self.global;
        self.overrides
            .entry(habit_id.to_string())
            .or_insert(global)
            .back();
    }

    pub fn forward(&mut self, habit_id: &str) {
        let global = self.global;
        self.overrides
            .entry(habit_id.to_string())
            .or_insert(global)
            .forward();
    }

    /// Drop the override for a habit that no longer exists.
    pub fn forget(&mut self, habit_id: &str) {
        self.overrides.remove(habit_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_defaults_to_the_current_week() {
        let selection = WeekSelection::default();
        assert_eq!(selection.index(), 3);
        assert!(selection.at_current());
    }

    #[test]
    fn moves_saturate_at_both_ends() {
        let mut selection = WeekSelection::default();
        selection.forward();
        assert_eq!(selection.index(), 3);

        for _ in 0..6 {
            selection.back();
        }
        assert_eq!(selection.index(), 0);
        assert!(selection.at_oldest());

        selection.forward();
        assert_eq!(selection.index(), 1);
    }

    #[test]
    fn labels_pluralize_correctly() {
        let mut selection = WeekSelection::default();
        assert_eq!(selection.to_string(), "Current Week");
        selection.back();
        assert_eq!(selection.to_string(), "1 Week ago");
        selection.back();
        assert_eq!(selection.to_string(), "2 Weeks ago");
        selection.back();
        assert_eq!(selection.to_string(), "3 Weeks ago");
    }

    #[test]
    fn habits_follow_the_global_selection_until_overridden() {
        let mut nav = WeekNavigator::default();
        assert_eq!(nav.selection("h1").index(), 3);

        nav.global_back();
        assert_eq!(nav.selection("h1").index(), 2);
        assert_eq!(nav.selection("h2").index(), 2);

        nav.back("h1");
        assert_eq!(nav.selection("h1").index(), 1);
        assert_eq!(nav.selection("h2").index(), 2);
    }

    #[test]
    fn a_global_move_resets_local_overrides() {
        let mut nav = WeekNavigator::default();
        nav.back("h1");
        nav.back("h1");
        assert_eq!(nav.selection("h1").index(), 1);

        nav.global_back();
        assert_eq!(nav.global().index(), 2);
        assert_eq!(nav.selection("h1").index(), 2);
    }

    #[test]
    fn a_saturated_global_move_keeps_local_overrides() {
        let mut nav = WeekNavigator::default();
        nav.back("h1");
        // Global is already at the current week, so forward is a no-op and
        // must not reset the override.
        nav.global_forward();
        assert_eq!(nav.selection("h1").index(), 2);
    }

    #[test]
    fn local_moves_never_feed_back_into_the_global_selection() {
        let mut nav = WeekNavigator::default();
        nav.back("h1");
        nav.back("h2");
        assert_eq!(nav.global().index(), 3);
    }

    #[test]
    fn per_habit_moves_saturate_too() {
        let mut nav = WeekNavigator::default();
        nav.forward("h1");
        assert_eq!(nav.selection("h1").index(), 3);
        for _ in 0..5 {
            nav.back("h1");
        }
        assert_eq!(nav.selection("h1").index(), 0);
    }
}
