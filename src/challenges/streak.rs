//! Streak calculation over sparse daily completion maps
//!
//! The map goes from ISO date string (YYYY-MM-DD) to "completed that day".
//! Two derived figures come out of it:
//!
//! - **Longest streak**: longest run of completed days anywhere in history.
//!   Keys are sorted lexicographically (ISO order == chronological order)
//!   and scanned once; adjacency in the sorted sequence counts as
//!   consecutive regardless of actual calendar gaps between keys.
//! - **Current streak**: anchored at "today" and walked backward one real
//!   calendar day at a time. A day missing from the map breaks the walk.
//!   If today itself is not completed, the walk retries from yesterday.
//!
//! Malformed keys never produce an error: the longest scan treats them as
//! opaque strings and the current-streak walk simply never matches them.

use chrono::{Days, NaiveDate, Utc};
use std::collections::HashMap;

/// Date key format used throughout the daily progress maps
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Derived streak figures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
}

/// Compute current and longest streaks with an explicit "today" anchor
pub fn compute_streaks(daily: &HashMap<String, bool>, today: NaiveDate) -> StreakSummary {
    StreakSummary {
        current: current_streak(daily, today),
        longest: longest_streak(daily),
    }
}

/// Compute streaks anchored at the moment of calculation
pub fn compute_streaks_today(daily: &HashMap<String, bool>) -> StreakSummary {
    compute_streaks(daily, Utc::now().date_naive())
}

fn longest_streak(daily: &HashMap<String, bool>) -> u32 {
    let mut keys: Vec<&String> = daily.keys().collect();
    keys.sort();

    let mut longest = 0u32;
    let mut run = 0u32;
    for key in keys {
        if daily[key] {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }

    longest
}

fn current_streak(daily: &HashMap<String, bool>, today: NaiveDate) -> u32 {
    let mut day = if completed_on(daily, today) {
        today
    } else {
        // Today not completed yet; the streak may still be alive through
        // yesterday.
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) => yesterday,
            None => return 0,
        }
    };

    let mut streak = 0u32;
    while completed_on(daily, day) {
        streak += 1;
        match day.checked_sub_days(Days::new(1)) {
            Some(previous) => day = previous,
            None => break,
        }
    }

    streak
}

fn completed_on(daily: &HashMap<String, bool>, day: NaiveDate) -> bool {
    daily
        .get(&day.format(DAY_FORMAT).to_string())
        .copied()
        .unwrap_or(false)
}
