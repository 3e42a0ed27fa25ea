//! Participation records
//!
//! One record per (challenge, user) pair while the user is joined. Created
//! on join, updated on every progress report, removed entirely on leave.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A user's engagement with one challenge
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChallengeParticipation {
    /// Opaque stable identity
    pub id: String,
    pub challenge_id: String,
    pub user_id: String,
    /// Set once at join time
    pub joined_at: DateTime<Utc>,
    /// Derived percentage in [0, 100]
    pub progress: f64,
    /// Accumulated raw progress (units achieved)
    pub current_value: f64,
    pub is_completed: bool,
    /// Stamped exactly once, the first time `is_completed` becomes true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Sparse map from ISO date string (YYYY-MM-DD) to "completed that day"
    #[serde(default)]
    pub daily_progress: HashMap<String, bool>,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl ChallengeParticipation {
    /// Fresh record for a user joining a challenge
    pub fn new(challenge_id: &str, user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            challenge_id: challenge_id.to_string(),
            user_id: user_id.to_string(),
            joined_at: Utc::now(),
            progress: 0.0,
            current_value: 0.0,
            is_completed: false,
            completed_at: None,
            daily_progress: HashMap::new(),
            current_streak: 0,
            longest_streak: 0,
        }
    }

    /// Number of days marked completed in the daily map
    pub fn completed_days(&self) -> usize {
        self.daily_progress.values().filter(|done| **done).count()
    }
}

/// One row of the points leaderboard
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub display_name: String,
    pub points: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_participation_starts_empty() {
        let p = ChallengeParticipation::new("c1", "u1");
        assert_eq!(p.challenge_id, "c1");
        assert_eq!(p.user_id, "u1");
        assert_eq!(p.progress, 0.0);
        assert!(!p.is_completed);
        assert!(p.completed_at.is_none());
        assert!(p.daily_progress.is_empty());
        assert_eq!(p.current_streak, 0);
        assert_eq!(p.longest_streak, 0);
    }

    #[test]
    fn test_completed_days_counts_only_true() {
        let mut p = ChallengeParticipation::new("c1", "u1");
        p.daily_progress.insert("2024-01-01".to_string(), true);
        p.daily_progress.insert("2024-01-02".to_string(), false);
        p.daily_progress.insert("2024-01-03".to_string(), true);
        assert_eq!(p.completed_days(), 2);
    }
}
