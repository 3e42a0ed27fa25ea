//! Offline fallback storage
//!
//! Two pieces of degraded-mode data live here: a durable local store of
//! participation records for writes made while the remote store is
//! unreachable, and a fixed built-in challenge set for read-oriented
//! fallback.
//!
//! The local store is one namespaced JSON file holding a serialized record
//! list. Read-modify-write is not atomic across process crashes, which is
//! acceptable for this scope.

use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::model::{
    Challenge, ChallengeCategory, ChallengeParticipation, ChallengeRewards, ChallengeType,
    Difficulty, SYSTEM_USER,
};
use crate::types::Result;

/// Serialized payload of the offline store file
#[derive(Serialize, Deserialize, Default)]
struct OfflineState {
    participations: Vec<ChallengeParticipation>,
}

/// Durable key-value fallback for participation records
pub struct OfflineStore {
    path: PathBuf,
}

impl OfflineStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> OfflineState {
        match std::fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        "Offline store at {} is corrupt, starting empty: {}",
                        self.path.display(),
                        e
                    );
                    OfflineState::default()
                }
            },
            Err(_) => OfflineState::default(),
        }
    }

    fn save(&self, state: &OfflineState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    /// Record an offline join, de-duplicated by (challenge, user) pair.
    /// A duplicate join request is a no-op.
    pub fn record_join(&self, challenge_id: &str, user_id: &str) -> Result<()> {
        let mut state = self.load();

        let exists = state
            .participations
            .iter()
            .any(|p| p.challenge_id == challenge_id && p.user_id == user_id);
        if exists {
            debug!(
                "Offline join for ({}, {}) already recorded",
                challenge_id, user_id
            );
            return Ok(());
        }

        state
            .participations
            .push(ChallengeParticipation::new(challenge_id, user_id));
        self.save(&state)
    }

    /// Remove any matching record (offline leave)
    pub fn remove(&self, challenge_id: &str, user_id: &str) -> Result<()> {
        let mut state = self.load();
        state
            .participations
            .retain(|p| !(p.challenge_id == challenge_id && p.user_id == user_id));
        self.save(&state)
    }

    /// Get the locally stored record for a pair, if any
    pub fn get(&self, challenge_id: &str, user_id: &str) -> Option<ChallengeParticipation> {
        self.load()
            .participations
            .into_iter()
            .find(|p| p.challenge_id == challenge_id && p.user_id == user_id)
    }

    /// Insert or replace a record (offline progress update)
    pub fn upsert(&self, participation: ChallengeParticipation) -> Result<()> {
        let mut state = self.load();
        state.participations.retain(|p| {
            !(p.challenge_id == participation.challenge_id && p.user_id == participation.user_id)
        });
        state.participations.push(participation);
        self.save(&state)
    }
}

/// Fixed built-in challenge set served whenever the remote store is
/// unreachable for read-oriented operations.
pub fn builtin_challenges() -> Vec<Challenge> {
    let now = Utc::now();

    vec![
        Challenge {
            id: "offline-carbon-week".to_string(),
            title: "Low-Carbon Week".to_string(),
            description: "Keep your food carbon footprint under 15 kg CO2 this week".to_string(),
            challenge_type: ChallengeType::Weekly,
            category: ChallengeCategory::Carbon,
            difficulty: Difficulty::Medium,
            start_date: now,
            end_date: now + ChronoDuration::days(7),
            target_value: 7.0,
            target_unit: "days under budget".to_string(),
            points: 70,
            participants: Vec::new(),
            created_by: SYSTEM_USER.to_string(),
            created_at: now,
            is_active: true,
            rules: vec![
                "Log every meal".to_string(),
                "Stay under 2.2 kg CO2 per day".to_string(),
            ],
            rewards: ChallengeRewards {
                points: 70,
                badge: Some("carbon-cutter".to_string()),
                title: None,
            },
        },
        Challenge {
            id: "offline-water-saver".to_string(),
            title: "Water Saver".to_string(),
            description: "Choose low-water-footprint meals for five days".to_string(),
            challenge_type: ChallengeType::Daily,
            category: ChallengeCategory::Water,
            difficulty: Difficulty::Easy,
            start_date: now,
            end_date: now + ChronoDuration::days(5),
            target_value: 5.0,
            target_unit: "meals".to_string(),
            points: 40,
            participants: Vec::new(),
            created_by: SYSTEM_USER.to_string(),
            created_at: now,
            is_active: true,
            rules: vec!["One low-water meal per day".to_string()],
            rewards: ChallengeRewards {
                points: 40,
                badge: None,
                title: Some("Drop Keeper".to_string()),
            },
        },
        Challenge {
            id: "offline-meatless-month".to_string(),
            title: "Meatless Month".to_string(),
            description: "Twenty vegetarian meals in thirty days".to_string(),
            challenge_type: ChallengeType::Monthly,
            category: ChallengeCategory::Meals,
            difficulty: Difficulty::Hard,
            start_date: now,
            end_date: now + ChronoDuration::days(30),
            target_value: 20.0,
            target_unit: "meals".to_string(),
            points: 150,
            participants: Vec::new(),
            created_by: SYSTEM_USER.to_string(),
            created_at: now,
            is_active: true,
            rules: vec![
                "Vegetarian meals only count once per sitting".to_string(),
                "Log within 24 hours".to_string(),
            ],
            rewards: ChallengeRewards {
                points: 150,
                badge: Some("herbivore".to_string()),
                title: Some("Plant Pioneer".to_string()),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store() -> OfflineStore {
        let path = std::env::temp_dir().join(format!("foodprint-offline-{}.json", Uuid::new_v4()));
        OfflineStore::new(path)
    }

    #[test]
    fn test_join_then_get_reflects_joined_state() {
        let store = temp_store();
        store.record_join("c1", "u1").unwrap();

        let p = store.get("c1", "u1").expect("record should exist");
        assert_eq!(p.challenge_id, "c1");
        assert_eq!(p.user_id, "u1");
        assert_eq!(p.progress, 0.0);
        assert!(p.daily_progress.is_empty());
    }

    #[test]
    fn test_duplicate_join_is_noop() {
        let store = temp_store();
        store.record_join("c1", "u1").unwrap();
        let first = store.get("c1", "u1").unwrap();

        store.record_join("c1", "u1").unwrap();
        let state = store.load();
        assert_eq!(state.participations.len(), 1);
        assert_eq!(state.participations[0].id, first.id);
    }

    #[test]
    fn test_remove_deletes_matching_record() {
        let store = temp_store();
        store.record_join("c1", "u1").unwrap();
        store.record_join("c2", "u1").unwrap();

        store.remove("c1", "u1").unwrap();
        assert!(store.get("c1", "u1").is_none());
        assert!(store.get("c2", "u1").is_some());
    }

    #[test]
    fn test_upsert_replaces_existing_record() {
        let store = temp_store();
        store.record_join("c1", "u1").unwrap();

        let mut p = store.get("c1", "u1").unwrap();
        p.daily_progress.insert("2024-01-01".to_string(), true);
        p.current_streak = 1;
        store.upsert(p).unwrap();

        let stored = store.get("c1", "u1").unwrap();
        assert_eq!(stored.current_streak, 1);
        assert_eq!(stored.daily_progress.get("2024-01-01"), Some(&true));

        let state = store.load();
        assert_eq!(state.participations.len(), 1);
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let store = temp_store();
        assert!(store.get("c1", "u1").is_none());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let store = temp_store();
        std::fs::write(&store.path, b"not json").unwrap();
        assert!(store.get("c1", "u1").is_none());
        // A write after corruption recovers the file.
        store.record_join("c1", "u1").unwrap();
        assert!(store.get("c1", "u1").is_some());
    }

    #[test]
    fn test_builtin_set_shape() {
        let set = builtin_challenges();
        assert_eq!(set.len(), 3);
        for challenge in &set {
            assert!(challenge.is_active);
            assert_eq!(challenge.created_by, SYSTEM_USER);
            assert!(challenge.end_date > challenge.start_date);
            assert!(challenge.target_value > 0.0);
        }
    }
}
