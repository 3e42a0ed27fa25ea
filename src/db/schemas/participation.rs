//! Participation document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::mongo::IntoIndexes;
use crate::model::ChallengeParticipation;

/// Collection name for challenge participations
pub const PARTICIPATION_COLLECTION: &str = "challenge_participations";

/// Participation document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ParticipationDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Domain identity (distinct from the Mongo `_id`)
    pub participation_id: String,

    pub challenge_id: String,
    pub user_id: String,
    pub joined_at: DateTime,
    pub progress: f64,
    pub current_value: f64,
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
    #[serde(default)]
    pub daily_progress: HashMap<String, bool>,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl From<ChallengeParticipation> for ParticipationDoc {
    fn from(p: ChallengeParticipation) -> Self {
        Self {
            _id: None,
            participation_id: p.id,
            challenge_id: p.challenge_id,
            user_id: p.user_id,
            joined_at: DateTime::from_chrono(p.joined_at),
            progress: p.progress,
            current_value: p.current_value,
            is_completed: p.is_completed,
            completed_at: p.completed_at.map(DateTime::from_chrono),
            daily_progress: p.daily_progress,
            current_streak: p.current_streak,
            longest_streak: p.longest_streak,
        }
    }
}

impl From<ParticipationDoc> for ChallengeParticipation {
    fn from(doc: ParticipationDoc) -> Self {
        Self {
            id: doc.participation_id,
            challenge_id: doc.challenge_id,
            user_id: doc.user_id,
            joined_at: doc.joined_at.to_chrono(),
            progress: doc.progress,
            current_value: doc.current_value,
            is_completed: doc.is_completed,
            completed_at: doc.completed_at.map(|d| d.to_chrono()),
            daily_progress: doc.daily_progress,
            current_streak: doc.current_streak,
            longest_streak: doc.longest_streak,
        }
    }
}

impl IntoIndexes for ParticipationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Exactly one record per (challenge, user) pair
            (
                doc! { "challenge_id": 1, "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("challenge_user_unique".to_string())
                        .build(),
                ),
            ),
            // Per-user lookups across challenges
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participation_round_trips_through_doc() {
        let mut p = ChallengeParticipation::new("c1", "u1");
        p.daily_progress.insert("2024-01-01".to_string(), true);
        p.current_streak = 1;
        p.longest_streak = 3;
        p.progress = 40.0;

        let doc = ParticipationDoc::from(p.clone());
        let back = ChallengeParticipation::from(doc);

        assert_eq!(back.id, p.id);
        assert_eq!(back.challenge_id, "c1");
        assert_eq!(back.user_id, "u1");
        assert_eq!(back.progress, 40.0);
        assert_eq!(back.current_streak, 1);
        assert_eq!(back.longest_streak, 3);
        assert_eq!(back.daily_progress.get("2024-01-01"), Some(&true));
        assert!(back.completed_at.is_none());
    }
}
