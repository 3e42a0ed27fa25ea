//! Challenge document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::model::{Challenge, ChallengeCategory, ChallengeRewards, ChallengeType, Difficulty};

/// Collection name for challenges
pub const CHALLENGE_COLLECTION: &str = "challenges";

/// Challenge document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChallengeDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Domain identity (distinct from the Mongo `_id`)
    pub challenge_id: String,

    pub title: String,
    pub description: String,
    pub challenge_type: ChallengeType,
    pub category: ChallengeCategory,
    pub difficulty: Difficulty,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub target_value: f64,
    pub target_unit: String,
    pub points: u32,
    #[serde(default)]
    pub participants: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime,
    pub is_active: bool,
    #[serde(default)]
    pub rules: Vec<String>,
    pub rewards: ChallengeRewards,
}

impl From<Challenge> for ChallengeDoc {
    fn from(c: Challenge) -> Self {
        Self {
            _id: None,
            challenge_id: c.id,
            title: c.title,
            description: c.description,
            challenge_type: c.challenge_type,
            category: c.category,
            difficulty: c.difficulty,
            start_date: DateTime::from_chrono(c.start_date),
            end_date: DateTime::from_chrono(c.end_date),
            target_value: c.target_value,
            target_unit: c.target_unit,
            points: c.points,
            participants: c.participants,
            created_by: c.created_by,
            created_at: DateTime::from_chrono(c.created_at),
            is_active: c.is_active,
            rules: c.rules,
            rewards: c.rewards,
        }
    }
}

impl From<ChallengeDoc> for Challenge {
    fn from(doc: ChallengeDoc) -> Self {
        Self {
            id: doc.challenge_id,
            title: doc.title,
            description: doc.description,
            challenge_type: doc.challenge_type,
            category: doc.category,
            difficulty: doc.difficulty,
            start_date: doc.start_date.to_chrono(),
            end_date: doc.end_date.to_chrono(),
            target_value: doc.target_value,
            target_unit: doc.target_unit,
            points: doc.points,
            participants: doc.participants,
            created_by: doc.created_by,
            created_at: doc.created_at.to_chrono(),
            is_active: doc.is_active,
            rules: doc.rules,
            rewards: doc.rewards,
        }
    }
}

impl IntoIndexes for ChallengeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the domain identity
            (
                doc! { "challenge_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("challenge_id_unique".to_string())
                        .build(),
                ),
            ),
            // Active listing: is_active filter, created_at descending
            (
                doc! { "is_active": 1, "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("active_listing_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
