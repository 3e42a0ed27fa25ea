//! User document schema
//!
//! Only the fields the leaderboard needs. Account management and
//! authentication live with the backend provider, not here.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::model::LeaderboardEntry;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// User identifier
    pub user_id: String,

    /// Display name shown on leaderboards
    #[serde(default)]
    pub display_name: String,

    /// Accumulated reward points
    #[serde(default)]
    pub points: i64,
}

impl From<UserDoc> for LeaderboardEntry {
    fn from(doc: UserDoc) -> Self {
        Self {
            user_id: doc.user_id,
            display_name: doc.display_name,
            points: doc.points,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on user identifier
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            // Leaderboard ordering
            (
                doc! { "points": -1 },
                Some(
                    IndexOptions::builder()
                        .name("points_desc_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
