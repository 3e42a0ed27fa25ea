//! Domain types for the FoodPrint challenge service
//!
//! Plain timestamps here are `chrono::DateTime<Utc>`; conversion to the
//! provider-native `bson::DateTime` happens in the document schemas
//! (`crate::db::schemas`) at every read/write boundary.

pub mod challenge;
pub mod participation;

pub use challenge::{
    Challenge, ChallengeCategory, ChallengeDraft, ChallengeRewards, ChallengeType, Difficulty,
    SYSTEM_USER,
};
pub use participation::{ChallengeParticipation, LeaderboardEntry};
