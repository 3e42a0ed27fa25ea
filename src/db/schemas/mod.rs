//! Document schemas for MongoDB collections
//!
//! Each schema mirrors a domain type from [`crate::model`] with timestamps
//! held as the provider-native `bson::DateTime`. Conversion happens at every
//! read/write boundary via the `From` impls here.

pub mod challenge;
pub mod participation;
pub mod user;

pub use challenge::{ChallengeDoc, CHALLENGE_COLLECTION};
pub use participation::{ParticipationDoc, PARTICIPATION_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
