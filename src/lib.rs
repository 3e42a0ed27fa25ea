//! Challenge progress and streak tracking for the FoodPrint platform.
//!
//! The crate keeps eco-challenge participation usable across connectivity
//! loss: reads degrade to a cached or built-in offline data set, membership
//! writes land in a durable local store when the remote document store is
//! down, and daily completion toggles recompute streaks and percentage
//! progress on whichever tier accepted them.

pub mod challenges;
pub mod config;
pub mod db;
pub mod model;
pub mod types;

pub use config::Args;
pub use types::{ChallengeError, Result};
