//! Challenge definitions
//!
//! A challenge is a time-boxed eco-goal with a numeric target and reward.
//! Challenges are created once (by a user or the system seed routine) and
//! mutated only to add/remove participants or toggle `is_active`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ChallengeError, Result};

/// Sentinel creator id for challenges installed by the seed routine
pub const SYSTEM_USER: &str = "system";

/// Cadence of a challenge
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

/// Sustainability category a challenge counts toward
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeCategory {
    Carbon,
    Water,
    Meals,
    Streak,
    General,
}

/// Difficulty rating shown to users
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Rewards granted on challenge completion
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChallengeRewards {
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// An eco-task definition
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Challenge {
    /// Opaque stable identity
    pub id: String,
    pub title: String,
    pub description: String,
    pub challenge_type: ChallengeType,
    pub category: ChallengeCategory,
    pub difficulty: Difficulty,
    pub start_date: DateTime<Utc>,
    /// Always after `start_date` (enforced at draft validation)
    pub end_date: DateTime<Utc>,
    /// Positive target the participant works toward
    pub target_value: f64,
    /// Free-text unit label for `target_value` (e.g. "kg CO2", "meals")
    pub target_unit: String,
    /// Points awarded on completion
    pub points: u32,
    /// User ids currently joined; insertion order is not meaningful
    #[serde(default)]
    pub participants: Vec<String>,
    /// Creating user id, or [`SYSTEM_USER`]
    pub created_by: String,
    /// Assigned at creation, immutable thereafter
    pub created_at: DateTime<Utc>,
    /// Only active challenges are discoverable by the default listing
    pub is_active: bool,
    /// Display-only rule lines, in order
    #[serde(default)]
    pub rules: Vec<String>,
    pub rewards: ChallengeRewards,
}

/// Caller-supplied fields for creating a challenge
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChallengeDraft {
    pub title: String,
    pub description: String,
    pub challenge_type: ChallengeType,
    pub category: ChallengeCategory,
    pub difficulty: Difficulty,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub target_value: f64,
    pub target_unit: String,
    pub points: u32,
    pub created_by: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub rules: Vec<String>,
    pub rewards: ChallengeRewards,
}

fn default_true() -> bool {
    true
}

impl ChallengeDraft {
    /// Validate draft invariants before any remote call is attempted
    pub fn validate(&self) -> Result<()> {
        if self.end_date <= self.start_date {
            return Err(ChallengeError::Config(
                "challenge end date must be after start date".to_string(),
            ));
        }

        if self.target_value <= 0.0 {
            return Err(ChallengeError::Config(
                "challenge target value must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Promote the draft to a full challenge: assign identity, stamp the
    /// creation time, start with no participants.
    pub fn into_challenge(self) -> Challenge {
        Challenge {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            description: self.description,
            challenge_type: self.challenge_type,
            category: self.category,
            difficulty: self.difficulty,
            start_date: self.start_date,
            end_date: self.end_date,
            target_value: self.target_value,
            target_unit: self.target_unit,
            points: self.points,
            participants: Vec::new(),
            created_by: self.created_by,
            created_at: Utc::now(),
            is_active: self.is_active,
            rules: self.rules,
            rewards: self.rewards,
        }
    }
}
