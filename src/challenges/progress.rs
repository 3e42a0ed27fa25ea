//! Progress aggregation
//!
//! Turns a raw progress value into the normalized percentage and completion
//! flag on a participation record. Completion is recomputed from the new
//! value every time; there is no monotonic guard, so a later smaller value
//! flips `is_completed` back to false. The completion timestamp is stamped
//! only on the first false-to-true transition and kept thereafter.

use crate::model::ChallengeParticipation;
use chrono::Utc;

/// Maximum progress percentage
const PROGRESS_CAP: f64 = 100.0;

/// Apply a new raw value against the challenge target and update the
/// derived progress fields in place.
pub fn apply_progress(p: &mut ChallengeParticipation, new_value: f64, target_value: f64) {
    p.current_value = new_value;

    p.progress = if target_value > 0.0 {
        ((new_value / target_value) * 100.0).min(PROGRESS_CAP)
    } else {
        // Target invariants are enforced at draft validation; a zero target
        // here is best-effort rather than an error.
        0.0
    };

    let was_completed = p.is_completed;
    p.is_completed = p.progress >= PROGRESS_CAP;

    if p.is_completed && !was_completed && p.completed_at.is_none() {
        p.completed_at = Some(Utc::now());
    }
}
