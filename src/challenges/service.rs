//! Participation repository and caller-facing API
//!
//! `ChallengeService` orchestrates every operation the UI consumes. It owns
//! the read cache and the offline store, and decides per call which storage
//! tier is authoritative: the reachability probe is consulted first, and a
//! remote failure after a positive probe still degrades to the local tier
//! for the operations that have one.
//!
//! Fallback policy:
//! - Read-oriented operations never surface errors; they degrade to cached
//!   or built-in offline data and log diagnostics.
//! - `join`, `leave` and `update_daily_progress` swallow remote errors and
//!   redirect to the local store; the caller observes success either way.
//! - `create_challenge` and `update_progress` have no local equivalent and
//!   surface classified errors instead.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::challenges::backend::RemoteBackend;
use crate::challenges::cache::{ChallengeCache, DEFAULT_CACHE_TTL};
use crate::challenges::offline::{builtin_challenges, OfflineStore};
use crate::challenges::probe::ReachabilityProbe;
use crate::challenges::progress::apply_progress;
use crate::challenges::streak::compute_streaks_today;
use crate::config::Args;
use crate::model::{Challenge, ChallengeDraft, ChallengeParticipation, LeaderboardEntry};
use crate::types::{ChallengeError, Result};

/// Tunable deadlines and limits for the service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Deadline for challenge creation
    pub create_timeout: Duration,
    /// Deadline for the active listing fetch
    pub list_timeout: Duration,
    /// Read cache window
    pub cache_ttl: Duration,
    /// Cap on the active listing
    pub active_limit: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            create_timeout: Duration::from_secs(30),
            list_timeout: Duration::from_secs(15),
            cache_ttl: DEFAULT_CACHE_TTL,
            active_limit: 50,
        }
    }
}

impl ServiceConfig {
    /// Build from CLI/environment configuration
    pub fn from_args(args: &Args) -> Self {
        Self {
            create_timeout: args.create_timeout(),
            list_timeout: args.list_timeout(),
            cache_ttl: args.cache_ttl(),
            active_limit: args.active_challenge_limit,
        }
    }
}

/// Challenge progress and streak tracking service
pub struct ChallengeService<B: RemoteBackend> {
    backend: Arc<B>,
    probe: Arc<dyn ReachabilityProbe>,
    offline: OfflineStore,
    cache: ChallengeCache,
    config: ServiceConfig,
}

impl<B: RemoteBackend> ChallengeService<B> {
    /// Create the service
    pub fn new(
        backend: Arc<B>,
        probe: Arc<dyn ReachabilityProbe>,
        offline: OfflineStore,
        config: ServiceConfig,
    ) -> Self {
        let cache = ChallengeCache::new(config.cache_ttl);
        Self {
            backend,
            probe,
            offline,
            cache,
            config,
        }
    }

    /// Shared handle to the backend, for the subscription manager
    pub fn backend(&self) -> Arc<B> {
        Arc::clone(&self.backend)
    }

    /// Shared handle to the reachability probe
    pub fn probe(&self) -> Arc<dyn ReachabilityProbe> {
        Arc::clone(&self.probe)
    }

    // ------------------------------------------------------------------
    // Challenge reads
    // ------------------------------------------------------------------

    /// Active challenges, served from the read cache when fresh.
    ///
    /// Never surfaces an error: on cache miss the remote fetch runs under
    /// the listing deadline, and any failure (unreachable, timeout, remote
    /// error) degrades to the built-in offline set. Every outcome replaces
    /// the cache wholesale, so repeated calls inside the window while
    /// offline do not re-attempt the fetch.
    pub async fn get_active_challenges(&self) -> Vec<Challenge> {
        if let Some(cached) = self.cache.get().await {
            return cached;
        }

        if self.probe.is_reachable().await {
            let fetch = self.backend.fetch_active_challenges(self.config.active_limit);
            match timeout(self.config.list_timeout, fetch).await {
                Ok(Ok(list)) => {
                    self.cache.put(list.clone()).await;
                    return list;
                }
                Ok(Err(e)) => {
                    warn!("Active listing fetch failed, serving offline set: {}", e);
                }
                Err(_) => {
                    warn!(
                        "Active listing fetch timed out after {:?}, serving offline set",
                        self.config.list_timeout
                    );
                }
            }
        } else {
            warn!("Remote store unreachable, serving offline challenge set");
        }

        let fallback = builtin_challenges();
        self.cache.put(fallback.clone()).await;
        fallback
    }

    /// Fetch one challenge by id, degrading to the built-in set on failure
    pub async fn get_challenge_by_id(&self, challenge_id: &str) -> Option<Challenge> {
        if self.probe.is_reachable().await {
            match self.backend.fetch_challenge(challenge_id).await {
                Ok(found) => return found,
                Err(e) => {
                    warn!("Challenge fetch failed, checking offline set: {}", e);
                }
            }
        }

        builtin_challenges()
            .into_iter()
            .find(|c| c.id == challenge_id)
    }

    /// Top users by accumulated points. Degrades to an empty list offline.
    pub async fn get_leaderboard(&self, limit: i64) -> Vec<LeaderboardEntry> {
        if self.probe.is_reachable().await {
            match self.backend.fetch_leaderboard(limit).await {
                Ok(entries) => return entries,
                Err(e) => warn!("Leaderboard fetch failed: {}", e),
            }
        } else {
            warn!("Remote store unreachable, leaderboard unavailable");
        }

        Vec::new()
    }

    // ------------------------------------------------------------------
    // Challenge writes
    // ------------------------------------------------------------------

    /// Create a new challenge.
    ///
    /// No offline fallback: failures surface as classified errors. The
    /// remote write runs under the creation deadline; the losing side of
    /// the race is dropped. A successful create invalidates the read cache.
    pub async fn create_challenge(&self, draft: ChallengeDraft) -> Result<Challenge> {
        draft.validate()?;

        if !self.probe.is_reachable().await {
            return Err(ChallengeError::Unreachable(
                "challenge creation requires the remote store".to_string(),
            ));
        }

        let challenge = draft.into_challenge();
        let write = self.backend.insert_challenge(challenge.clone());
        match timeout(self.config.create_timeout, write).await {
            Ok(Ok(())) => {
                info!("Challenge '{}' created ({})", challenge.title, challenge.id);
                self.cache.invalidate().await;
                Ok(challenge)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ChallengeError::Timeout(format!(
                "challenge creation exceeded {:?}",
                self.config.create_timeout
            ))),
        }
    }

    /// Install the built-in challenge set under the system creator when
    /// missing. Returns the number of challenges inserted.
    pub async fn seed_builtin_challenges(&self) -> Result<usize> {
        let mut inserted = 0usize;

        for challenge in builtin_challenges() {
            if self.backend.fetch_challenge(&challenge.id).await?.is_none() {
                info!("Seeding challenge '{}'", challenge.title);
                self.backend.insert_challenge(challenge).await?;
                inserted += 1;
            }
        }

        if inserted > 0 {
            self.cache.invalidate().await;
        }

        Ok(inserted)
    }

    // ------------------------------------------------------------------
    // Participation
    // ------------------------------------------------------------------

    /// Join a challenge. A duplicate join is a no-op; offline or failed
    /// remote joins are recorded in the local store instead and the caller
    /// observes success either way.
    pub async fn join_challenge(&self, challenge_id: &str, user_id: &str) -> Result<()> {
        if self.probe.is_reachable().await {
            match self.join_remote(challenge_id, user_id).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("Remote join failed, recording locally: {}", e);
                }
            }
        }

        self.offline.record_join(challenge_id, user_id)
    }

    async fn join_remote(&self, challenge_id: &str, user_id: &str) -> Result<()> {
        if self
            .backend
            .fetch_participation(challenge_id, user_id)
            .await?
            .is_some()
        {
            debug!("({}, {}) already joined, ignoring", challenge_id, user_id);
            return Ok(());
        }

        self.backend.add_participant(challenge_id, user_id).await?;
        self.backend
            .insert_participation(ChallengeParticipation::new(challenge_id, user_id))
            .await?;
        self.cache.invalidate().await;
        Ok(())
    }

    /// Leave a challenge: inverse of join. The participation record is
    /// removed entirely; the offline path removes any matching local record.
    pub async fn leave_challenge(&self, challenge_id: &str, user_id: &str) -> Result<()> {
        if self.probe.is_reachable().await {
            match self.leave_remote(challenge_id, user_id).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("Remote leave failed, removing locally: {}", e);
                }
            }
        }

        self.offline.remove(challenge_id, user_id)
    }

    async fn leave_remote(&self, challenge_id: &str, user_id: &str) -> Result<()> {
        self.backend
            .remove_participant(challenge_id, user_id)
            .await?;
        self.backend
            .delete_participation(challenge_id, user_id)
            .await?;
        self.cache.invalidate().await;
        Ok(())
    }

    /// Report a new raw progress value.
    ///
    /// Remote-only: there is no local fallback for manual progress reports,
    /// so failures surface. Silently returns when no participation record
    /// exists for the pair.
    pub async fn update_progress(
        &self,
        challenge_id: &str,
        user_id: &str,
        new_value: f64,
    ) -> Result<()> {
        if !self.probe.is_reachable().await {
            return Err(ChallengeError::Unreachable(
                "progress update requires the remote store".to_string(),
            ));
        }

        let Some(mut participation) = self
            .backend
            .fetch_participation(challenge_id, user_id)
            .await?
        else {
            debug!(
                "No participation for ({}, {}), ignoring progress update",
                challenge_id, user_id
            );
            return Ok(());
        };

        let challenge = self
            .backend
            .fetch_challenge(challenge_id)
            .await?
            .ok_or_else(|| {
                ChallengeError::NotFound(format!("challenge {} not found", challenge_id))
            })?;

        apply_progress(&mut participation, new_value, challenge.target_value);
        self.backend.update_participation(&participation).await
    }

    /// Toggle one calendar day's completion and recompute every derived
    /// field: streaks, current value (count of completed days) and
    /// percentage progress. Works identically against the remote or local
    /// tier, selected by the probe and by whether the remote attempt fails.
    pub async fn update_daily_progress(
        &self,
        challenge_id: &str,
        user_id: &str,
        date: &str,
        completed: bool,
    ) -> Result<()> {
        if self.probe.is_reachable().await {
            match self
                .update_daily_remote(challenge_id, user_id, date, completed)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("Remote daily update failed, applying locally: {}", e);
                }
            }
        }

        self.update_daily_local(challenge_id, user_id, date, completed)
    }

    async fn update_daily_remote(
        &self,
        challenge_id: &str,
        user_id: &str,
        date: &str,
        completed: bool,
    ) -> Result<()> {
        let Some(mut participation) = self
            .backend
            .fetch_participation(challenge_id, user_id)
            .await?
        else {
            debug!(
                "No participation for ({}, {}), ignoring daily update",
                challenge_id, user_id
            );
            return Ok(());
        };

        let target = self
            .backend
            .fetch_challenge(challenge_id)
            .await?
            .map(|c| c.target_value);

        apply_daily(&mut participation, date, completed, target);
        self.backend.update_participation(&participation).await
    }

    fn update_daily_local(
        &self,
        challenge_id: &str,
        user_id: &str,
        date: &str,
        completed: bool,
    ) -> Result<()> {
        // The pair may have joined while online, so a missing local record
        // is created rather than dropping the update.
        let mut participation = self
            .offline
            .get(challenge_id, user_id)
            .unwrap_or_else(|| ChallengeParticipation::new(challenge_id, user_id));

        let target = builtin_challenges()
            .into_iter()
            .find(|c| c.id == challenge_id)
            .map(|c| c.target_value);

        apply_daily(&mut participation, date, completed, target);
        self.offline.upsert(participation)
    }

    /// Read the participation record for a pair: remote when reachable,
    /// local store otherwise or when the remote read fails.
    pub async fn get_user_challenge_participation(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<Option<ChallengeParticipation>> {
        if self.probe.is_reachable().await {
            match self
                .backend
                .fetch_participation(challenge_id, user_id)
                .await
            {
                Ok(found) => return Ok(found),
                Err(e) => {
                    warn!("Remote participation read failed, using local store: {}", e);
                }
            }
        }

        Ok(self.offline.get(challenge_id, user_id))
    }
}

/// Set a day key and recompute the derived fields. When the challenge
/// target cannot be resolved (unknown challenge offline), the percentage
/// fields are left untouched and only the raw value and streaks move.
fn apply_daily(
    participation: &mut ChallengeParticipation,
    date: &str,
    completed: bool,
    target_value: Option<f64>,
) {
    participation
        .daily_progress
        .insert(date.to_string(), completed);

    let streaks = compute_streaks_today(&participation.daily_progress);
    participation.current_streak = streaks.current;
    participation.longest_streak = streaks.longest;

    let value = participation.completed_days() as f64;
    match target_value {
        Some(target) => apply_progress(participation, value, target),
        None => participation.current_value = value,
    }
}
