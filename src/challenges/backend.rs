//! Remote store seam
//!
//! [`RemoteBackend`] is the capability the repository and subscription
//! manager program against; [`MongoBackend`] implements it over the typed
//! collections. Change notifications surface as bounded channels fed by
//! spawned forwarder tasks reading MongoDB change streams.

use async_trait::async_trait;
use bson::doc;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::db::schemas::{
    ChallengeDoc, ParticipationDoc, UserDoc, CHALLENGE_COLLECTION, PARTICIPATION_COLLECTION,
    USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::model::{Challenge, ChallengeParticipation, LeaderboardEntry};
use crate::types::{ChallengeError, Result};

/// Capacity of each change-notification channel
const WATCH_CHANNEL_CAPACITY: usize = 16;

/// One push notification from the remote store
#[derive(Debug, Clone)]
pub enum RemoteEvent<T> {
    /// The watched data changed; carries the refetched snapshot
    Changed(T),
    /// The change stream failed; no further events will arrive
    TransportError,
}

/// Operations the challenge service needs from the remote document store
#[async_trait]
pub trait RemoteBackend: Send + Sync + 'static {
    async fn insert_challenge(&self, challenge: Challenge) -> Result<()>;
    async fn fetch_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>>;
    /// Active challenges ordered by creation time descending, capped at `limit`
    async fn fetch_active_challenges(&self, limit: i64) -> Result<Vec<Challenge>>;

    async fn add_participant(&self, challenge_id: &str, user_id: &str) -> Result<()>;
    async fn remove_participant(&self, challenge_id: &str, user_id: &str) -> Result<()>;

    async fn insert_participation(&self, participation: ChallengeParticipation) -> Result<()>;
    async fn fetch_participation(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<Option<ChallengeParticipation>>;
    async fn update_participation(&self, participation: &ChallengeParticipation) -> Result<()>;
    async fn delete_participation(&self, challenge_id: &str, user_id: &str) -> Result<()>;

    async fn fetch_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>>;

    /// Watch a single challenge by id
    async fn watch_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<mpsc::Receiver<RemoteEvent<Option<Challenge>>>>;

    /// Watch one (challenge, user) participation record
    async fn watch_participation(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<mpsc::Receiver<RemoteEvent<Option<ChallengeParticipation>>>>;

    /// Watch the active-challenge list
    async fn watch_active_challenges(
        &self,
        limit: i64,
    ) -> Result<mpsc::Receiver<RemoteEvent<Vec<Challenge>>>>;
}

/// MongoDB-backed implementation
#[derive(Clone)]
pub struct MongoBackend {
    challenges: MongoCollection<ChallengeDoc>,
    participations: MongoCollection<ParticipationDoc>,
    users: MongoCollection<UserDoc>,
}

impl MongoBackend {
    /// Create the backend, binding the three collections and applying their
    /// schema-declared indexes.
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            challenges: client.collection(CHALLENGE_COLLECTION).await?,
            participations: client.collection(PARTICIPATION_COLLECTION).await?,
            users: client.collection(USER_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl RemoteBackend for MongoBackend {
    async fn insert_challenge(&self, challenge: Challenge) -> Result<()> {
        self.challenges
            .insert_one(ChallengeDoc::from(challenge))
            .await
    }

    async fn fetch_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>> {
        let doc = self
            .challenges
            .find_one(doc! { "challenge_id": challenge_id })
            .await?;
        Ok(doc.map(Challenge::from))
    }

    async fn fetch_active_challenges(&self, limit: i64) -> Result<Vec<Challenge>> {
        let docs = self
            .challenges
            .find_sorted(doc! { "is_active": true }, doc! { "created_at": -1 }, limit)
            .await?;
        Ok(docs.into_iter().map(Challenge::from).collect())
    }

    async fn add_participant(&self, challenge_id: &str, user_id: &str) -> Result<()> {
        self.challenges
            .update_one(
                doc! { "challenge_id": challenge_id },
                doc! { "$addToSet": { "participants": user_id } },
            )
            .await?;
        Ok(())
    }

    async fn remove_participant(&self, challenge_id: &str, user_id: &str) -> Result<()> {
        self.challenges
            .update_one(
                doc! { "challenge_id": challenge_id },
                doc! { "$pull": { "participants": user_id } },
            )
            .await?;
        Ok(())
    }

    async fn insert_participation(&self, participation: ChallengeParticipation) -> Result<()> {
        self.participations
            .insert_one(ParticipationDoc::from(participation))
            .await
    }

    async fn fetch_participation(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<Option<ChallengeParticipation>> {
        let doc = self
            .participations
            .find_one(doc! { "challenge_id": challenge_id, "user_id": user_id })
            .await?;
        Ok(doc.map(ChallengeParticipation::from))
    }

    async fn update_participation(&self, participation: &ChallengeParticipation) -> Result<()> {
        self.participations
            .replace_one(
                doc! {
                    "challenge_id": &participation.challenge_id,
                    "user_id": &participation.user_id,
                },
                ParticipationDoc::from(participation.clone()),
            )
            .await?;
        Ok(())
    }

    async fn delete_participation(&self, challenge_id: &str, user_id: &str) -> Result<()> {
        self.participations
            .delete_one(doc! { "challenge_id": challenge_id, "user_id": user_id })
            .await?;
        Ok(())
    }

    async fn fetch_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let docs = self
            .users
            .find_sorted(doc! {}, doc! { "points": -1 }, limit)
            .await?;
        Ok(docs.into_iter().map(LeaderboardEntry::from).collect())
    }

    async fn watch_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<mpsc::Receiver<RemoteEvent<Option<Challenge>>>> {
        let stream = self
            .challenges
            .inner()
            .watch()
            .await
            .map_err(ChallengeError::from)?;

        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let backend = self.clone();
        let id = challenge_id.to_string();

        // Delete events carry no document, so each notification refetches
        // the current state instead of decoding the event payload.
        tokio::spawn(async move {
            let mut stream = stream;
            while let Some(event) = stream.next().await {
                if let Err(e) = event {
                    warn!("Challenge change stream failed: {}", e);
                    let _ = tx.send(RemoteEvent::TransportError).await;
                    return;
                }

                match backend.fetch_challenge(&id).await {
                    Ok(snapshot) => {
                        if tx.send(RemoteEvent::Changed(snapshot)).await.is_err() {
                            debug!("Challenge watcher for {} dropped", id);
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Refetch after challenge change failed: {}", e);
                        let _ = tx.send(RemoteEvent::TransportError).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn watch_participation(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<mpsc::Receiver<RemoteEvent<Option<ChallengeParticipation>>>> {
        let stream = self
            .participations
            .inner()
            .watch()
            .await
            .map_err(ChallengeError::from)?;

        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let backend = self.clone();
        let challenge_id = challenge_id.to_string();
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            let mut stream = stream;
            while let Some(event) = stream.next().await {
                if let Err(e) = event {
                    warn!("Participation change stream failed: {}", e);
                    let _ = tx.send(RemoteEvent::TransportError).await;
                    return;
                }

                match backend.fetch_participation(&challenge_id, &user_id).await {
                    Ok(snapshot) => {
                        if tx.send(RemoteEvent::Changed(snapshot)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Refetch after participation change failed: {}", e);
                        let _ = tx.send(RemoteEvent::TransportError).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn watch_active_challenges(
        &self,
        limit: i64,
    ) -> Result<mpsc::Receiver<RemoteEvent<Vec<Challenge>>>> {
        let stream = self
            .challenges
            .inner()
            .watch()
            .await
            .map_err(ChallengeError::from)?;

        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let backend = self.clone();

        tokio::spawn(async move {
            let mut stream = stream;
            while let Some(event) = stream.next().await {
                if let Err(e) = event {
                    warn!("Active-challenge change stream failed: {}", e);
                    let _ = tx.send(RemoteEvent::TransportError).await;
                    return;
                }

                match backend.fetch_active_challenges(limit).await {
                    Ok(list) => {
                        if tx.send(RemoteEvent::Changed(list)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Refetch after listing change failed: {}", e);
                        let _ = tx.send(RemoteEvent::TransportError).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory backend used by the service and subscription tests.

    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory [`RemoteBackend`] with a failure switch
    #[derive(Default)]
    pub struct MemoryBackend {
        pub challenges: Mutex<Vec<Challenge>>,
        pub participations: Mutex<Vec<ChallengeParticipation>>,
        pub leaderboard: Mutex<Vec<LeaderboardEntry>>,
        /// When set, every operation fails with `Unavailable`
        pub fail: AtomicBool,
        /// Number of active-listing fetches served
        pub active_fetches: AtomicUsize,
        /// Senders for challenge watches, so tests can push events
        pub challenge_watchers: Mutex<Vec<mpsc::Sender<RemoteEvent<Option<Challenge>>>>>,
    }

    impl MemoryBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(ChallengeError::Unavailable("backend forced down".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RemoteBackend for MemoryBackend {
        async fn insert_challenge(&self, challenge: Challenge) -> Result<()> {
            self.check()?;
            self.challenges.lock().unwrap().push(challenge);
            Ok(())
        }

        async fn fetch_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>> {
            self.check()?;
            Ok(self
                .challenges
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == challenge_id)
                .cloned())
        }

        async fn fetch_active_challenges(&self, limit: i64) -> Result<Vec<Challenge>> {
            self.check()?;
            self.active_fetches.fetch_add(1, Ordering::SeqCst);
            let mut list: Vec<Challenge> = self
                .challenges
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.is_active)
                .cloned()
                .collect();
            list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            list.truncate(limit as usize);
            Ok(list)
        }

        async fn add_participant(&self, challenge_id: &str, user_id: &str) -> Result<()> {
            self.check()?;
            let mut challenges = self.challenges.lock().unwrap();
            if let Some(c) = challenges.iter_mut().find(|c| c.id == challenge_id) {
                if !c.participants.iter().any(|p| p == user_id) {
                    c.participants.push(user_id.to_string());
                }
            }
            Ok(())
        }

        async fn remove_participant(&self, challenge_id: &str, user_id: &str) -> Result<()> {
            self.check()?;
            let mut challenges = self.challenges.lock().unwrap();
            if let Some(c) = challenges.iter_mut().find(|c| c.id == challenge_id) {
                c.participants.retain(|p| p != user_id);
            }
            Ok(())
        }

        async fn insert_participation(&self, participation: ChallengeParticipation) -> Result<()> {
            self.check()?;
            self.participations.lock().unwrap().push(participation);
            Ok(())
        }

        async fn fetch_participation(
            &self,
            challenge_id: &str,
            user_id: &str,
        ) -> Result<Option<ChallengeParticipation>> {
            self.check()?;
            Ok(self
                .participations
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.challenge_id == challenge_id && p.user_id == user_id)
                .cloned())
        }

        async fn update_participation(&self, participation: &ChallengeParticipation) -> Result<()> {
            self.check()?;
            let mut records = self.participations.lock().unwrap();
            records.retain(|p| {
                !(p.challenge_id == participation.challenge_id
                    && p.user_id == participation.user_id)
            });
            records.push(participation.clone());
            Ok(())
        }

        async fn delete_participation(&self, challenge_id: &str, user_id: &str) -> Result<()> {
            self.check()?;
            self.participations
                .lock()
                .unwrap()
                .retain(|p| !(p.challenge_id == challenge_id && p.user_id == user_id));
            Ok(())
        }

        async fn fetch_leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
            self.check()?;
            let mut list = self.leaderboard.lock().unwrap().clone();
            list.sort_by(|a, b| b.points.cmp(&a.points));
            list.truncate(limit as usize);
            Ok(list)
        }

        async fn watch_challenge(
            &self,
            _challenge_id: &str,
        ) -> Result<mpsc::Receiver<RemoteEvent<Option<Challenge>>>> {
            self.check()?;
            let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
            self.challenge_watchers.lock().unwrap().push(tx);
            Ok(rx)
        }

        async fn watch_participation(
            &self,
            _challenge_id: &str,
            _user_id: &str,
        ) -> Result<mpsc::Receiver<RemoteEvent<Option<ChallengeParticipation>>>> {
            self.check()?;
            let (_tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
            // Sender dropped: the channel closes and the subscription goes
            // silent, which is enough for the offline-path tests.
            Ok(rx)
        }

        async fn watch_active_challenges(
            &self,
            _limit: i64,
        ) -> Result<mpsc::Receiver<RemoteEvent<Vec<Challenge>>>> {
            self.check()?;
            let (_tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
            Ok(rx)
        }
    }
}
