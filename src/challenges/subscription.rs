//! Live update subscriptions
//!
//! Callback-style feeds over the remote change notifications. Each
//! subscription owns a forwarder task that turns [`RemoteEvent`]s into
//! callback invocations; the returned [`Subscription`] handle cancels it.
//!
//! Degraded behavior: when the remote store is unreachable (or the watch
//! cannot be opened, or the feed later fails), the callback is invoked once
//! with the best offline snapshot available and no further events arrive.

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::challenges::backend::{RemoteBackend, RemoteEvent};
use crate::challenges::offline::builtin_challenges;
use crate::challenges::probe::ReachabilityProbe;
use crate::model::{Challenge, ChallengeParticipation};

/// Handle to a live feed. Cancelling is idempotent; dropping the handle
/// cancels the feed as well.
pub struct Subscription {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    fn spawned(handle: JoinHandle<()>) -> Self {
        Self {
            handle: Mutex::new(Some(handle)),
        }
    }

    /// A subscription with no live feed behind it. Used when the feed
    /// degraded to a one-shot offline snapshot.
    pub fn noop() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Stop the feed. Safe to call more than once.
    pub fn cancel(&self) {
        if let Ok(mut slot) = self.handle.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Opens live feeds against the remote store, degrading per the probe
pub struct SubscriptionManager<B: RemoteBackend> {
    backend: Arc<B>,
    probe: Arc<dyn ReachabilityProbe>,
}

impl<B: RemoteBackend> SubscriptionManager<B> {
    pub fn new(backend: Arc<B>, probe: Arc<dyn ReachabilityProbe>) -> Self {
        Self { backend, probe }
    }

    /// Feed of snapshots for one challenge. `None` snapshots mean the
    /// challenge no longer exists.
    pub async fn subscribe_to_challenge<F>(&self, challenge_id: &str, callback: F) -> Subscription
    where
        F: Fn(Option<Challenge>) + Send + Sync + 'static,
    {
        if !self.probe.is_reachable().await {
            callback(offline_challenge(challenge_id));
            return Subscription::noop();
        }

        match self.backend.watch_challenge(challenge_id).await {
            Ok(mut rx) => {
                let id = challenge_id.to_string();
                Subscription::spawned(tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        match event {
                            RemoteEvent::Changed(snapshot) => callback(snapshot),
                            RemoteEvent::TransportError => {
                                warn!("Live feed for challenge {} lost", id);
                                callback(offline_challenge(&id));
                                return;
                            }
                        }
                    }
                }))
            }
            Err(e) => {
                warn!("Could not open challenge feed: {}", e);
                callback(offline_challenge(challenge_id));
                Subscription::noop()
            }
        }
    }

    /// Feed of snapshots for one (challenge, user) participation record
    pub async fn subscribe_to_user_participation<F>(
        &self,
        challenge_id: &str,
        user_id: &str,
        callback: F,
    ) -> Subscription
    where
        F: Fn(Option<ChallengeParticipation>) + Send + Sync + 'static,
    {
        if !self.probe.is_reachable().await {
            callback(None);
            return Subscription::noop();
        }

        match self.backend.watch_participation(challenge_id, user_id).await {
            Ok(mut rx) => {
                let pair = format!("({}, {})", challenge_id, user_id);
                Subscription::spawned(tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        match event {
                            RemoteEvent::Changed(snapshot) => callback(snapshot),
                            RemoteEvent::TransportError => {
                                warn!("Live feed for participation {} lost", pair);
                                callback(None);
                                return;
                            }
                        }
                    }
                }))
            }
            Err(e) => {
                warn!("Could not open participation feed: {}", e);
                callback(None);
                Subscription::noop()
            }
        }
    }

    /// Feed of the active-challenge listing
    pub async fn subscribe_to_active_challenges<F>(&self, limit: i64, callback: F) -> Subscription
    where
        F: Fn(Vec<Challenge>) + Send + Sync + 'static,
    {
        if !self.probe.is_reachable().await {
            callback(builtin_challenges());
            return Subscription::noop();
        }

        match self.backend.watch_active_challenges(limit).await {
            Ok(mut rx) => Subscription::spawned(tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    match event {
                        RemoteEvent::Changed(list) => callback(list),
                        RemoteEvent::TransportError => {
                            warn!("Live feed for the active listing lost");
                            callback(builtin_challenges());
                            return;
                        }
                    }
                }
            })),
            Err(e) => {
                warn!("Could not open active listing feed: {}", e);
                callback(builtin_challenges());
                Subscription::noop()
            }
        }
    }
}

fn offline_challenge(challenge_id: &str) -> Option<Challenge> {
    builtin_challenges()
        .into_iter()
        .find(|c| c.id == challenge_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenges::backend::testing::MemoryBackend;
    use crate::challenges::probe::StaticProbe;
    use std::time::Duration;

    fn manager(
        backend: Arc<MemoryBackend>,
        reachable: bool,
    ) -> SubscriptionManager<MemoryBackend> {
        SubscriptionManager::new(backend, Arc::new(StaticProbe(reachable)))
    }

    async fn wait_for<T: Send + 'static>(
        seen: &Arc<Mutex<Vec<T>>>,
        count: usize,
    ) -> Vec<T>
    where
        T: Clone,
    {
        for _ in 0..100 {
            if seen.lock().unwrap().len() >= count {
                return seen.lock().unwrap().clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} callback invocations", count);
    }

    #[tokio::test]
    async fn test_offline_subscribe_delivers_one_builtin_snapshot() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(backend, false);

        let seen: Arc<Mutex<Vec<Option<Challenge>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = manager
            .subscribe_to_challenge("offline-water-saver", move |snapshot| {
                sink.lock().unwrap().push(snapshot);
            })
            .await;

        let delivered = seen.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        let snapshot = delivered[0].as_ref().expect("builtin id should resolve");
        assert_eq!(snapshot.title, "Water Saver");
        drop(delivered);

        sub.cancel();
        sub.cancel();
    }

    #[tokio::test]
    async fn test_offline_subscribe_unknown_id_delivers_none() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(backend, false);

        let seen: Arc<Mutex<Vec<Option<Challenge>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager
            .subscribe_to_challenge("no-such-challenge", move |snapshot| {
                sink.lock().unwrap().push(snapshot);
            })
            .await;

        let delivered = seen.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].is_none());
    }

    #[tokio::test]
    async fn test_online_events_forward_to_callback() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(Arc::clone(&backend), true);

        let seen: Arc<Mutex<Vec<Option<Challenge>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = manager
            .subscribe_to_challenge("c1", move |snapshot| {
                sink.lock().unwrap().push(snapshot);
            })
            .await;

        let mut challenge = builtin_challenges().remove(0);
        challenge.id = "c1".to_string();
        let tx = backend.challenge_watchers.lock().unwrap()[0].clone();
        tx.send(RemoteEvent::Changed(Some(challenge.clone())))
            .await
            .unwrap();
        tx.send(RemoteEvent::Changed(None)).await.unwrap();

        let delivered = wait_for(&seen, 2).await;
        assert_eq!(delivered[0].as_ref().unwrap().id, "c1");
        assert!(delivered[1].is_none());
    }

    #[tokio::test]
    async fn test_transport_error_degrades_and_ends_feed() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(Arc::clone(&backend), true);

        let seen: Arc<Mutex<Vec<Option<Challenge>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = manager
            .subscribe_to_challenge("offline-carbon-week", move |snapshot| {
                sink.lock().unwrap().push(snapshot);
            })
            .await;

        let tx = backend.challenge_watchers.lock().unwrap()[0].clone();
        tx.send(RemoteEvent::TransportError).await.unwrap();

        let delivered = wait_for(&seen, 1).await;
        // The degraded snapshot comes from the built-in set.
        assert_eq!(
            delivered[0].as_ref().unwrap().id,
            "offline-carbon-week"
        );

        // The forwarder exited, so further sends find no receiver.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(tx.send(RemoteEvent::TransportError).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_stops_forwarding() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(Arc::clone(&backend), true);

        let seen: Arc<Mutex<Vec<Option<Challenge>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = manager
            .subscribe_to_challenge("c1", move |snapshot| {
                sink.lock().unwrap().push(snapshot);
            })
            .await;

        sub.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let tx = backend.challenge_watchers.lock().unwrap()[0].clone();
        // Aborted task no longer drains the channel; nothing reaches the
        // callback regardless of send outcome.
        let _ = tx.send(RemoteEvent::Changed(None)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_active_listing_snapshot() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(backend, false);

        let seen: Arc<Mutex<Vec<Vec<Challenge>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager
            .subscribe_to_active_challenges(50, move |list| {
                sink.lock().unwrap().push(list);
            })
            .await;

        let delivered = seen.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].len(), 3);
    }

    #[tokio::test]
    async fn test_offline_participation_snapshot_is_none() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(backend, false);

        let seen: Arc<Mutex<Vec<Option<ChallengeParticipation>>>> =
            Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager
            .subscribe_to_user_participation("c1", "u1", move |snapshot| {
                sink.lock().unwrap().push(snapshot);
            })
            .await;

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(seen.lock().unwrap()[0].is_none());
    }
}
