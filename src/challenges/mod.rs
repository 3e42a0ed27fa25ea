//! Challenge progress and streak tracking
//!
//! Module map:
//! - [`streak`] / [`progress`]: pure calculators for daily-completion
//!   streaks and percentage progress
//! - [`cache`]: single-slot TTL cache for the active listing
//! - [`offline`]: local fallback store and the built-in challenge set
//! - [`probe`]: reachability check that drives tier selection
//! - [`backend`]: the remote store seam and its MongoDB implementation
//! - [`service`]: the caller-facing repository tying the tiers together
//! - [`subscription`]: callback-style live update feeds

pub mod backend;
pub mod cache;
pub mod offline;
pub mod probe;
pub mod progress;
pub mod service;
pub mod streak;
pub mod subscription;

pub use backend::{MongoBackend, RemoteBackend, RemoteEvent};
pub use cache::ChallengeCache;
pub use offline::{builtin_challenges, OfflineStore};
pub use probe::{PingProbe, ReachabilityProbe, StaticProbe};
pub use service::{ChallengeService, ServiceConfig};
pub use streak::{compute_streaks, compute_streaks_today, StreakSummary};
pub use subscription::{Subscription, SubscriptionManager};
