//! Backend connectivity probe
//!
//! A boolean "is the remote store currently usable" check, consulted at the
//! start of every remote-touching operation. The probe is advisory: the
//! repository still falls back when a remote call fails after a positive
//! probe.

use async_trait::async_trait;
use bson::doc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::db::MongoClient;

/// Reachability check for the remote document store
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probe that pings the MongoDB deployment under a short deadline
pub struct PingProbe {
    client: MongoClient,
    deadline: Duration,
}

impl PingProbe {
    pub fn new(client: MongoClient, deadline: Duration) -> Self {
        Self { client, deadline }
    }
}

#[async_trait]
impl ReachabilityProbe for PingProbe {
    async fn is_reachable(&self) -> bool {
        let database = self.client.inner().database(self.client.db_name());
        let ping = database.run_command(doc! { "ping": 1 });

        match timeout(self.deadline, ping).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Reachability ping failed: {}", e);
                false
            }
            Err(_) => {
                debug!("Reachability ping timed out after {:?}", self.deadline);
                false
            }
        }
    }
}

/// Probe with a fixed answer, for tests and forced-offline operation
pub struct StaticProbe(pub bool);

#[async_trait]
impl ReachabilityProbe for StaticProbe {
    async fn is_reachable(&self) -> bool {
        self.0
    }
}
