//! Configuration for the FoodPrint challenge service
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// FoodPrint challenge service daemon
#[derive(Parser, Debug, Clone)]
#[command(name = "foodprintd")]
#[command(about = "Challenge progress and streak tracking service for FoodPrint")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "foodprint")]
    pub mongodb_db: String,

    /// Path of the local offline fallback store (single JSON file)
    #[arg(long, env = "OFFLINE_STORE_PATH", default_value = "foodprint-offline.json")]
    pub offline_store_path: PathBuf,

    /// Active-challenge read cache TTL in seconds
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "300")]
    pub cache_ttl_secs: u64,

    /// Deadline for challenge creation in seconds
    #[arg(long, env = "CREATE_TIMEOUT_SECS", default_value = "30")]
    pub create_timeout_secs: u64,

    /// Deadline for the active-challenge listing fetch in seconds
    #[arg(long, env = "LIST_TIMEOUT_SECS", default_value = "15")]
    pub list_timeout_secs: u64,

    /// Reachability probe timeout in milliseconds
    #[arg(long, env = "PROBE_TIMEOUT_MS", default_value = "3000")]
    pub probe_timeout_ms: u64,

    /// Maximum number of challenges returned by the active listing
    #[arg(long, env = "ACTIVE_CHALLENGE_LIMIT", default_value = "50")]
    pub active_challenge_limit: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Cache TTL as a [`Duration`]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Challenge creation deadline as a [`Duration`]
    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }

    /// Active listing deadline as a [`Duration`]
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    /// Reachability probe deadline as a [`Duration`]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.create_timeout_secs == 0 {
            return Err("CREATE_TIMEOUT_SECS must be greater than zero".to_string());
        }

        if self.list_timeout_secs == 0 {
            return Err("LIST_TIMEOUT_SECS must be greater than zero".to_string());
        }

        if self.probe_timeout_ms == 0 {
            return Err("PROBE_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.active_challenge_limit <= 0 {
            return Err("ACTIVE_CHALLENGE_LIMIT must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> Args {
        Args::parse_from(["foodprintd"])
    }

    #[test]
    fn test_defaults_are_valid() {
        let args = default_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.cache_ttl(), Duration::from_secs(300));
        assert_eq!(args.create_timeout(), Duration::from_secs(30));
        assert_eq!(args.list_timeout(), Duration::from_secs(15));
        assert_eq!(args.active_challenge_limit, 50);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut args = default_args();
        args.create_timeout_secs = 0;
        assert!(args.validate().is_err());

        let mut args = default_args();
        args.list_timeout_secs = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_nonpositive_limit_rejected() {
        let mut args = default_args();
        args.active_challenge_limit = 0;
        assert!(args.validate().is_err());
    }
}
