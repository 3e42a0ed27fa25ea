//! foodprintd - FoodPrint challenge progress and streak tracking service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodprint_challenges::{
    challenges::{ChallengeService, MongoBackend, OfflineStore, PingProbe, ServiceConfig},
    config::Args,
    db::MongoClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("foodprint_challenges={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  foodprintd - Challenge Tracker");
    info!("======================================");
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Database: {}", args.mongodb_db);
    info!("Offline store: {}", args.offline_store_path.display());
    info!("Cache TTL: {}s", args.cache_ttl_secs);
    info!(
        "Deadlines: create {}s, listing {}s, probe {}ms",
        args.create_timeout_secs, args.list_timeout_secs, args.probe_timeout_ms
    );
    info!("Active listing limit: {}", args.active_challenge_limit);
    info!("======================================");

    // Connect to MongoDB. The service keeps working through later outages,
    // but startup requires a reachable deployment so indexes get applied.
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            client
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let backend = match MongoBackend::new(&mongo).await {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            error!("Collection setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let probe = Arc::new(PingProbe::new(mongo.clone(), args.probe_timeout()));
    let offline = OfflineStore::new(&args.offline_store_path);
    let service = ChallengeService::new(
        backend,
        probe,
        offline,
        ServiceConfig::from_args(&args),
    );

    // Install the built-in challenge set when missing
    match service.seed_builtin_challenges().await {
        Ok(0) => info!("Built-in challenge set already present"),
        Ok(n) => info!("Seeded {} built-in challenge(s)", n),
        Err(e) => warn!("Built-in challenge seeding failed (non-fatal): {}", e),
    }

    info!(
        "Serving {} active challenge(s)",
        service.get_active_challenges().await.len()
    );

    // Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
