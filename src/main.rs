//! Crazy Farm game backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crazyfarm::{
    config::Args,
    db::{FarmStore, MemoryStore, MongoClient, MongoStore},
    nats::NatsClient,
    server::{self, AppState, Backends},
    services::{self, DisabledSubscriptionChecker, NatsSubscriptionChecker, SubscriptionCheck},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("crazyfarm={},info", args.log_level).into());
    let json = args.log_format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Crazy Farm game backend");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("NATS: {}", args.nats.nats_url);
    info!("MongoDB: {} (db '{}')", args.mongodb_uri, args.mongodb_db);
    info!(
        "Init data TTL: {}",
        args.init_data_ttl()
            .map(|ttl| format!("{}s", ttl.as_secs_f64()))
            .unwrap_or_else(|| "disabled".to_string())
    );
    info!("======================================");

    // MongoDB (in-memory fallback in dev mode)
    let connected = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => MongoStore::new(&client).await,
        Err(e) => Err(e),
    };
    let (store, store_kind): (Arc<dyn FarmStore>, &'static str) = match connected {
        Ok(store) => (Arc::new(store), "mongodb"),
        Err(e) if args.dev_mode => {
            warn!("MongoDB unavailable (dev mode, using in-memory store): {}", e);
            (Arc::new(MemoryStore::new()), "memory")
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    // NATS (subscription checks disabled in dev mode)
    let (subscriptions, subscriptions_kind): (Arc<dyn SubscriptionCheck>, &'static str) =
        match NatsClient::new(&args.nats, "crazyfarm").await {
            Ok(client) => {
                let client = client.with_timeout(args.subscription_check_timeout());
                (Arc::new(NatsSubscriptionChecker::new(client)), "nats")
            }
            Err(e) if args.dev_mode => {
                warn!("NATS unavailable (dev mode, subscription checks disabled): {}", e);
                (Arc::new(DisabledSubscriptionChecker), "disabled")
            }
            Err(e) => {
                error!("NATS connection failed: {}", e);
                std::process::exit(1);
            }
        };

    if let Some(path) = &args.task_catalog {
        let definitions = services::load_catalog(path).await?;
        let seeded = services::seed_catalog(store.as_ref(), &definitions).await?;
        info!("Task catalog: {} task(s) seeded", seeded);
    }

    let state = AppState::new(
        &args,
        store,
        subscriptions,
        Backends {
            store: store_kind,
            subscriptions: subscriptions_kind,
        },
    )?;

    server::run(Arc::new(state)).await?;
    Ok(())
}
