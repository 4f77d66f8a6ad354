//! Depot - real-time shared depot for collaborative construction projects

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use depot::{
    config::Args,
    server,
    store::{FileStore, MemoryStore, ProjectStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("depot={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Depot - shared construction depot");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Storage: {}", args.storage);
    info!("Retention: {} days", args.retention_days);
    info!("Sweep interval: {}s", args.sweep_interval_secs);
    info!("======================================");

    let store: Arc<dyn ProjectStore> = match args.storage.as_str() {
        "file" => {
            let path = args.data_dir.join("projects.json");
            match FileStore::new(&path).await {
                Ok(store) => {
                    info!("File store ready at {}", path.display());
                    Arc::new(store)
                }
                Err(e) => {
                    error!("File store initialization failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        _ => {
            info!("In-memory store (projects live for the process lifetime)");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Arc::new(server::AppState::new(args, store));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
