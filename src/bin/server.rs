//! babysync server
//!
//! # Configuration
//!
//! Read from `~/.config/babysync/config.yaml` (or `BABYSYNC_CONFIG`), then
//! overridden by environment variables:
//! - `BABYSYNC_HOST`: Address to bind (default: 0.0.0.0)
//! - `BABYSYNC_PORT`: Port to listen on (default: 8080)
//! - `BABYSYNC_DATABASE_PATH`: SQLite database (default: ~/.local/share/babysync/babysync.db)
//! - `BABYSYNC_PAIRING_CODE`: Code required to pair a device (default: none)
//!
//! # Config File Format
//!
//! ```yaml
//! port: 8080
//! database_path: /var/lib/babysync/babysync.db
//! pairing_code: "1234"
//! ```

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use babysync::config::Config;
use babysync::db::init_db;
use babysync::server;
use babysync::SyncEngine;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "babysync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::load(None) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Database: {}", config.database_path.display());
    if config.pairing_code.is_none() {
        tracing::warn!("No pairing code configured - any client can pair a device");
    }

    let pool = match init_db(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let engine = Arc::new(SyncEngine::new(pool, config.pairing_code.clone()));
    let app = server::router(engine);

    // Start server
    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Starting server on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
