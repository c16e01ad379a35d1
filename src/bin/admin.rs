//! babysync Admin CLI
//!
//! Administration tool for managing paired devices on the sync server.
//!
//! # Usage
//!
//! ```bash
//! babysync-admin device pair kitchen-tablet --name "Kitchen tablet"
//! babysync-admin device list
//! babysync-admin device disable kitchen-tablet
//! babysync-admin clock
//! ```
//!
//! Uses the same configuration as the server to locate the database.

use chrono::DateTime;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use babysync::config::Config;
use babysync::db::{init_db, records, ClockAuthority, WatermarkRepository};
use babysync::models::{Event, GrowthData};
use babysync::SyncEngine;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "babysync-admin")]
#[command(version)]
#[command(about = "babysync server administration tool")]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage devices
    Device(DeviceCommand),
    /// Show the server clock and record counts
    Clock,
}

#[derive(Args)]
struct DeviceCommand {
    #[command(subcommand)]
    command: DeviceSubcommand,
}

#[derive(Subcommand)]
enum DeviceSubcommand {
    /// List paired devices
    List,
    /// Pair a device, or re-pair it with a fresh credential
    Pair {
        /// Device ID
        device_id: String,
        /// Display name
        #[arg(long, short)]
        name: Option<String>,
    },
    /// Stop a device from syncing
    Disable {
        /// Device ID
        device_id: String,
    },
    /// Allow a disabled device to sync again
    Enable {
        /// Device ID
        device_id: String,
    },
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ============================================================================
// Commands
// ============================================================================

fn format_ts(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

async fn list_devices(engine: &SyncEngine) -> CmdResult {
    let devices = engine.credentials().devices().list().await?;

    if devices.is_empty() {
        println!("No devices paired.");
        return Ok(());
    }

    let watermarks = engine.watermarks().list().await?;

    println!(
        "{:<24} {:<20} {:<8} {:<18} {:<10}",
        "DEVICE", "NAME", "ENABLED", "LAST PAIRED", "WATERMARK"
    );
    println!("{}", "-".repeat(84));

    for device in &devices {
        let watermark = watermarks
            .iter()
            .find(|w| w.device_id == device.device_id)
            .map(|w| w.last_clock.to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<24} {:<20} {:<8} {:<18} {:<10}",
            device.device_id,
            device.name.as_deref().unwrap_or(""),
            if device.enabled { "yes" } else { "no" },
            format_ts(device.last_seen_ts),
            watermark
        );
    }

    println!();
    println!("Total: {} device(s)", devices.len());

    Ok(())
}

async fn pair_device(engine: &SyncEngine, device_id: String, name: Option<String>) -> CmdResult {
    let paired = engine
        .credentials()
        .pair_unchecked(&device_id, name.as_deref())
        .await?;

    println!("Paired device: {}", paired.device_id);
    println!("  Token: {}", paired.token);
    println!();
    println!("The token is shown once. Any previous token for this device no longer works.");

    Ok(())
}

async fn set_enabled(engine: &SyncEngine, device_id: String, enabled: bool) -> CmdResult {
    if !engine
        .credentials()
        .devices()
        .set_enabled(&device_id, enabled)
        .await?
    {
        eprintln!("Error: Device '{}' not found", device_id);
        std::process::exit(1);
    }

    println!(
        "{} device: {}",
        if enabled { "Enabled" } else { "Disabled" },
        device_id
    );
    Ok(())
}

async fn show_clock(pool: &sqlx::SqlitePool) -> CmdResult {
    let current = ClockAuthority::new(pool.clone()).current().await?;

    let mut conn = pool.acquire().await?;
    let events = records::count::<Event>(&mut conn).await?;
    let growth = records::count::<GrowthData>(&mut conn).await?;
    let watermarks = WatermarkRepository::new(pool.clone()).list().await?;
    let lagging = watermarks.iter().filter(|w| w.last_clock < current).count();

    println!("Server clock: {}", current);
    println!("  Events:      {}", events);
    println!("  Growth data: {}", growth);
    println!("  Devices behind the clock: {}", lagging);

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

async fn run(cli: Cli) -> CmdResult {
    let config = Config::load(cli.config)?;
    let pool = init_db(&config.database_path).await?;
    let engine = SyncEngine::new(pool.clone(), config.pairing_code);

    match cli.command {
        Commands::Device(device_cmd) => match device_cmd.command {
            DeviceSubcommand::List => list_devices(&engine).await,
            DeviceSubcommand::Pair { device_id, name } => {
                pair_device(&engine, device_id, name).await
            }
            DeviceSubcommand::Disable { device_id } => set_enabled(&engine, device_id, false).await,
            DeviceSubcommand::Enable { device_id } => set_enabled(&engine, device_id, true).await,
        },
        Commands::Clock => show_clock(&pool).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
