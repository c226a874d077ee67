//! # Ribot CLI
//!
//! Command-line access to the ribot data layer.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Parse arguments (clap)                                              │
//! │  2. Initialize logging (RUST_LOG, default info)                         │
//! │  3. Load ribot.toml + RIBOT_* overrides, apply --data-dir               │
//! │  4. Open SQLite (migrations) and the preferences document               │
//! │  5. Build the HTTP client and the DataManager                           │
//! │  6. Run one command                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ribot_db::{Database, DbConfig};
use ribot_sync::{DataManager, EventBus, HttpRibotService, PreferencesStore, RibotConfig};

#[derive(Debug, Parser)]
#[command(name = "ribot", version, about = "Check in to ribot venues from the terminal")]
struct Cli {
    /// Path to ribot.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the database and preferences file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store the API access token
    SetToken { token: String },
    /// List venues (cached first, then refreshed)
    Venues,
    /// Check in at a venue or a free-text location
    CheckIn {
        #[arg(long, conflicts_with = "label", required_unless_present = "label")]
        venue: Option<String>,
        #[arg(long)]
        label: Option<String>,
    },
    /// Check out of a check-in
    CheckOut { check_in_id: String },
    /// Show the latest check-in and encounter
    Status,
    /// Follow today's check-in and data layer events until interrupted
    Watch,
    /// Record an encounter with a beacon by id
    Encounter { beacon_id: String },
    /// Record an encounter from a scanned uuid/major/minor
    Scan { uuid: String, major: u16, minor: u16 },
    /// Download the registered beacon list
    SyncBeacons,
    /// List the distinct UUIDs of registered beacons
    BeaconUuids,
    /// List team members and where they checked in
    Ribots,
    /// Remove every piece of local data
    SignOut,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = RibotConfig::load(cli.config.clone())?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let manager = open_data_manager(&config).await?;
    commands::run(&manager, cli.command, cli.json).await?;

    manager.database().close().await;
    Ok(())
}

/// Opens both stores and the API client described by `config`.
async fn open_data_manager(config: &RibotConfig) -> Result<DataManager, Box<dyn std::error::Error>> {
    let data_dir = config.data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    info!(?data_dir, "Data directory ready");

    let database = Database::new(DbConfig::new(config.database_path()?)).await?;
    let preferences = PreferencesStore::open(config.preferences_path()?).await?;

    let events = EventBus::default();
    let service = HttpRibotService::from_config(config, events.clone())?;

    Ok(DataManager::new(
        Arc::new(service),
        Arc::new(preferences),
        database,
        events,
    ))
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=ribot_sync=trace` - Trace the data manager only
/// - Default: INFO, with debug for ribot crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ribot_sync=debug,ribot_db=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
