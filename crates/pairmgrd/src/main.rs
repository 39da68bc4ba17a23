//! pairmgrd - box/screen pairing manager daemon.
//!
//! Entry point: resolves the console device, opens the datastore, and
//! runs one of the subcommands. A switch that cannot be reached at
//! startup leaves the daemon in degraded mode: record mutations keep
//! working and switch pushes fail fast until the next successful sync.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use kiosk_pairmgrd::{AssignmentCoordinator, ReconcileEngine};
use kiosk_store::AssignmentStore;
use kiosk_switch::SwitchCtl;
use kiosk_terminal::{SerialSettings, TerminalSession};

/// Environment variable overriding the console serial device.
const SERIAL_PORT_ENV: &str = "PAIRMGRD_SERIAL_PORT";

#[derive(Parser)]
#[command(
    name = "pairmgrd",
    about = "Box/screen pairing manager for a Cisco-switched kiosk floor"
)]
struct Cli {
    /// Path to the JSON datastore.
    #[arg(long, default_value = "boxes.json")]
    db: PathBuf,

    /// Console serial device; overrides the stored configuration.
    #[arg(long)]
    serial_port: Option<String>,

    /// Enable password for privileged EXEC mode, if the switch asks.
    #[arg(long)]
    enable_password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run resident: connect, replay all assignments, await shutdown.
    Serve,
    /// One-shot full reconciliation of the switch against the datastore.
    Sync,
    /// Print the switch status surface as JSON.
    Status,
}

/// Initializes the tracing subsystem.
fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");
}

/// Console device resolution: CLI flag, stored configuration,
/// environment, platform default.
fn resolve_serial_port(cli: &Cli, store: &AssignmentStore) -> String {
    cli.serial_port
        .clone()
        .or_else(|| store.serial_port().map(str::to_string))
        .or_else(|| std::env::var(SERIAL_PORT_ENV).ok())
        .unwrap_or_else(|| SerialSettings::DEFAULT_DEVICE.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "pairmgrd failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let store = AssignmentStore::open(&cli.db)
        .with_context(|| format!("opening datastore {}", cli.db.display()))?;

    let device = resolve_serial_port(&cli, &store);
    info!(device = %device, "using console device");

    let session = TerminalSession::new(SerialSettings::new(&device));
    let mut ctl = SwitchCtl::new(session);
    if let Some(password) = &cli.enable_password {
        ctl = ctl.with_enable_password(password);
    }
    let ctl = Arc::new(ctl);
    let engine = ReconcileEngine::new(Arc::clone(&ctl));
    let coordinator = AssignmentCoordinator::new(store, engine);

    match cli.command {
        Command::Serve => serve(coordinator, ctl).await,
        Command::Sync => sync_once(coordinator).await,
        Command::Status => status(ctl).await,
    }
}

async fn serve(
    coordinator: AssignmentCoordinator<SwitchCtl>,
    ctl: Arc<SwitchCtl>,
) -> anyhow::Result<ExitCode> {
    info!("--- starting pairmgrd ---");

    if coordinator.sync_all().await {
        info!("switch synchronized with datastore");
    } else {
        warn!("switch unavailable at startup; continuing in degraded mode");
    }

    info!("pairmgrd running; ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    ctl.disconnect().await;
    info!("pairmgrd stopped");
    Ok(ExitCode::SUCCESS)
}

async fn sync_once(coordinator: AssignmentCoordinator<SwitchCtl>) -> anyhow::Result<ExitCode> {
    if coordinator.sync_all().await {
        info!("switch synchronized with datastore");
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("synchronization failed; switch unavailable");
        Ok(ExitCode::FAILURE)
    }
}

async fn status(ctl: Arc<SwitchCtl>) -> anyhow::Result<ExitCode> {
    if let Err(e) = ctl.connect().await {
        warn!(error = %e, "switch console unavailable");
    }
    let info = ctl.switch_info().await;
    let json = serde_json::to_string_pretty(&info).context("serializing switch status")?;
    println!("{}", json);
    Ok(ExitCode::SUCCESS)
}
