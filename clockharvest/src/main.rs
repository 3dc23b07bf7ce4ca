//! clockharvest - Attendance harvesting CLI
//!
//! Pulls attendance punches from registered biometric terminal clocks into
//! the local database. Exit codes for `all`: 0 when every device succeeded,
//! 1 on partial success, 2 when no device succeeded.

use anyhow::Result;
use clap::{Parser, Subcommand};
use clockharvest::device::{TcpProbe, TerminalCapabilityFactory};
use clockharvest::{HarvestController, ProcessResult, RunSummary};
use clockharvest_common::config::Settings;
use clockharvest_common::db::{init_database, ClockRepository};
use clockharvest_common::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "clockharvest", version, about = "Attendance harvesting from biometric terminal clocks")]
struct Cli {
    /// Settings file (default: per-user config dir, then compiled defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file override
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest marks from a single clock
    Single {
        /// IP address of the clock
        #[arg(short = 'a', long)]
        address: String,

        /// Port override (default: registered port)
        #[arg(short = 'p', long)]
        port: Option<u16>,

        /// Passcode override (default: registered passcode)
        #[arg(short = 'P', long)]
        passcode: Option<i64>,
    },

    /// Harvest marks from all active clocks
    All,

    /// Maintain the clock registry
    Clocks {
        #[command(subcommand)]
        action: ClocksAction,
    },
}

#[derive(Subcommand)]
enum ClocksAction {
    /// Register a clock, or update its endpoint data
    Add {
        /// IP address of the clock
        #[arg(short = 'a', long)]
        address: String,

        /// Device port
        #[arg(short = 'p', long)]
        port: Option<u16>,

        /// Device passcode
        #[arg(short = 'P', long, default_value_t = 0)]
        passcode: i64,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Physical location
        #[arg(long)]
        location: Option<String>,
    },

    /// Re-activate a clock
    Enable {
        #[arg(short = 'a', long)]
        address: String,
    },

    /// Deactivate a clock without deleting its registration
    Disable {
        #[arg(short = 'a', long)]
        address: String,
    },

    /// List active clocks
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n  ✗ Error: {e:#}");
            match e.downcast_ref::<Error>() {
                Some(Error::Config(_)) => 1,
                _ => 2,
            }
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    info!("Starting clockharvest v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        settings.database_path = database;
    }
    info!("Database: {}", settings.database_path.display());

    let pool = init_database(&settings.database_path).await?;

    match cli.command {
        Command::Single { address, port, passcode } => {
            print_banner();
            println!("  Mode: single clock ({})", address);
            println!();

            let controller = controller(settings, pool);
            let result = controller.process_device(&address, port, passcode).await;

            print_result(&result);
            Ok(if result.success { 0 } else { 1 })
        }

        Command::All => {
            print_banner();
            println!("  Mode: all active clocks");
            println!();

            let controller = controller(settings, pool);
            let results = controller.process_all().await?;

            if results.is_empty() {
                println!("  No active clocks to process");
                return Ok(0);
            }

            for result in &results {
                print_result(result);
            }
            let summary = RunSummary::from_results(&results);
            print_summary(&summary);

            Ok(if summary.succeeded == summary.devices {
                0
            } else if summary.succeeded > 0 {
                1
            } else {
                2
            })
        }

        Command::Clocks { action } => {
            let default_port = settings.default_port;
            run_clocks(ClockRepository::new(pool), action, default_port).await?;
            Ok(0)
        }
    }
}

fn controller(settings: Settings, pool: sqlx::SqlitePool) -> HarvestController {
    let connect_timeout = Duration::from_millis(settings.connect_timeout_ms);
    HarvestController::new(
        settings,
        pool,
        Arc::new(TerminalCapabilityFactory::new(connect_timeout)),
        Arc::new(TcpProbe),
    )
}

async fn run_clocks(clocks: ClockRepository, action: ClocksAction, default_port: u16) -> Result<()> {
    match action {
        ClocksAction::Add { address, port, passcode, name, location } => {
            let port = port.unwrap_or(default_port);
            let id = clocks
                .upsert(&address, port, passcode, name.as_deref(), location.as_deref())
                .await?;
            println!("  Registered clock {} ({}:{})", id, address, port);
        }
        ClocksAction::Enable { address } => {
            if clocks.set_active(&address, true).await? {
                println!("  Enabled {}", address);
            } else {
                println!("  Unknown clock {}", address);
            }
        }
        ClocksAction::Disable { address } => {
            if clocks.set_active(&address, false).await? {
                println!("  Disabled {}", address);
            } else {
                println!("  Unknown clock {}", address);
            }
        }
        ClocksAction::List => {
            let active = clocks.list_active().await?;
            if active.is_empty() {
                println!("  No active clocks registered");
            }
            for clock in active {
                println!(
                    "  [{}] {}:{} {} {}",
                    clock.id,
                    clock.ip,
                    clock.port,
                    clock.name.as_deref().unwrap_or("-"),
                    clock.location.as_deref().unwrap_or("-"),
                );
            }
        }
    }
    Ok(())
}

fn print_banner() {
    println!();
    println!("{}", "=".repeat(60));
    println!("  clockharvest - attendance harvesting");
    println!("{}", "=".repeat(60));
}

fn print_result(result: &ProcessResult) {
    let status = if result.success { "✓" } else { "✗" };
    println!("  [{}] {}", status, result.clock_ip);
    println!("      Marks processed: {}", result.marks_processed);
    println!("      Marks saved:     {}", result.marks_saved);
    println!("      Elapsed:         {:.2}s", result.elapsed.as_secs_f64());
    if let Some(error) = &result.error {
        println!("      Error: {}", error);
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "=".repeat(60));
    println!("  SUMMARY");
    println!("{}", "=".repeat(60));
    println!("  Clocks succeeded: {}/{}", summary.succeeded, summary.devices);
    println!("  Marks processed:  {}", summary.marks_processed);
    println!("  Marks saved:      {}", summary.marks_saved);
    println!("  Total time:       {:.2}s", summary.total_elapsed.as_secs_f64());
    println!("{}", "=".repeat(60));
    println!();
}
