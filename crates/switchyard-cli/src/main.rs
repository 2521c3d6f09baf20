//! `switchyardctl` - admin CLI for Runtime Control, plugins, and routines
//! (spec.md §4.H, §6 "Admin surface").
//!
//! Connects directly to Postgres; there is no daemon RPC layer to speak to
//! since every admin operation here is a thin wrapper over a row in
//! `runtime_control`, `plugin_instances`, or `routines`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;

use clap::{Parser, Subcommand};
use switchyard_core::{PluginInstanceId, RoutineId};

/// Admin CLI for the orchestration pipeline's Runtime Control surface.
#[derive(Parser)]
#[command(name = "switchyardctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current runtime control state.
    Status,
    /// Pause processing.
    Pause {
        /// Hard pause (checkpoint in-flight work immediately) instead of
        /// soft (let in-flight dispatches finish).
        #[arg(long)]
        hard: bool,
        /// Operator-supplied reason, recorded on the control row.
        #[arg(long)]
        reason: Option<String>,
    },
    /// Resume processing.
    Resume,
    /// Hard pause with a mandatory reason (§5 "Global emergency stop").
    EmergencyStop {
        /// Why processing is being stopped.
        reason: String,
    },
    /// Update the global concurrent-dispatch budget (1..=100).
    SetMaxConcurrent {
        /// New budget.
        value: i32,
    },
    /// Manage plugin instances.
    Plugins {
        #[command(subcommand)]
        command: PluginCommands,
    },
    /// Manage routines.
    Routines {
        #[command(subcommand)]
        command: RoutineCommands,
    },
}

#[derive(Subcommand)]
enum PluginCommands {
    /// List all configured plugin instances.
    List,
    /// Enable a plugin instance.
    Enable {
        /// Plugin instance id.
        id: uuid::Uuid,
    },
    /// Disable a plugin instance.
    Disable {
        /// Plugin instance id.
        id: uuid::Uuid,
    },
}

#[derive(Subcommand)]
enum RoutineCommands {
    /// List all configured routines.
    List,
    /// Enable a routine.
    Enable {
        /// Routine id.
        id: uuid::Uuid,
    },
    /// Disable a routine.
    Disable {
        /// Routine id.
        id: uuid::Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = switchyard_telemetry::setup_default_logging() {
        eprintln!("failed to initialize logging: {e}");
    }

    let cli = Cli::parse();
    let pool = switchyard_storage::connect_from_env().await?;

    match cli.command {
        Commands::Status => commands::control::status(&pool).await,
        Commands::Pause { hard, reason } => commands::control::pause(&pool, hard, reason).await,
        Commands::Resume => commands::control::resume(&pool).await,
        Commands::EmergencyStop { reason } => {
            commands::control::emergency_stop(&pool, reason).await
        }
        Commands::SetMaxConcurrent { value } => {
            commands::control::set_max_concurrent(&pool, value).await
        }
        Commands::Plugins { command } => match command {
            PluginCommands::List => commands::plugins::list(&pool).await,
            PluginCommands::Enable { id } => {
                commands::plugins::enable(&pool, PluginInstanceId::from_uuid(id)).await
            }
            PluginCommands::Disable { id } => {
                commands::plugins::disable(&pool, PluginInstanceId::from_uuid(id)).await
            }
        },
        Commands::Routines { command } => match command {
            RoutineCommands::List => commands::routines::list(&pool).await,
            RoutineCommands::Enable { id } => {
                commands::routines::enable(&pool, RoutineId::from_uuid(id)).await
            }
            RoutineCommands::Disable { id } => {
                commands::routines::disable(&pool, RoutineId::from_uuid(id)).await
            }
        },
    }
}
