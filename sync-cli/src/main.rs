//! # tasksync
//!
//! CLI for managing a tasksync task list.
//!
//! The remote store is a JSON file (shared between runs and users); the
//! last confirmed list is cached per data directory.
//!
//! ## Commands
//!
//! - `init`: Configure the user id
//! - `add`: Create a task
//! - `list`: Show tasks, optionally filtered
//! - `update`: Change fields of a task
//! - `done`: Mark a task completed
//! - `rm`: Delete a task
//! - `status`: Show configuration and sync status
//!
//! ## Example
//!
//! ```bash
//! tasksync init --user alice
//! tasksync add "Write report" --due 2025-01-01 --priority high
//! tasksync list --status incomplete
//! tasksync done 3f2a...
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sync_types::{Priority, PriorityFilter, StatusFilter, TaskPatch};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod session;

use commands::{add, init, list, remove, status, update};
use config::{Config, Settings};

/// CLI for managing a tasksync task list.
#[derive(Parser, Debug)]
#[command(name = "tasksync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for configuration, cache and the remote file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configure the user id
    Init {
        /// User id tasks are owned by
        #[arg(long)]
        user: String,
    },

    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: String,

        /// Task description
        #[arg(long, short, default_value = "")]
        description: String,

        /// Priority: low, medium or high
        #[arg(long, short, default_value = "medium")]
        priority: Priority,
    },

    /// Show tasks
    List {
        /// Only tasks with this priority: all, low, medium or high
        #[arg(long, default_value = "all")]
        priority: PriorityFilter,

        /// Only tasks with this status: all, completed or incomplete
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },

    /// Change fields of a task
    Update {
        /// Task id
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// New priority
        #[arg(long)]
        priority: Option<Priority>,

        /// Completion flag
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Mark a task completed
    Done {
        /// Task id
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task id
        id: String,
    },

    /// Show configuration and sync status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let user_override = cli.user.as_deref();

    match cli.command {
        Commands::Init { user } => {
            init::run(&data_dir, &user).await?;
        }
        Commands::Add {
            title,
            due,
            description,
            priority,
        } => {
            let settings = load_settings(&data_dir, user_override).await?;
            add::run(&settings, &title, &due, &description, priority).await?;
        }
        Commands::List { priority, status } => {
            let settings = load_settings(&data_dir, user_override).await?;
            list::run(&settings, priority, status).await?;
        }
        Commands::Update {
            id,
            title,
            description,
            due,
            priority,
            completed,
        } => {
            let settings = load_settings(&data_dir, user_override).await?;
            let patch = TaskPatch {
                title,
                description,
                due_date: due,
                priority,
                completed,
            };
            update::run(&settings, &id, patch).await?;
        }
        Commands::Done { id } => {
            let settings = load_settings(&data_dir, user_override).await?;
            update::run(&settings, &id, TaskPatch::new().with_completed(true)).await?;
        }
        Commands::Rm { id } => {
            let settings = load_settings(&data_dir, user_override).await?;
            remove::run(&settings, &id).await?;
        }
        Commands::Status => {
            let settings = load_settings(&data_dir, user_override).await?;
            status::run(&settings).await?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();
}

/// Load the config file and apply command-line overrides.
async fn load_settings(data_dir: &Path, user_override: Option<&str>) -> Result<Settings> {
    Config::load(data_dir).await?.resolve(data_dir, user_override)
}

/// Get the default data directory for tasksync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "ydun", "tasksync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
