//! CLI argument definitions for the weavestore binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::output::OutputFormat;

/// Storage backend type
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Backend {
    /// SQLite database (default, production-ready)
    Sqlite,
    /// PostgreSQL database (for shared deployments)
    Postgres,
    /// In-memory with JSON persistence (for development and ephemeral deployments)
    Inmemory,
}

/// Weave Basic Object storage maintenance tool
#[derive(Parser, Debug)]
#[command(name = "weavestore")]
#[command(about = "Weavestore: per-user Basic Object storage - maintenance CLI")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remove expired objects, once or periodically until interrupted
    Reap(ReapArgs),
    /// Show a user's collections and storage usage
    Info(InfoArgs),
    /// Manage user accounts
    #[command(subcommand)]
    User(UserCommands),
}

/// Backend selection shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct BackendConfig {
    /// Storage backend to use
    #[arg(short, long, default_value = "sqlite", env = "WEAVESTORE_BACKEND")]
    pub backend: Backend,

    /// Data directory for storage files.
    /// For SQLite: stores weavestore.db
    /// For InMemory: stores weavestore.json
    #[arg(short = 'D', long, env = "WEAVESTORE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// PostgreSQL connection URL (required when backend=postgres)
    #[arg(long, env = "WEAVESTORE_POSTGRES_URL")]
    pub postgres_url: Option<String>,
}

/// Arguments for the reap command
#[derive(clap::Args, Debug)]
pub struct ReapArgs {
    #[command(flatten)]
    pub backend_config: BackendConfig,

    /// Sweep every SECS seconds until interrupted. Without it, sweep once.
    #[arg(short, long, value_name = "SECS", env = "WEAVESTORE_REAP_INTERVAL")]
    pub interval: Option<u64>,
}

/// Arguments for the info command
#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub backend_config: BackendConfig,

    /// User whose collections to show
    #[arg(short, long)]
    pub user: String,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a new user
    Add(UserAddArgs),
    /// Delete a user with all of their collections
    Remove(UserRemoveArgs),
    /// List registered users
    List(UserListArgs),
}

#[derive(clap::Args, Debug)]
pub struct UserAddArgs {
    #[command(flatten)]
    pub backend_config: BackendConfig,

    /// Username
    pub name: String,

    /// Opaque credential stored for the identity layer
    #[arg(long)]
    pub password: String,

    #[arg(long, default_value = "")]
    pub email: String,
}

#[derive(clap::Args, Debug)]
pub struct UserRemoveArgs {
    #[command(flatten)]
    pub backend_config: BackendConfig,

    /// Username
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct UserListArgs {
    #[command(flatten)]
    pub backend_config: BackendConfig,
}
