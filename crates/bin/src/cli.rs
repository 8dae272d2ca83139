//! CLI argument definitions for the Roster binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Storage backend type
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Backend {
    /// SQLite database (default)
    Sqlite,
    /// PostgreSQL database (for shared deployments)
    Postgres,
    /// In-memory with JSON persistence (for development)
    Inmemory,
}

/// Roster operator tool
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "Roster: per-user uploads, privileges and submission statistics")]
#[command(version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub backend_config: BackendConfig,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where state lives.
#[derive(clap::Args, Debug, Clone)]
pub struct BackendConfig {
    /// Storage backend to use
    #[arg(short, long, default_value = "sqlite", env = "ROSTER_BACKEND", global = true)]
    pub backend: Backend,

    /// Data directory for storage files.
    /// For SQLite: stores roster.db
    /// For InMemory: stores roster.json
    #[arg(short = 'D', long, env = "ROSTER_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// PostgreSQL connection URL (required when backend=postgres)
    #[arg(long, env = "ROSTER_POSTGRES_URL", global = true)]
    pub postgres_url: Option<String>,

    /// JSON configuration file (upload dir, quota, normalizer, lock timeout)
    #[arg(short, long, env = "ROSTER_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, inspect and delete accounts
    #[command(subcommand)]
    Account(AccountCommand),
    /// Manage a user's uploaded files
    #[command(subcommand)]
    Files(FilesCommand),
    /// Read and reconcile privilege grants
    #[command(subcommand)]
    Privileges(PrivilegesCommand),
    /// Submission statistics
    #[command(subcommand)]
    Stats(StatsCommand),
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Create a new account
    Create {
        username: String,
        #[arg(long)]
        email: Option<String>,
        /// Grant the admin flag
        #[arg(long)]
        admin: bool,
    },
    /// Show an account with its tracked uploads
    Show { user_id: i64 },
    /// Look an account up by username or email
    Find {
        #[arg(long, conflicts_with = "email", required_unless_present = "email")]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Delete an account
    Destroy { user_id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum FilesCommand {
    /// List the files in a user's upload directory
    List { user_id: i64 },
    /// Move a local file into a user's upload directory
    Upload {
        user_id: i64,
        /// File to move; it is consumed by the upload
        source: PathBuf,
        /// Name to store the file under (defaults to the source's file name)
        #[arg(long)]
        name: Option<String>,
        /// Skip the configured quota
        #[arg(long)]
        no_limit: bool,
    },
    /// Delete one of a user's files
    Delete { user_id: i64, filename: String },
}

#[derive(Subcommand, Debug)]
pub enum PrivilegesCommand {
    /// Print a user's privileges
    Get { user_id: i64 },
    /// Replace a user's privileges with the given set
    Set {
        user_id: i64,
        privileges: Vec<String>,
    },
    /// Check whether a user holds a privilege
    Check { user_id: i64, privilege: String },
}

#[derive(Subcommand, Debug)]
pub enum StatsCommand {
    /// Recompute the accepted/submitted counters on the account
    Refresh { user_id: i64 },
    /// Print the ids of problems the user solved
    Accepted { user_id: i64 },
    /// Print the per-status histogram
    Histogram { user_id: i64 },
    /// Print the language of the most recent submission
    Language { user_id: i64 },
}
