/// CLI argument parsing and command handling

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "opsctl")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Project root directory (defaults to saved config, then current dir)
    #[arg(long, global = true)]
    pub project_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install project dependencies
    Install,

    /// Create the environment file from a template
    Configure,

    /// Validate the environment file
    ValidateEnv,

    /// Read or modify environment file values
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Database backup operations
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Restore the database from a backup
    Restore {
        /// Backup file to restore
        #[arg(long)]
        file: PathBuf,

        /// Report what would be done without touching the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Run system diagnostics
    Doctor,

    /// Start the application
    Start {
        /// Deployment method
        #[arg(value_enum, default_value = "traditional")]
        method: DeployMethod,
    },

    /// Stop the application
    Stop {
        /// Deployment method
        #[arg(value_enum, default_value = "traditional")]
        method: StopMethod,
    },

    /// Restart the application
    Restart {
        /// Deployment method
        #[arg(value_enum, default_value = "traditional")]
        method: StopMethod,
    },

    /// Check application status
    Status,

    /// View application logs
    Logs {
        /// Follow log output
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "100")]
        lines: usize,
    },

    /// Monitor application health continuously
    Monitor {
        /// Check interval in seconds
        #[arg(long, default_value = "60")]
        interval: u64,
    },

    /// Run the application in debug mode (foreground)
    Debug,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show a configured value
    Get { key: String },

    /// Set a value and save the file
    Set { key: String, value: String },

    /// List configured keys and values
    List,
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a backup now
    Now {
        /// Compress the dump with gzip
        #[arg(long)]
        compress: bool,

        /// Upload the artifact to this S3 bucket
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Retention period in days for old backups
        #[arg(long, default_value = "30")]
        retention: u64,

        /// Treat compression/upload failures as overall failure
        #[arg(long)]
        strict: bool,
    },

    /// List available backups
    List,
}

/// Deployment strategies for start
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeployMethod {
    Traditional,
    Docker,
    Kubernetes,
}

/// Stop/restart only apply to methods the controller owns a handle to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StopMethod {
    Traditional,
    Docker,
}

impl From<StopMethod> for DeployMethod {
    fn from(m: StopMethod) -> Self {
        match m {
            StopMethod::Traditional => DeployMethod::Traditional,
            StopMethod::Docker => DeployMethod::Docker,
        }
    }
}
