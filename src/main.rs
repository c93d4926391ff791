mod cli;
mod core;
mod utils;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::cli::{BackupCommands, Cli, Commands, ConfigCommands, DeployMethod, StopMethod};
use crate::core::restore::{restore, RestoreError};
use crate::core::{
    BackupManager, BackupOptions, EnvFile, HealthMonitor, LifecycleManager, SetupManager,
    StdinConfirm, SystemRunner,
};
use crate::utils::{format_bytes, AppConfig, DEFAULT_BACKUP_DIR, DEFAULT_ENV_FILE, DEFAULT_PORT};

/// Paths every command operates against, resolved once up front
struct Paths {
    root: PathBuf,
    env_file: PathBuf,
    backup_dir: PathBuf,
}

impl Paths {
    fn resolve(flag: Option<PathBuf>) -> Result<Self> {
        let root = resolve_project_root(flag)?;
        Ok(Self {
            env_file: root.join(DEFAULT_ENV_FILE),
            backup_dir: root.join(DEFAULT_BACKUP_DIR),
            root,
        })
    }
}

/// Project root: explicit flag, then env var, then saved config, then cwd
fn resolve_project_root(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = flag {
        if let Ok(mut config) = AppConfig::load() {
            let _ = config.set_project_root(root.clone());
        }
        return Ok(root);
    }

    if let Ok(root) = std::env::var("OPSCTL_PROJECT_ROOT") {
        let root = PathBuf::from(root);
        if let Ok(mut config) = AppConfig::load() {
            let _ = config.set_project_root(root.clone());
        }
        return Ok(root);
    }

    if let Ok(config) = AppConfig::load() {
        if let Some(root) = config.project_root {
            let root = PathBuf::from(root);
            if root.exists() {
                return Ok(root);
            }
        }
    }

    Ok(std::env::current_dir()?)
}

/// Port for health probes: configured PORT when the env file loads,
/// the default otherwise
fn probe_port(paths: &Paths) -> u16 {
    EnvFile::load(&paths.env_file)
        .map(|env| env.port())
        .unwrap_or(DEFAULT_PORT)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = Paths::resolve(cli.project_root)?;
    let runner = SystemRunner::new(&paths.root);

    let ok = match cli.command {
        Commands::Install => {
            let setup = SetupManager::new(&paths.root, &paths.env_file, &paths.backup_dir, &runner);
            setup.install()?;
            println!("{} Dependencies installed successfully!", "✓".green());
            true
        }
        Commands::Configure => {
            let setup = SetupManager::new(&paths.root, &paths.env_file, &paths.backup_dir, &runner);
            setup.configure(&StdinConfirm)?;
            true
        }
        Commands::ValidateEnv => {
            let setup = SetupManager::new(&paths.root, &paths.env_file, &paths.backup_dir, &runner);
            setup.validate()?
        }
        Commands::Config { command } => handle_config(&paths, command)?,
        Commands::Backup { command } => handle_backup(&paths, &runner, command)?,
        Commands::Restore { file, dry_run } => handle_restore(&paths, &runner, &file, dry_run),
        Commands::Doctor => {
            let setup = SetupManager::new(&paths.root, &paths.env_file, &paths.backup_dir, &runner);
            setup.doctor()?;
            true
        }
        Commands::Start { method } => handle_start(&paths, &runner, method).await?,
        Commands::Stop { method } => {
            let health = HealthMonitor::new(probe_port(&paths));
            let lifecycle = LifecycleManager::new(&paths.root, &runner, &health);
            lifecycle.stop(method)?
        }
        Commands::Restart { method } => handle_restart(&paths, &runner, method).await?,
        Commands::Status => {
            let health = HealthMonitor::new(probe_port(&paths));
            let lifecycle = LifecycleManager::new(&paths.root, &runner, &health);
            lifecycle.status().await?;
            true
        }
        Commands::Logs { follow, lines } => {
            let health = HealthMonitor::new(probe_port(&paths));
            let lifecycle = LifecycleManager::new(&paths.root, &runner, &health);
            lifecycle.logs(follow, lines)?;
            true
        }
        Commands::Monitor { interval } => {
            let health = HealthMonitor::new(probe_port(&paths));
            health.monitor(interval).await?;
            true
        }
        Commands::Debug => {
            let health = HealthMonitor::new(probe_port(&paths));
            let lifecycle = LifecycleManager::new(&paths.root, &runner, &health);
            lifecycle.debug()?;
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn handle_config(paths: &Paths, command: ConfigCommands) -> Result<bool> {
    match command {
        ConfigCommands::Get { key } => {
            let env = EnvFile::load(&paths.env_file)?;
            match env.get(&key) {
                Some(value) => {
                    println!("{}", value);
                    Ok(true)
                }
                None => {
                    println!("{} is not set", key);
                    Ok(false)
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut env = EnvFile::load(&paths.env_file)?;
            env.set(&key, value);
            env.save()?;
            println!("{} Updated {}", "✓".green(), key);
            Ok(true)
        }
        ConfigCommands::List => {
            let env = EnvFile::load(&paths.env_file)?;
            for key in env.keys() {
                println!("{}={}", key, env.get(&key).unwrap_or_default());
            }
            Ok(true)
        }
    }
}

fn handle_backup(paths: &Paths, runner: &SystemRunner, command: BackupCommands) -> Result<bool> {
    let manager = BackupManager::new(&paths.backup_dir, runner);

    match command {
        BackupCommands::Now {
            compress,
            s3_bucket,
            retention,
            strict,
        } => {
            let env = EnvFile::load(&paths.env_file)?;
            let db_url = env.database_url()?.to_string();

            let report = manager.create(
                &db_url,
                &BackupOptions {
                    compress,
                    s3_bucket,
                    retention_days: retention,
                    strict,
                },
            )?;

            println!(
                "{} Backup created: {}",
                "✓".green(),
                report.artifact.display()
            );
            for warning in report.warnings() {
                println!("{} {}", "⚠".yellow(), warning);
            }
            if !report.removed.is_empty() {
                println!("Pruned {} old backup(s)", report.removed.len());
            }
            Ok(true)
        }
        BackupCommands::List => {
            let records = manager.list()?;
            if records.is_empty() {
                println!("No backups found.");
                return Ok(true);
            }

            println!("Available backups:");
            for record in records {
                println!("  - {} ({})", record.name, format_bytes(record.size));
            }
            Ok(true)
        }
    }
}

fn handle_restore(paths: &Paths, runner: &SystemRunner, file: &Path, dry_run: bool) -> bool {
    match restore(file, dry_run, &paths.env_file, runner, &StdinConfirm) {
        Ok(()) => {
            if !dry_run {
                println!("{} Database restored successfully!", "✓".green());
            }
            true
        }
        Err(RestoreError::Cancelled) => {
            println!("Restore cancelled.");
            false
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            false
        }
    }
}

async fn handle_start(paths: &Paths, runner: &SystemRunner, method: DeployMethod) -> Result<bool> {
    let health = HealthMonitor::new(probe_port(paths));
    let lifecycle = LifecycleManager::new(&paths.root, runner, &health);

    let ok = lifecycle.start(method).await?;
    if ok {
        println!("{} Application started", "✓".green());
    } else {
        println!("{} Start failed", "✗".red());
    }
    Ok(ok)
}

async fn handle_restart(paths: &Paths, runner: &SystemRunner, method: StopMethod) -> Result<bool> {
    let health = HealthMonitor::new(probe_port(paths));
    let lifecycle = LifecycleManager::new(&paths.root, runner, &health);

    let ok = lifecycle.restart(method).await?;
    if ok {
        println!("{} Application restarted", "✓".green());
    } else {
        println!("{} Restart failed", "✗".red());
    }
    Ok(ok)
}
