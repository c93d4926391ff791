/// Environment setup and diagnostics
///
/// Handles dependency installation, environment file creation, and the
/// doctor report over external tooling.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::core::env_file::EnvFile;
use crate::core::exec::CommandRunner;
use crate::core::prompt::Confirm;
use crate::utils::{DEFAULT_PORT, ENV_TEMPLATE_FILE};

/// External tools doctor knows how to version-check
const TOOL_CHECKS: &[(&str, &str)] = &[
    ("Node.js", "node"),
    ("pnpm", "pnpm"),
    ("Docker", "docker"),
    ("PostgreSQL Client", "psql"),
];

pub struct SetupManager<'a> {
    root: PathBuf,
    env_path: PathBuf,
    backup_dir: PathBuf,
    runner: &'a dyn CommandRunner,
}

impl<'a> SetupManager<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        env_path: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            root: root.into(),
            env_path: env_path.into(),
            backup_dir: backup_dir.into(),
            runner,
        }
    }

    /// Install Node (and optional Python) dependencies
    pub fn install(&self) -> Result<()> {
        println!("Installing dependencies...");

        if !self.runner.which("pnpm") {
            println!("Installing pnpm...");
            let out = self.runner.run("npm", &["install", "-g", "pnpm"])?;
            if !out.status_ok {
                bail!("Failed to install pnpm: {}", out.stderr.trim());
            }
        }

        println!("Installing Node packages...");
        let out = self.runner.run("pnpm", &["install"])?;
        if !out.status_ok {
            bail!("pnpm install failed: {}", out.stderr.trim());
        }

        if self.root.join("requirements.txt").exists() {
            println!("Installing Python packages...");
            let out = self
                .runner
                .run("pip", &["install", "-r", "requirements.txt"])?;
            if !out.status_ok {
                bail!("pip install failed: {}", out.stderr.trim());
            }
        }

        Ok(())
    }

    /// Create the environment file from the template, or a starter one
    pub fn configure(&self, confirm: &dyn Confirm) -> Result<()> {
        println!("Configuring environment...");

        if self.env_path.exists() {
            let overwrite = confirm.confirm(&format!(
                "{} already exists. Overwrite? (y/N): ",
                self.env_path.display()
            ))?;
            if !overwrite {
                println!("Skipping configuration.");
                return Ok(());
            }
        }

        let template = self.root.join(ENV_TEMPLATE_FILE);
        if template.exists() {
            fs::copy(&template, &self.env_path)
                .context("Failed to copy environment template")?;
            println!("Created {} from template", self.env_path.display());
        } else {
            fs::write(&self.env_path, starter_template())
                .context("Failed to write environment file")?;
            println!("Created starter {}", self.env_path.display());
        }

        restrict_permissions(&self.env_path)?;
        println!("Secured file permissions (600)");
        println!("\nEdit {} and fill in your database URL and API keys", self.env_path.display());

        Ok(())
    }

    /// Check the environment file; returns whether it is valid
    pub fn validate(&self) -> Result<bool> {
        println!("Validating environment...");

        let env = match EnvFile::load(&self.env_path) {
            Ok(env) => env,
            Err(e) => {
                println!("{}", e);
                return Ok(false);
            }
        };

        let errors = env.validate();
        if errors.is_empty() {
            println!("Environment configuration valid!");
            return Ok(true);
        }

        println!("Configuration errors:");
        for error in &errors {
            println!("  - {}", error);
        }
        Ok(false)
    }

    /// Report on external tools, the env file, and the backup directory
    pub fn doctor(&self) -> Result<()> {
        println!("Running system diagnostics...\n");

        for (name, program) in TOOL_CHECKS {
            match self.runner.run(program, &["--version"]) {
                Ok(out) if out.status_ok => {
                    println!("✓ {}: {}", name, out.stdout.trim());
                }
                _ => println!("✗ {}: Not installed", name),
            }
        }

        println!("\nEnvironment file: {}", self.env_path.display());
        if self.env_path.exists() {
            println!("   ✓ Exists{}", permissions_note(&self.env_path));
        } else {
            println!("   ✗ Not found");
        }

        println!("\nBackup directory: {}", self.backup_dir.display());
        if self.backup_dir.exists() {
            let count = fs::read_dir(&self.backup_dir)?
                .filter_map(|e| e.ok())
                .filter(|e| {
                    let name = e.file_name().to_string_lossy().into_owned();
                    name.starts_with("backup-") && name.contains(".sql")
                })
                .count();
            println!("   ✓ {} backups found", count);
        } else {
            println!("   ⚠ Not created yet");
        }

        Ok(())
    }
}

fn starter_template() -> String {
    format!(
        "# Application environment configuration\n\
         \n\
         APP_BASE_URL=http://localhost:{port}\n\
         PORT={port}\n\
         \n\
         # Fill in your database URL and API keys\n\
         POSTGRES_URL=\n\
         API_KEY=\n",
        port = DEFAULT_PORT
    )
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .context("Failed to set file permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn permissions_note(path: &std::path::Path) -> String {
    use std::os::unix::fs::PermissionsExt;
    match fs::metadata(path) {
        Ok(meta) => format!(" (permissions: {:03o})", meta.permissions().mode() & 0o777),
        Err(_) => String::new(),
    }
}

#[cfg(not(unix))]
fn permissions_note(_path: &std::path::Path) -> String {
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exec::testing::FakeRunner;
    use crate::core::prompt::testing::ScriptedConfirm;
    use tempfile::TempDir;

    fn manager<'a>(dir: &TempDir, runner: &'a FakeRunner) -> SetupManager<'a> {
        SetupManager::new(
            dir.path(),
            dir.path().join(".env.local"),
            dir.path().join("backups"),
            runner,
        )
    }

    #[test]
    fn test_install_runs_pnpm() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        manager(&dir, &runner).install().unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0], vec!["pnpm", "install"]);
        assert!(!runner.invoked("npm"));
        assert!(!runner.invoked("pip"));
    }

    #[test]
    fn test_install_bootstraps_pnpm_when_missing() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new().without_tool("pnpm");
        manager(&dir, &runner).install().unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0], vec!["npm", "install", "-g", "pnpm"]);
        assert_eq!(calls[1], vec!["pnpm", "install"]);
    }

    #[test]
    fn test_install_picks_up_python_requirements() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "requests\n").unwrap();

        let runner = FakeRunner::new();
        manager(&dir, &runner).install().unwrap();

        assert!(runner.invoked("pip"));
    }

    #[test]
    fn test_install_fails_on_package_manager_error() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new().fail_on("pnpm");
        assert!(manager(&dir, &runner).install().is_err());
    }

    #[test]
    fn test_configure_writes_starter_template() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let confirm = ScriptedConfirm::new(true);

        manager(&dir, &runner).configure(&confirm).unwrap();

        let content = fs::read_to_string(dir.path().join(".env.local")).unwrap();
        assert!(content.contains("POSTGRES_URL="));
        assert!(content.contains("PORT=3001"));
        // Fresh file, no prompt needed
        assert!(!confirm.was_asked());
    }

    #[test]
    fn test_configure_copies_template_when_present() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env.example"), "POSTGRES_URL=template\n").unwrap();

        let runner = FakeRunner::new();
        let confirm = ScriptedConfirm::new(true);
        manager(&dir, &runner).configure(&confirm).unwrap();

        let content = fs::read_to_string(dir.path().join(".env.local")).unwrap();
        assert_eq!(content, "POSTGRES_URL=template\n");
    }

    #[test]
    fn test_configure_declined_overwrite_keeps_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env.local"), "POSTGRES_URL=keep\n").unwrap();

        let runner = FakeRunner::new();
        let confirm = ScriptedConfirm::new(false);
        manager(&dir, &runner).configure(&confirm).unwrap();

        assert!(confirm.was_asked());
        let content = fs::read_to_string(dir.path().join(".env.local")).unwrap();
        assert_eq!(content, "POSTGRES_URL=keep\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_configure_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let confirm = ScriptedConfirm::new(true);
        manager(&dir, &runner).configure(&confirm).unwrap();

        let mode = fs::metadata(dir.path().join(".env.local"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_validate_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        assert!(!manager(&dir, &runner).validate().unwrap());
    }

    #[test]
    fn test_validate_accepts_complete_env() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".env.local"),
            "POSTGRES_URL=postgres://localhost/app\nAPP_BASE_URL=http://localhost:3001\n",
        )
        .unwrap();

        let runner = FakeRunner::new();
        assert!(manager(&dir, &runner).validate().unwrap());
    }

    #[test]
    fn test_doctor_version_checks_every_tool() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new()
            .with_output("node", "v20.11.0\n")
            .with_output("psql", "psql (PostgreSQL) 16.1\n");

        manager(&dir, &runner).doctor().unwrap();

        for program in ["node", "pnpm", "docker", "psql"] {
            assert!(runner.invoked(program), "missing check for {}", program);
        }
    }
}
