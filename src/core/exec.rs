/// Narrow process-execution seam
///
/// Every external tool invocation (pg_dump, gzip, aws, pnpm, pm2,
/// docker-compose, kubectl) goes through this trait so tests can
/// substitute a fake runner and assert on the exact argv.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Captured result of a finished external process
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub status_ok: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status_ok: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            status_ok: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

pub trait CommandRunner {
    /// Run to completion, capturing stdout/stderr
    fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput>;

    /// Run with stdout streamed byte-for-byte into `dest`, capturing stderr.
    /// The returned stdout is empty.
    fn run_to_file(&self, program: &str, args: &[&str], dest: &Path) -> Result<CmdOutput>;

    /// Run with stdin connected to a file, capturing stdout/stderr
    fn run_stdin_file(&self, program: &str, args: &[&str], input: &Path) -> Result<CmdOutput>;

    /// Run with inherited stdio (interactive/streaming tools); returns success flag
    fn run_streaming(&self, program: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<bool>;

    /// Start a detached child and return without waiting
    fn spawn_detached(&self, program: &str, args: &[&str]) -> Result<()>;

    /// Whether a program is available on PATH
    fn which(&self, program: &str) -> bool;
}

/// CommandRunner backed by std::process, running in a fixed working directory
pub struct SystemRunner {
    cwd: PathBuf,
}

impl SystemRunner {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput> {
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .output()
            .with_context(|| format!("Failed to run {}", program))?;

        Ok(CmdOutput {
            status_ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_to_file(&self, program: &str, args: &[&str], dest: &Path) -> Result<CmdOutput> {
        let file = std::fs::File::create(dest)
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let child = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to run {}", program))?;

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for {}", program))?;

        Ok(CmdOutput {
            status_ok: output.status.success(),
            stdout: String::new(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_stdin_file(&self, program: &str, args: &[&str], input: &Path) -> Result<CmdOutput> {
        let file = std::fs::File::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::from(file))
            .output()
            .with_context(|| format!("Failed to run {}", program))?;

        Ok(CmdOutput {
            status_ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_streaming(&self, program: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<bool> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(&self.cwd);
        for (key, value) in envs {
            cmd.env(key, value);
        }

        let status = cmd
            .status()
            .with_context(|| format!("Failed to run {}", program))?;

        Ok(status.success())
    }

    fn spawn_detached(&self, program: &str, args: &[&str]) -> Result<()> {
        Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", program))?;

        Ok(())
    }

    fn which(&self, program: &str) -> bool {
        Command::new("which")
            .arg(program)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeRunner;
    use super::*;

    #[test]
    fn test_fake_runner_records_argv() {
        let runner = FakeRunner::new();
        runner.run("pg_dump", &["postgres://db"]).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["pg_dump", "postgres://db"]);
    }

    #[test]
    fn test_fake_runner_scripted_failure() {
        let runner = FakeRunner::new().fail_on("gzip");
        let out = runner.run("gzip", &["backup.sql"]).unwrap();
        assert!(!out.status_ok);

        let out = runner.run("aws", &["s3", "cp"]).unwrap();
        assert!(out.status_ok);
    }

    #[test]
    fn test_fake_runner_writes_raw_bytes_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("out.sql");

        let runner = FakeRunner::new().with_output_bytes("pg_dump", b"COPY t;\n\xff\n");
        let out = runner.run_to_file("pg_dump", &["postgres://db"], &dest).unwrap();

        assert!(out.status_ok);
        assert_eq!(std::fs::read(&dest).unwrap(), b"COPY t;\n\xff\n");
        assert!(runner.calls()[0].last().unwrap().starts_with('>'));
    }

    #[test]
    fn test_fake_runner_tool_presence() {
        let runner = FakeRunner::new().without_tool("pm2");
        assert!(!runner.which("pm2"));
        assert!(runner.which("docker-compose"));
    }
}
