/// Database restore from a backup artifact
///
/// Validates the artifact, gates on operator confirmation, decompresses
/// gzip archives to a sibling file (keeping the archive), and streams
/// the SQL into psql.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::env_file::EnvFile;
use crate::core::exec::CommandRunner;
use crate::core::prompt::Confirm;

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("Backup file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Restore cancelled")]
    Cancelled,

    #[error("Decompression failed: {0}")]
    DecompressFailed(String),

    #[error("psql exited with failure: {0}")]
    ClientFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub fn restore(
    file: &Path,
    dry_run: bool,
    env_path: &Path,
    runner: &dyn CommandRunner,
    confirm: &dyn Confirm,
) -> Result<(), RestoreError> {
    // Existence is checked before the dry-run short-circuit
    if !file.exists() {
        return Err(RestoreError::NotFound(file.to_path_buf()));
    }

    if dry_run {
        println!("Dry run - would restore from: {}", file.display());
        return Ok(());
    }

    let confirmed = confirm.confirm(
        "WARNING: This will overwrite the current database!\nContinue? (yes/NO): ",
    )?;
    if !confirmed {
        return Err(RestoreError::Cancelled);
    }

    let env = EnvFile::load(env_path)?;
    let db_url = env.database_url().map_err(RestoreError::Other)?.to_string();

    let sql_path = if file.extension().is_some_and(|e| e == "gz") {
        println!("Decompressing backup...");
        let path_arg = file.to_string_lossy().into_owned();
        // -k keeps the compressed archive in place
        let out = runner.run("gunzip", &["-k", &path_arg])?;
        if !out.status_ok {
            return Err(RestoreError::DecompressFailed(out.stderr.trim().to_string()));
        }
        file.with_extension("")
    } else {
        file.to_path_buf()
    };

    println!("Restoring database from {}...", sql_path.display());
    let out = runner.run_stdin_file("psql", &[&db_url], &sql_path)?;
    if !out.status_ok {
        return Err(RestoreError::ClientFailed(out.stderr.trim().to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exec::testing::FakeRunner;
    use crate::core::prompt::testing::ScriptedConfirm;
    use std::fs;
    use tempfile::TempDir;

    fn env_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join(".env.local");
        fs::write(&path, "POSTGRES_URL=postgres://localhost/app\n").unwrap();
        path
    }

    #[test]
    fn test_missing_artifact_fails_fast() {
        let dir = TempDir::new().unwrap();
        let env = env_file(&dir);
        let runner = FakeRunner::new();
        let confirm = ScriptedConfirm::new(true);

        let result = restore(&dir.path().join("gone.sql"), false, &env, &runner, &confirm);
        assert!(matches!(result, Err(RestoreError::NotFound(_))));
        assert!(!confirm.was_asked());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_missing_artifact_fails_even_in_dry_run() {
        let dir = TempDir::new().unwrap();
        let env = env_file(&dir);
        let runner = FakeRunner::new();
        let confirm = ScriptedConfirm::new(true);

        let result = restore(&dir.path().join("gone.sql"), true, &env, &runner, &confirm);
        assert!(matches!(result, Err(RestoreError::NotFound(_))));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let env = env_file(&dir);
        let artifact = dir.path().join("backup-2024-01-01-00-00.sql");
        fs::write(&artifact, "-- dump\n").unwrap();

        let runner = FakeRunner::new();
        let confirm = ScriptedConfirm::new(true);

        restore(&artifact, true, &env, &runner, &confirm).unwrap();
        assert!(!confirm.was_asked());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_declined_confirmation_cancels() {
        let dir = TempDir::new().unwrap();
        let env = env_file(&dir);
        let artifact = dir.path().join("backup-2024-01-01-00-00.sql");
        fs::write(&artifact, "-- dump\n").unwrap();

        let runner = FakeRunner::new();
        let confirm = ScriptedConfirm::new(false);

        let result = restore(&artifact, false, &env, &runner, &confirm);
        assert!(matches!(result, Err(RestoreError::Cancelled)));
        assert!(confirm.was_asked());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_plain_artifact_streams_into_psql() {
        let dir = TempDir::new().unwrap();
        let env = env_file(&dir);
        let artifact = dir.path().join("backup-2024-01-01-00-00.sql");
        fs::write(&artifact, "-- dump\n").unwrap();

        let runner = FakeRunner::new();
        let confirm = ScriptedConfirm::new(true);

        restore(&artifact, false, &env, &runner, &confirm).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], "psql");
        assert_eq!(calls[0][1], "postgres://localhost/app");
        assert!(calls[0][2].ends_with("backup-2024-01-01-00-00.sql"));
    }

    #[test]
    fn test_gz_artifact_decompresses_to_sibling_and_keeps_archive() {
        let dir = TempDir::new().unwrap();
        let env = env_file(&dir);
        let artifact = dir.path().join("backup-2024-01-01-00-00.sql.gz");
        fs::write(&artifact, b"\x1f\x8b").unwrap();

        let runner = FakeRunner::new();
        let confirm = ScriptedConfirm::new(true);

        restore(&artifact, false, &env, &runner, &confirm).unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0][0], "gunzip");
        assert_eq!(calls[0][1], "-k");
        assert!(calls[0][2].ends_with(".sql.gz"));

        assert_eq!(calls[1][0], "psql");
        assert!(calls[1][2].ends_with("backup-2024-01-01-00-00.sql"));
        assert!(!calls[1][2].ends_with(".gz"));

        // The archive stays in place
        assert!(artifact.exists());
    }

    #[test]
    fn test_client_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let env = env_file(&dir);
        let artifact = dir.path().join("backup-2024-01-01-00-00.sql");
        fs::write(&artifact, "-- dump\n").unwrap();

        let runner = FakeRunner::new().fail_on("psql");
        let confirm = ScriptedConfirm::new(true);

        let result = restore(&artifact, false, &env, &runner, &confirm);
        assert!(matches!(result, Err(RestoreError::ClientFailed(_))));
    }
}
