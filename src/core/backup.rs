/// Database backup management
///
/// Creates timestamped pg_dump artifacts, optionally compresses and
/// uploads them, lists what exists, and prunes artifacts past the
/// retention window.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::core::exec::CommandRunner;
use crate::utils::{backup_timestamp, BACKUP_PREFIX, BACKUP_SUFFIX, COMPRESSED_SUFFIX};

/// One backup artifact on disk
#[derive(Debug, Clone)]
pub struct BackupRecord {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
    pub compressed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BackupOptions {
    pub compress: bool,
    pub s3_bucket: Option<String>,
    pub retention_days: u64,
    /// Treat compression/upload failures as overall failure
    pub strict: bool,
}

/// Per-stage outcome of one backup run
#[derive(Debug)]
pub struct BackupReport {
    pub artifact: PathBuf,
    pub compressed: bool,
    pub compress_error: Option<String>,
    pub upload_error: Option<String>,
    pub removed: Vec<String>,
}

impl BackupReport {
    pub fn warnings(&self) -> Vec<&str> {
        self.compress_error
            .iter()
            .chain(self.upload_error.iter())
            .map(|s| s.as_str())
            .collect()
    }
}

pub struct BackupManager<'a> {
    backup_dir: PathBuf,
    runner: &'a dyn CommandRunner,
}

/// Whether a file name matches the backup artifact pattern
fn is_backup_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX)
        && (name.ends_with(BACKUP_SUFFIX) || name.ends_with(COMPRESSED_SUFFIX))
}

impl<'a> BackupManager<'a> {
    pub fn new(backup_dir: impl Into<PathBuf>, runner: &'a dyn CommandRunner) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            runner,
        }
    }

    /// Run the backup pipeline: dump, then optional compress/upload,
    /// then the retention sweep.
    ///
    /// Only a dump failure aborts. Compression and upload failures are
    /// recorded in the report and, unless `strict` is set, do not flip
    /// the overall result.
    pub fn create(&self, db_url: &str, opts: &BackupOptions) -> Result<BackupReport> {
        fs::create_dir_all(&self.backup_dir)
            .context("Failed to create backup directory")?;

        let name = format!("{}{}{}", BACKUP_PREFIX, backup_timestamp(), BACKUP_SUFFIX);
        let dump_path = self.backup_dir.join(&name);

        println!("Creating backup: {}", dump_path.display());
        // Stdout streams byte-for-byte into the artifact; dumps are not
        // guaranteed to be UTF-8 and must never pass through a String
        let dump = match self.runner.run_to_file("pg_dump", &[db_url], &dump_path) {
            Ok(out) => out,
            Err(e) => {
                let _ = fs::remove_file(&dump_path);
                return Err(e);
            }
        };
        if !dump.status_ok {
            // A failed dump must not leave a partial artifact behind
            let _ = fs::remove_file(&dump_path);
            bail!("pg_dump failed: {}", dump.stderr.trim());
        }

        let mut artifact = dump_path.clone();
        let mut compressed = false;
        let mut compress_error = None;

        if opts.compress {
            println!("Compressing backup...");
            let path_arg = artifact.to_string_lossy().into_owned();
            let gzip = self.runner.run("gzip", &[&path_arg])?;
            if gzip.status_ok {
                artifact = PathBuf::from(format!("{}.gz", path_arg));
                compressed = true;
            } else {
                compress_error = Some(format!("gzip failed: {}", gzip.stderr.trim()));
            }
        }

        let mut upload_error = None;
        if let Some(bucket) = &opts.s3_bucket {
            let file_name = artifact
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let dest = format!("s3://{}/{}", bucket, file_name);
            println!("Uploading to S3: {}", dest);

            let path_arg = artifact.to_string_lossy().into_owned();
            let upload = self.runner.run("aws", &["s3", "cp", &path_arg, &dest])?;
            if !upload.status_ok {
                upload_error = Some(format!("S3 upload failed: {}", upload.stderr.trim()));
            }
        }

        // Sweep runs regardless of how the optional stages went
        let removed = self.sweep_excluding(opts.retention_days, &[dump_path, artifact.clone()])?;

        let report = BackupReport {
            artifact,
            compressed,
            compress_error,
            upload_error,
            removed,
        };

        if opts.strict && !report.warnings().is_empty() {
            bail!("Backup completed with errors: {}", report.warnings().join("; "));
        }

        Ok(report)
    }

    /// Delete artifacts with a modification time strictly older than
    /// `now - retention_days`. Idempotent; a missing directory is a no-op.
    pub fn sweep(&self, retention_days: u64) -> Result<Vec<String>> {
        self.sweep_excluding(retention_days, &[])
    }

    fn sweep_excluding(&self, retention_days: u64, exclude: &[PathBuf]) -> Result<Vec<String>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let window = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60));
        let cutoff = SystemTime::now()
            .checked_sub(window)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = Vec::new();

        for entry in fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            if !is_backup_name(&name) {
                continue;
            }
            if exclude.iter().any(|e| e == &path) {
                continue;
            }

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(m) => m,
                Err(_) => continue,
            };

            if modified < cutoff {
                println!("Removing old backup: {}", name);
                // Best-effort per file: a failed unlink must not stop the scan
                match fs::remove_file(&path) {
                    Ok(()) => removed.push(name),
                    Err(e) => eprintln!("Failed to remove {}: {}", name, e),
                }
            }
        }

        Ok(removed)
    }

    /// List artifacts, newest first (filename descending)
    pub fn list(&self) -> Result<Vec<BackupRecord>> {
        let mut records = Vec::new();

        if !self.backup_dir.exists() {
            return Ok(records);
        }

        for entry in fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();

            if !is_backup_name(&name) {
                continue;
            }

            let metadata = entry.metadata()?;
            records.push(BackupRecord {
                compressed: name.ends_with(".gz"),
                size: metadata.len(),
                modified: metadata.modified()?,
                name,
            });
        }

        records.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(records)
    }
}
