/// Environment file management
///
/// Handles reading, writing, and validating the application's
/// line-oriented KEY=VALUE environment file (.env.local)

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::{DEFAULT_PORT, REQUIRED_ENV_KEYS};

#[derive(Debug, Clone)]
pub struct EnvValue {
    pub key: String,
    pub value: String,
    pub comment: Option<String>,
}

pub struct EnvFile {
    path: PathBuf,
    vars: HashMap<String, EnvValue>,
}

impl EnvFile {
    /// Load environment variables from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(anyhow!(
                "Environment file not found at {} (run: opsctl configure)",
                path.display()
            ));
        }

        let content = fs::read_to_string(&path)
            .context("Failed to read environment file")?;

        let mut vars = HashMap::new();
        let mut current_comment = None;

        for line in content.lines() {
            let line = line.trim();

            if line.starts_with('#') {
                current_comment = Some(line.trim_start_matches('#').trim().to_string());
                continue;
            }

            if line.is_empty() {
                current_comment = None;
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().to_string();
                let value = value.trim().to_string();

                vars.insert(
                    key.clone(),
                    EnvValue {
                        key: key.clone(),
                        value,
                        comment: current_comment.take(),
                    },
                );
            }
        }

        Ok(Self { path, vars })
    }

    /// Save back to file, preserving comments and key order. Keys set
    /// since load that have no line yet are appended at the end.
    pub fn save(&self) -> Result<()> {
        let mut lines = Vec::new();
        let mut written = std::collections::HashSet::new();

        let original = fs::read_to_string(&self.path)?;
        for line in original.lines() {
            let line_trimmed = line.trim();

            if line_trimmed.starts_with('#') || line_trimmed.is_empty() {
                lines.push(line.to_string());
            } else if let Some((key, _)) = line_trimmed.split_once('=') {
                let key = key.trim();
                if let Some(value) = self.vars.get(key) {
                    lines.push(format!("{}={}", key, value.value));
                    written.insert(key.to_string());
                } else {
                    lines.push(line.to_string());
                }
            }
        }

        for key in self.keys() {
            if !written.contains(&key) {
                if let Some(value) = self.vars.get(&key) {
                    lines.push(format!("{}={}", key, value.value));
                }
            }
        }

        fs::write(&self.path, lines.join("\n"))
            .context("Failed to write environment file")?;

        Ok(())
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.value.as_str())
    }

    /// Set a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        if let Some(existing) = self.vars.get_mut(&key) {
            existing.value = value;
        } else {
            self.vars.insert(
                key.clone(),
                EnvValue {
                    key: key.clone(),
                    value,
                    comment: None,
                },
            );
        }
    }

    /// Database connection string for pg_dump/psql
    pub fn database_url(&self) -> Result<&str> {
        self.get("POSTGRES_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("POSTGRES_URL not set in {}", self.path.display()))
    }

    /// Base listening port for health probes (default 3001)
    pub fn port(&self) -> u16 {
        self.get("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    }

    /// Validate configuration, returning a list of problems
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for key in REQUIRED_ENV_KEYS {
            match self.get(key) {
                None => errors.push(format!("{} is not set", key)),
                Some(v) if v.is_empty() => errors.push(format!("{} is empty", key)),
                Some(_) => {}
            }
        }

        if let Some(port) = self.get("PORT") {
            if port.parse::<u16>().is_err() {
                errors.push(format!("PORT must be a number, got: {}", port));
            }
        }

        errors
    }

    /// All configured keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.vars.keys().cloned().collect();
        keys.sort();
        keys
    }
}
