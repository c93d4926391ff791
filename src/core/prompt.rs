/// Injected operator confirmation
///
/// Destructive operations ask through this trait so tests can supply
/// canned answers instead of driving a terminal.

use anyhow::{Context, Result};
use std::io::{self, Write};

pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Reads a line from stdin; "y" or "yes" (case-insensitive) confirms
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        print!("{}", prompt);
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut answer = String::new();
        io::stdin()
            .read_line(&mut answer)
            .context("Failed to read confirmation")?;

        let answer = answer.trim().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}
