pub mod backup;
pub mod env_file;
pub mod exec;
pub mod health;
pub mod lifecycle;
pub mod prompt;
pub mod restore;
pub mod setup;

pub use backup::{BackupManager, BackupOptions};
pub use env_file::EnvFile;
pub use exec::{CommandRunner, SystemRunner};
pub use health::HealthMonitor;
pub use lifecycle::LifecycleManager;
pub use prompt::{Confirm, StdinConfirm};
pub use setup::SetupManager;
