/// Application constants and deployment surface definitions

/// Process/service name used for pm2, docker-compose, and the k8s app label
pub const APP_NAME: &str = "app";

/// Kubernetes namespace for orchestrated deployments
pub const K8S_NAMESPACE: &str = "app";

/// Default base listening port when PORT is not configured
pub const DEFAULT_PORT: u16 = 3001;

/// Environment file name, relative to the project root
pub const DEFAULT_ENV_FILE: &str = ".env.local";

/// Environment file template, relative to the project root
pub const ENV_TEMPLATE_FILE: &str = ".env.example";

/// Backup directory name, relative to the project root
pub const DEFAULT_BACKUP_DIR: &str = "backups";

/// Keys that must be present and non-empty for the app to run
pub const REQUIRED_ENV_KEYS: &[&str] = &["POSTGRES_URL", "APP_BASE_URL"];

/// Health-wait loop defaults: attempts and seconds between them
pub const HEALTH_WAIT_ATTEMPTS: u32 = 30;
pub const HEALTH_WAIT_INTERVAL_SECS: u64 = 2;

/// Per-probe HTTP timeout in seconds
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Backup artifact name prefix/suffixes
pub const BACKUP_PREFIX: &str = "backup-";
pub const BACKUP_SUFFIX: &str = ".sql";
pub const COMPRESSED_SUFFIX: &str = ".sql.gz";
