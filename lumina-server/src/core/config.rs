/// Server configuration
///
/// # Environment variables
///
/// Every field can be overridden through the environment:
///
/// | Variable | Default | Purpose |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/lumina | working directory (database file) |
/// | LOG_LEVEL | info | tracing filter level |
/// | LOG_DIR | (unset) | daily rolling log files when set |
/// | SWEEP_INTERVAL_SECS | 3600 | expiration sweep period |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | graceful shutdown limit |
/// | ENVIRONMENT | development | development \| staging \| production |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/lumina SWEEP_INTERVAL_SECS=600 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the SQLite database
    pub work_dir: String,
    /// Log verbosity passed to the tracing subscriber
    pub log_level: String,
    /// Directory for rolling log files; stdout only when unset
    pub log_dir: Option<String>,
    /// Seconds between expiration sweep passes
    pub sweep_interval_secs: u64,
    /// How long shutdown waits for background tasks (milliseconds)
    pub shutdown_timeout_ms: u64,
    /// Runtime environment: development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/lumina".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Override the working directory, keeping everything else from the
    /// environment. Mostly for tests.
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// Path of the SQLite database file under the working directory
    pub fn db_path(&self) -> String {
        format!("{}/lumina.db", self.work_dir)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
