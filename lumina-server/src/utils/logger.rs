//! Tracing setup
//!
//! Console output by default; pass a directory to also write daily-rotated
//! files. The level is an `EnvFilter` directive string (`info`,
//! `debug,sqlx=warn`, ...) and falls back to `info` when unparsable.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info";

/// Console-only logger with the default level
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Logger with an optional level directive and optional log directory
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let directive = log_level.unwrap_or(DEFAULT_DIRECTIVE);
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    if let Some(dir) = log_dir
        && std::fs::create_dir_all(dir).is_ok()
    {
        let appender = tracing_appender::rolling::daily(dir, "lumina.log");
        builder.with_ansi(false).with_writer(appender).init();
        return;
    }

    builder.init();
}
