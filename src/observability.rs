//! Logging setup for the dashboard server.
//!
//! Dependency crates (hyper, reqwest, rustls) stay at `warn`; the dashboard's
//! own targets default to `info`. `FRDASH_LOG_LEVEL` takes either a bare
//! level, applied to the dashboard targets only, or a full `EnvFilter`
//! directive list used verbatim.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::parse_bool;

/// Log targets owned by this crate: the library and the server binary.
const DASHBOARD_TARGETS: [&str; 2] = ["frdash", "dashboard_server"];
const DEPENDENCY_LEVEL: &str = "warn";

pub const DEFAULT_LOG_FILTER: &str = "warn,frdash=info,dashboard_server=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    /// Single-line output for terminals tailing the server.
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directives.
    pub filter: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

/// Expands a bare level into directives scoped to the dashboard targets.
/// Anything containing `=` or `,` is taken as a directive list.
pub fn dashboard_log_filter(level_or_directives: &str) -> String {
    let raw = level_or_directives.trim();
    if raw.contains('=') || raw.contains(',') {
        return raw.to_string();
    }
    let mut filter = DEPENDENCY_LEVEL.to_string();
    for target in DASHBOARD_TARGETS {
        filter.push_str(&format!(",{target}={raw}"));
    }
    filter
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn logging_config_from_env() -> LoggingConfig {
    let mut config = LoggingConfig::default();

    if let Ok(level) = env::var("FRDASH_LOG_LEVEL") {
        let trimmed = level.trim();
        if !trimmed.is_empty() {
            config.filter = dashboard_log_filter(trimmed);
        }
    }

    if let Ok(format) = env::var("FRDASH_LOG_FORMAT") {
        if let Some(parsed) = parse_log_format(&format) {
            config.format = parsed;
        }
    }

    if let Ok(include_target) = env::var("FRDASH_LOG_TARGET") {
        if let Some(parsed) = parse_bool(&include_target) {
            config.include_target = parsed;
        }
    }

    config
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter = EnvFilter::try_new(&config.filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_ansi(!matches!(config.format, LogFormat::Json));

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(builder.compact().finish())?
        }
    }

    Ok(())
}

pub fn log_app_start(config: &LoggingConfig) {
    info!(
        component = "dashboard_server",
        event = "app.start",
        log_filter = %config.filter,
        log_format = ?config.format,
        include_target = config.include_target
    );
}

pub fn log_app_bind(bound_addr: SocketAddr) {
    info!(
        component = "dashboard_server",
        event = "app.bind",
        bind_addr = %bound_addr,
        route = "/dashboard"
    );
}

pub fn log_backend_selected(base_url: &str, initial_reference_date: Option<&str>) {
    match initial_reference_date {
        Some(reference_date) => info!(
            component = "dashboard_server",
            event = "backend.selected",
            base_url,
            reference_date
        ),
        None => info!(
            component = "dashboard_server",
            event = "backend.selected",
            base_url
        ),
    }
}

fn parse_log_format(raw: &str) -> Option<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" => Some(LogFormat::Pretty),
        "compact" => Some(LogFormat::Compact),
        _ => None,
    }
}
