//! Dashboard server configuration read from the environment.

use std::env;
use std::net::SocketAddr;

use crate::endpoints::DEFAULT_BACKEND_URL;

pub const DEFAULT_DASHBOARD_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub bind_addr: SocketAddr,
    pub backend_url: String,
    /// Used for the optional pipeline run at startup.
    pub initial_reference_date: Option<String>,
    pub run_on_start: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_DASHBOARD_ADDR
                .parse()
                .expect("default dashboard address should parse"),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            initial_reference_date: None,
            run_on_start: false,
        }
    }
}

/// Unparseable values keep their defaults.
pub fn dashboard_config_from_env() -> DashboardConfig {
    let mut config = DashboardConfig::default();

    if let Ok(raw) = env::var("FRDASH_DASHBOARD_ADDR") {
        if let Ok(addr) = raw.trim().parse() {
            config.bind_addr = addr;
        }
    }

    if let Ok(raw) = env::var("FRDASH_BACKEND_URL") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.backend_url = trimmed.to_string();
        }
    }

    if let Ok(raw) = env::var("FRDASH_REFERENCE_DATE") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.initial_reference_date = Some(trimmed.to_string());
        }
    }

    if let Ok(raw) = env::var("FRDASH_RUN_ON_START") {
        if let Some(parsed) = parse_bool(&raw) {
            config.run_on_start = parsed;
        }
    }

    config
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test_env {
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    pub(crate) fn with_env_vars<R>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
        let _guard = env_lock().lock().expect("env lock should not be poisoned");
        let previous: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(key, _)| ((*key).to_string(), env::var(key).ok()))
            .collect();

        for (key, value) in vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        let output = f();

        for (key, value) in previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        output
    }
}
