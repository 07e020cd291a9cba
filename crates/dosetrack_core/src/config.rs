//! Process configuration and the demo-mode switch.
//!
//! # Responsibility
//! - Resolve the storage-mode switch and runtime knobs from environment
//!   variables once at startup.
//! - Hand collaborators an explicit configuration value; nothing else in
//!   the crate reads the environment.
//!
//! # Invariants
//! - Resolution never fails: invalid values fall back to safe defaults
//!   with a logged warning.
//! - A missing data directory means demo mode (ephemeral store); the
//!   switch is decided here once, not re-checked around the codebase.

use crate::logging::default_log_level;
use crate::schedule::dose_window::TakenResetRule;
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

/// Directory holding the persistent store; unset selects demo mode.
pub const ENV_DATA_DIR: &str = "DOSETRACK_DATA_DIR";
/// Directory for rolling log files; unset disables file logging.
pub const ENV_LOG_DIR: &str = "DOSETRACK_LOG_DIR";
/// Log level override (`trace|debug|info|warn|error`).
pub const ENV_LOG_LEVEL: &str = "DOSETRACK_LOG_LEVEL";
/// Taken reset rule override (`strict_slot|midnight_reset`).
pub const ENV_TAKEN_RESET: &str = "DOSETRACK_TAKEN_RESET";
/// Polling cadence for due-dose checks, in seconds.
pub const ENV_POLL_INTERVAL_SECS: &str = "DOSETRACK_POLL_INTERVAL_SECS";

/// File name of the persistent store inside the data directory.
pub const DB_FILE_NAME: &str = "dosetrack.sqlite3";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const MIN_POLL_INTERVAL_SECS: u64 = 5;
const MAX_POLL_INTERVAL_SECS: u64 = 3600;

/// Where medication records live for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// SQLite store under the configured data directory.
    Persistent(PathBuf),
    /// In-memory demo store; contents die with the process.
    Ephemeral,
}

impl StorageMode {
    /// Path of the SQLite file, when persistent.
    pub fn db_path(&self) -> Option<PathBuf> {
        match self {
            Self::Persistent(dir) => Some(dir.join(DB_FILE_NAME)),
            Self::Ephemeral => None,
        }
    }

    /// Whether this process runs in the demo fallback.
    pub fn is_demo(&self) -> bool {
        matches!(self, Self::Ephemeral)
    }
}

/// Startup configuration injected into collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub storage: StorageMode,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub taken_rule: TakenResetRule,
    pub poll_interval: Duration,
}

impl AppConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an injected variable lookup.
    ///
    /// Pure over `lookup`, so resolution rules are testable without
    /// touching the process environment.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let storage = match non_empty(lookup(ENV_DATA_DIR)) {
            Some(dir) => StorageMode::Persistent(PathBuf::from(dir)),
            None => {
                warn!(
                    "event=config_resolve module=config status=fallback reason=no_data_dir \
                     storage=ephemeral"
                );
                StorageMode::Ephemeral
            }
        };

        let log_dir = non_empty(lookup(ENV_LOG_DIR)).map(PathBuf::from);

        let log_level = non_empty(lookup(ENV_LOG_LEVEL))
            .unwrap_or_else(|| default_log_level().to_string());

        let taken_rule = match non_empty(lookup(ENV_TAKEN_RESET)) {
            Some(value) => value.parse().unwrap_or_else(|err| {
                warn!("event=config_resolve module=config status=fallback reason={err}");
                TakenResetRule::default()
            }),
            None => TakenResetRule::default(),
        };

        let poll_interval = match non_empty(lookup(ENV_POLL_INTERVAL_SECS)) {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) => Duration::from_secs(
                    secs.clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS),
                ),
                Err(_) => {
                    warn!(
                        "event=config_resolve module=config status=fallback \
                         reason=invalid_poll_interval value={value}"
                    );
                    Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)
                }
            },
            None => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        };

        Self {
            storage,
            log_dir,
            log_level,
            taken_rule,
            poll_interval,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
