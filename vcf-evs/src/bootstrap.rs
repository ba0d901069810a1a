//! Process startup shared by both binaries.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing::debug;
use uuid::Uuid;

use evs_config::{ConfigManager, DEFAULT_CONFIG_PATH};
use evs_core::evs_error_hint;
use evs_logging::{init_subscriber, LogSettings, LogSetupError, WorkerGuard};
use evs_messages::{msg, MESSAGES};

/// Request ID for this execution, attached to the root span of every run.
static REQUEST_ID: OnceLock<String> = OnceLock::new();

pub fn request_id() -> &'static str {
    REQUEST_ID.get_or_init(|| Uuid::new_v4().to_string())
}

/// Resolves subscriber settings from `LOG_*` variables and CLI flags.
///
/// User-facing output goes through the message macros, so tracing stays at
/// `warn` unless `--debug` or `LOG_LEVEL` asks for more.
pub fn log_settings(debug: bool, log_file: Option<&str>) -> LogSettings {
    let mut settings = LogSettings::from_env();
    if debug {
        settings = settings.with_level("debug");
    } else if env::var("LOG_LEVEL").is_err() {
        settings = settings.with_level("warn");
    }
    if let Some(file) = log_file {
        settings = settings.with_log_file(file);
    }
    settings
}

pub fn init_logging(
    debug: bool,
    log_file: Option<&str>,
) -> std::result::Result<Option<WorkerGuard>, LogSetupError> {
    init_subscriber(&log_settings(debug, log_file))
}

/// Loads the configuration file, pointing the user at the fix when it is
/// missing.
pub fn load_config(path: Option<&Path>) -> Result<ConfigManager> {
    let resolved = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if !resolved.is_file() {
        evs_error_hint!(
            "{}",
            msg!(
                MESSAGES.common_config_not_found_hint,
                path = resolved.display()
            )
        );
    }

    let config = ConfigManager::load(Some(&resolved))
        .with_context(|| format!("Failed to load configuration from {}", resolved.display()))?;
    debug!(
        "{}",
        msg!(MESSAGES.common_config_loaded, path = config.path().display())
    );
    Ok(config)
}
