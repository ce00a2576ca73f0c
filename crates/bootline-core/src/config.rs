//! Process configuration read from the environment.
//!
//! | Variable                        | Effect                                         |
//! |---------------------------------|------------------------------------------------|
//! | `BOOTLINE_DEBUG`                | full error chains, backtraces, DEBUG logging   |
//! | `BOOTLINE_LOG`                  | tracing filter directive (else `RUST_LOG`)     |
//! | `BOOTLINE_LOG_FORMAT`           | `json` for newline-delimited JSON logs         |
//! | `BOOTLINE_REPORTING_DSN`        | telemetry endpoint, telemetry off when unset   |
//! | `BOOTLINE_REPORTING_TIMEOUT_MS` | bound on reporter initialisation               |
//! | `BOOTLINE_ERROR_REPORT_FILE`    | enables the file-backed error-report plugin    |

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BootError, Result};

pub const ENV_DEBUG: &str = "BOOTLINE_DEBUG";
pub const ENV_LOG: &str = "BOOTLINE_LOG";
pub const ENV_LOG_FORMAT: &str = "BOOTLINE_LOG_FORMAT";
pub const ENV_REPORTING_DSN: &str = "BOOTLINE_REPORTING_DSN";
pub const ENV_REPORTING_TIMEOUT_MS: &str = "BOOTLINE_REPORTING_TIMEOUT_MS";
pub const ENV_ERROR_REPORT_FILE: &str = "BOOTLINE_ERROR_REPORT_FILE";

/// Default bound on error-reporter initialisation.
pub const DEFAULT_REPORTING_TIMEOUT: Duration = Duration::from_millis(3000);

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Resolved bootstrap configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootConfig {
    pub debug: bool,
    pub log_filter: Option<String>,
    pub log_format: LogFormat,
    pub reporting_dsn: Option<String>,
    pub reporting_timeout: Duration,
    pub error_report_file: Option<PathBuf>,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_filter: None,
            log_format: LogFormat::Text,
            reporting_dsn: None,
            reporting_timeout: DEFAULT_REPORTING_TIMEOUT,
            error_report_file: None,
        }
    }
}

impl BootConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let debug = get(ENV_DEBUG).map(|v| is_truthy(&v)).unwrap_or(false);

        let log_filter = get(ENV_LOG).or_else(|| get("RUST_LOG"));

        let log_format = match get(ENV_LOG_FORMAT) {
            None => LogFormat::Text,
            Some(v) => match v.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "plain" => LogFormat::Text,
                _ => {
                    return Err(BootError::InvalidConfig {
                        key: ENV_LOG_FORMAT.to_string(),
                        value: v,
                        reason: "expected `json` or `text`".to_string(),
                    })
                }
            },
        };

        let reporting_timeout = match get(ENV_REPORTING_TIMEOUT_MS) {
            None => DEFAULT_REPORTING_TIMEOUT,
            Some(v) => {
                let ms = v
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| BootError::InvalidConfig {
                        key: ENV_REPORTING_TIMEOUT_MS.to_string(),
                        value: v.clone(),
                        reason: e.to_string(),
                    })?;
                Duration::from_millis(ms)
            }
        };

        Ok(Self {
            debug,
            log_filter,
            log_format,
            reporting_dsn: get(ENV_REPORTING_DSN),
            reporting_timeout,
            error_report_file: get(ENV_ERROR_REPORT_FILE).map(PathBuf::from),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
