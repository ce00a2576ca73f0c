//! Built-in plugins and the file-backed error-report capability.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bootline_core::{BootConfig, ErrorHandler, InvocationId, Plugin, PluginRegistry, VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

pub const CORE_PLUGIN: &str = "core";
pub const EXEC_PLUGIN: &str = "exec";
pub const ERROR_REPORT_PLUGIN: &str = "error-report-file";

/// Plugins shipped with the binary, in registration order.
pub fn builtin_plugins(config: &BootConfig) -> PluginRegistry {
    let mut registry = PluginRegistry::new()
        .with_plugin(Plugin::new(CORE_PLUGIN))
        .with_plugin(Plugin::new(EXEC_PLUGIN));

    if let Some(path) = &config.error_report_file {
        registry.register(
            Plugin::new(ERROR_REPORT_PLUGIN)
                .with_error_handler(Arc::new(ReportFilePlugin::new(path.clone()))),
        );
    }

    registry
}

/// One failed invocation, as written to the report file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub invocation_id: InvocationId,
    pub error: String,
    pub causes: Vec<String>,
    pub reported_at: DateTime<Utc>,
    pub version: String,
}

impl ErrorReport {
    pub fn new(error: &anyhow::Error, invocation_id: &InvocationId) -> Self {
        Self {
            invocation_id: *invocation_id,
            error: error.to_string(),
            causes: error.chain().skip(1).map(ToString::to_string).collect(),
            reported_at: Utc::now(),
            version: VERSION.to_string(),
        }
    }
}

/// Appends one JSON line per failed invocation to a file.
#[derive(Debug, Clone)]
pub struct ReportFilePlugin {
    path: PathBuf,
}

impl ReportFilePlugin {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ErrorHandler for ReportFilePlugin {
    async fn handle(&self, error: &anyhow::Error, invocation_id: &InvocationId) -> Result<()> {
        let report = ErrorReport::new(error, invocation_id);
        let mut line = serde_json::to_string(&report)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open error report file {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("Failed to write error report to {}", self.path.display()))?;
        file.flush().await?;

        tracing::info!(
            event = "error_report.written",
            path = %self.path.display(),
            invocation_id = %invocation_id,
        );
        Ok(())
    }
}
