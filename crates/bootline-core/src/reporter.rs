//! Error-reporting (crash telemetry) session setup.
//!
//! The bootstrap awaits [`ErrorReporter::initialize`] before anything else so
//! crash reporting is live before risky work starts. A reporter failure is
//! logged and ignored: telemetry is best-effort.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BootError, Result};
use crate::invocation::InvocationId;

/// Telemetry backend seam.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Open a reporting session tagged with `invocation_id`.
    async fn initialize(&self, invocation_id: &InvocationId) -> anyhow::Result<()>;
}

/// Parsed telemetry endpoint of the form `scheme://key@host[:port]/project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingDsn {
    pub scheme: String,
    pub public_key: String,
    pub host: String,
    pub project_id: String,
}

impl ReportingDsn {
    pub fn parse(dsn: &str) -> Result<Self> {
        let invalid = |reason: &str| BootError::InvalidDsn {
            dsn: dsn.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = dsn
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        if !matches!(scheme, "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }

        let (public_key, rest) = rest
            .split_once('@')
            .ok_or_else(|| invalid("missing public key"))?;
        if public_key.is_empty() {
            return Err(invalid("missing public key"));
        }

        let (host, project_id) = rest
            .rsplit_once('/')
            .ok_or_else(|| invalid("missing project id"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        if project_id.is_empty() {
            return Err(invalid("missing project id"));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            public_key: public_key.to_string(),
            host: host.to_string(),
            project_id: project_id.to_string(),
        })
    }
}

/// An open telemetry session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingSession {
    pub invocation_id: InvocationId,
    pub dsn: ReportingDsn,
    pub release: String,
    pub started_at: DateTime<Utc>,
}

/// Default reporter: validates the configured DSN and opens a session.
///
/// Without a DSN telemetry is disabled and initialisation succeeds without
/// opening anything.
#[derive(Debug)]
pub struct SessionReporter {
    dsn: Option<String>,
    release: String,
    session: OnceLock<ReportingSession>,
}

impl SessionReporter {
    pub fn new(dsn: Option<String>, release: impl Into<String>) -> Self {
        Self {
            dsn,
            release: release.into(),
            session: OnceLock::new(),
        }
    }

    /// The open session, if telemetry is enabled and initialised.
    pub fn session(&self) -> Option<&ReportingSession> {
        self.session.get()
    }
}

#[async_trait]
impl ErrorReporter for SessionReporter {
    async fn initialize(&self, invocation_id: &InvocationId) -> anyhow::Result<()> {
        let Some(raw) = self.dsn.as_deref() else {
            tracing::debug!(event = "reporter.disabled", "no reporting DSN configured");
            return Ok(());
        };

        let dsn = ReportingDsn::parse(raw)?;
        let session = ReportingSession {
            invocation_id: *invocation_id,
            dsn,
            release: self.release.clone(),
            started_at: Utc::now(),
        };
        tracing::info!(
            event = "reporter.session_opened",
            host = %session.dsn.host,
            project = %session.dsn.project_id,
            release = %session.release,
        );
        // A second initialise keeps the first session.
        let _ = self.session.set(session);
        Ok(())
    }
}
