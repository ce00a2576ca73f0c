//! Structured observability hooks for the invocation lifecycle.
//!
//! This module provides:
//! - An invocation-scoped tracing span via the `InvocationSpan` RAII guard
//! - Emission functions for each lifecycle milestone
//!
//! Every event carries an `event = "..."` field so log pipelines can filter on
//! it regardless of the human-readable message.

use tracing::{debug, error, info, warn};

use crate::invocation::InvocationId;

/// RAII guard that enters an invocation-scoped span.
///
/// # Example
///
/// ```ignore
/// let _span = InvocationSpan::enter(&invocation_id);
/// // Every tracing call now carries invocation_id.
/// ```
pub struct InvocationSpan {
    _span: tracing::span::EnteredSpan,
}

impl InvocationSpan {
    pub fn enter(invocation_id: &InvocationId) -> Self {
        Self {
            _span: invocation_span(invocation_id).entered(),
        }
    }
}

/// Build (without entering) the invocation span, for use with
/// `tracing::Instrument` on futures.
pub fn invocation_span(invocation_id: &InvocationId) -> tracing::Span {
    tracing::info_span!("invocation", invocation_id = %invocation_id)
}

pub fn emit_invocation_started(invocation_id: &InvocationId, version: &str) {
    debug!(event = "invocation.started", invocation_id = %invocation_id, version = %version);
}

pub fn emit_reporter_ready(invocation_id: &InvocationId) {
    debug!(event = "reporter.ready", invocation_id = %invocation_id);
}

/// Telemetry could not start. Never fatal.
pub fn emit_reporter_failed(invocation_id: &InvocationId, error: &dyn std::fmt::Display) {
    warn!(
        event = "reporter.failed",
        invocation_id = %invocation_id,
        error = %error,
        "error reporting unavailable, continuing without it"
    );
}

/// Which branch dispatch took: `completion` or `lifecycle`.
pub fn emit_dispatch_selected(path: &str) {
    debug!(event = "dispatch.selected", path = %path);
}

pub fn emit_handler_selected(plugin: &str) {
    info!(event = "error_handler.selected", plugin = %plugin);
}

/// The error-reporting handler itself failed. The lifecycle error still
/// decides the outcome.
pub fn emit_handler_failed(plugin: &str, error: &anyhow::Error) {
    error!(
        event = "error_handler.failed",
        plugin = %plugin,
        error = ?error,
        "error handler failed"
    );
}

/// A background failure nobody awaited.
pub fn emit_background_fault(source: &str, error: &dyn std::fmt::Display) {
    error!(
        event = "fault.unobserved",
        source = %source,
        error = %error,
        "unobserved background failure"
    );
}

pub fn emit_invocation_finished(invocation_id: &InvocationId, exit_code: u8, recovered: bool) {
    debug!(
        event = "invocation.finished",
        invocation_id = %invocation_id,
        exit_code = exit_code,
        recovered = recovered,
    );
}
