//! bootline Core Library
//!
//! Invocation bootstrap for plugin-driven command-line tools: one invocation
//! id per process, error reporting brought up before anything risky runs,
//! a completion fast path, a two-phase lifecycle, an optional plugin-provided
//! error handler, and deterministic 0/1 exit codes.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod exit;
pub mod fakes;
pub mod fault;
pub mod invocation;
pub mod lifecycle;
pub mod obs;
pub mod outcome;
pub mod plugin;
pub mod reporter;
pub mod telemetry;

pub use bootstrap::{transition, Bootstrap, Event, Phase, State};
pub use config::{BootConfig, LogFormat};
pub use error::{BootError, Result};
pub use exit::{render_error, ExitController};
pub use fault::FaultTap;
pub use invocation::InvocationId;
pub use lifecycle::{
    is_completion_request, AutocompleteHandler, EngineFactory, LifecycleEngine,
    COMPLETION_SENTINEL,
};
pub use obs::{
    emit_background_fault, emit_dispatch_selected, emit_handler_failed, emit_handler_selected,
    emit_invocation_finished, emit_invocation_started, emit_reporter_failed, InvocationSpan,
};
pub use outcome::{ExitStatus, Outcome};
pub use plugin::{ErrorHandler, Plugin, PluginRegistry};
pub use reporter::{ErrorReporter, ReportingDsn, ReportingSession, SessionReporter};
pub use telemetry::{enable_debug_backtraces, init_tracing};

/// bootline version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
