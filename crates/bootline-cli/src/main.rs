//! bootline - plugin-driven command runner
//!
//! The binary wires the bundled command engine into the invocation
//! bootstrap: reporter first, then either the completion fast path or the
//! engine's initialize/execute lifecycle, then a deterministic exit code.
//!
//! ## Commands
//!
//! - `info`: Show the invocation id, version and plugins
//! - `plugins`: List plugins and their capabilities
//! - `exec`: Run a program under the invocation lifecycle
//! - `completion`: Print a shell completion script

use std::process::ExitCode;
use std::sync::Arc;

use bootline_core::{
    enable_debug_backtraces, init_tracing, BootConfig, Bootstrap, ExitStatus, ExitController,
    FaultTap, InvocationId, SessionReporter, VERSION,
};

mod args;
mod completion;
mod engine;
mod plugins;

use completion::ShellCompletion;
use engine::CommandEngineFactory;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = match BootConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            init_tracing(&BootConfig::default());
            tracing::error!(event = "config.invalid", "{err}");
            return ExitStatus::Failure.into();
        }
    };

    if config.debug {
        enable_debug_backtraces();
    }
    init_tracing(&config);

    let invocation_id = InvocationId::generate();
    let faults = FaultTap::new(invocation_id);
    faults.install_panic_hook();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let reporter = SessionReporter::new(config.reporting_dsn.clone(), VERSION);
    let factory = CommandEngineFactory::new(config.clone(), args.clone());

    let bootstrap = Bootstrap::new(
        invocation_id,
        Arc::new(reporter),
        Arc::new(ShellCompletion),
        factory,
    )
    .with_reporter_timeout(config.reporting_timeout)
    .with_fault_tap(faults);

    bootstrap
        .run_to_exit(&args, &ExitController::new(config.debug))
        .await
        .into()
}
