//! Outcome to exit-code translation.

use std::io::Write;

use crate::invocation::InvocationId;
use crate::obs::emit_invocation_finished;
use crate::outcome::{ExitStatus, Outcome};

/// Maps the final [`Outcome`] to an [`ExitStatus`].
///
/// The status is fixed before anything is written, so a failure while
/// logging can never change it. The caller terminates the process with the
/// returned status once `conclude` returns; by then buffered stdout and
/// stderr have been flushed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitController {
    debug: bool,
}

impl ExitController {
    /// `debug` selects the verbose error rendering (cause chain plus
    /// backtrace) over the one-line form.
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn conclude(&self, invocation_id: &InvocationId, outcome: Outcome) -> ExitStatus {
        let status = outcome.exit_status();

        match &outcome {
            Outcome::Success => {
                emit_invocation_finished(invocation_id, status.code(), false);
            }
            Outcome::Failure { error, recovered } => {
                tracing::error!(
                    event = "invocation.failed",
                    invocation_id = %invocation_id,
                    recovered = *recovered,
                    "{}",
                    render_error(error, self.debug)
                );
                emit_invocation_finished(invocation_id, status.code(), *recovered);
                flush_diagnostics();
            }
        }

        status
    }
}

/// Render an error for the terminal.
///
/// Without debug this is the cause chain on one line (`outer: inner`). With
/// debug it is anyhow's multi-line report, which includes the backtrace when
/// one was captured.
pub fn render_error(error: &anyhow::Error, debug: bool) -> String {
    if debug {
        format!("{error:?}")
    } else {
        format!("{error:#}")
    }
}

fn flush_diagnostics() {
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
}
