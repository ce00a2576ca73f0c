//! Safety net for failures nobody is waiting on.
//!
//! [`FaultTap`] is created once per process and handed (by clone) to every
//! subsystem that starts background work. Failures routed through it are
//! logged on the same diagnostic path as lifecycle failures and counted, but
//! never terminate the process and never change the exit code.

use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::invocation::InvocationId;
use crate::obs::emit_background_fault;

#[derive(Debug)]
struct TapInner {
    invocation_id: InvocationId,
    faults: AtomicU64,
}

/// Cloneable handle to the process-wide fault sink.
#[derive(Debug, Clone)]
pub struct FaultTap {
    inner: Arc<TapInner>,
}

impl FaultTap {
    pub fn new(invocation_id: InvocationId) -> Self {
        Self {
            inner: Arc::new(TapInner {
                invocation_id,
                faults: AtomicU64::new(0),
            }),
        }
    }

    pub fn invocation_id(&self) -> &InvocationId {
        &self.inner.invocation_id
    }

    /// Record a failure that escaped its owner.
    pub fn report(&self, source: &str, error: &dyn std::fmt::Display) {
        self.inner.faults.fetch_add(1, Ordering::Relaxed);
        emit_background_fault(source, error);
    }

    /// Number of faults reported so far.
    pub fn fault_count(&self) -> u64 {
        self.inner.faults.load(Ordering::Relaxed)
    }

    /// Spawn background work whose failure (error or panic) is reported here
    /// instead of vanishing with its `JoinHandle`.
    ///
    /// Both tasks run inside the caller's span. The returned handle resolves
    /// once the work finished and any failure was reported.
    pub fn spawn<F>(&self, source: impl Into<String>, future: F) -> JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let tap = self.clone();
        let source = source.into();
        let span = tracing::Span::current();
        let work = tokio::spawn(future.instrument(span.clone()));
        let watch = async move {
            match work.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tap.report(&source, &format_args!("{err:#}")),
                Err(join_err) if join_err.is_panic() => {
                    let message = panic_message(&*join_err.into_panic());
                    tap.report(&source, &format_args!("panicked: {message}"));
                }
                Err(_) => {
                    tracing::debug!(event = "fault.cancelled", source = %source);
                }
            }
        };
        tokio::spawn(watch.instrument(span))
    }

    /// Log panics from any thread through tracing, tagged with the
    /// invocation id, instead of the default stderr dump.
    ///
    /// Panicking threads still unwind; this only makes them visible.
    pub fn install_panic_hook(&self) {
        let invocation_id = self.inner.invocation_id;
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(ToString::to_string)
                .unwrap_or_default();
            tracing::error!(
                event = "fault.panic",
                invocation_id = %invocation_id,
                location = %location,
                "panic: {}",
                panic_message(info.payload())
            );
        }));
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
