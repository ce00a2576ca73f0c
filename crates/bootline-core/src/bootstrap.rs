//! The invocation state machine.
//!
//! ```text
//! Init ──started──▶ Reporting ──reporter_settled──▶ Dispatching
//!                                                    │  │
//!                     completion_finished / success  │  │ lifecycle failed
//!                                  ┌─────────────────┘  ▼
//!                                  │             HandlingError
//!                                  ▼                    │ handler_settled
//!                               Exiting ◀───────────────┘ no_handler_found
//! ```
//!
//! [`transition`] is the only place that decides the next state. It performs
//! no I/O; the side effect each state requires lives in
//! [`Bootstrap::perform`], which turns a state into the event that ends it.
//! Every step is awaited before the next begins.

use std::fmt;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::Instrument;

use crate::error::{BootError, Result};
use crate::exit::ExitController;
use crate::fault::{panic_message, FaultTap};
use crate::invocation::InvocationId;
use crate::lifecycle::{is_completion_request, AutocompleteHandler, EngineFactory, LifecycleEngine};
use crate::obs;
use crate::outcome::{ExitStatus, Outcome};
use crate::reporter::ErrorReporter;

/// Coarse position in the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Reporting,
    Dispatching,
    HandlingError,
    Exiting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Reporting => "reporting",
            Self::Dispatching => "dispatching",
            Self::HandlingError => "handling_error",
            Self::Exiting => "exiting",
        };
        f.write_str(name)
    }
}

/// State plus the data it carries into the next step.
pub enum State {
    Init,
    Reporting,
    Dispatching,
    HandlingError {
        error: anyhow::Error,
        /// `None` when the engine could not be constructed.
        engine: Option<Box<dyn LifecycleEngine>>,
    },
    Exiting(Outcome),
}

impl State {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Init => Phase::Init,
            Self::Reporting => Phase::Reporting,
            Self::Dispatching => Phase::Dispatching,
            Self::HandlingError { .. } => Phase::HandlingError,
            Self::Exiting(_) => Phase::Exiting,
        }
    }
}

/// What ended a state.
pub enum Event {
    Started,
    /// Reporter initialisation finished, successfully or not.
    ReporterSettled,
    CompletionFinished(anyhow::Result<()>),
    LifecycleFinished {
        result: anyhow::Result<()>,
        engine: Option<Box<dyn LifecycleEngine>>,
    },
    NoHandlerFound {
        error: anyhow::Error,
    },
    /// An error handler ran. `error` is the original lifecycle error, not
    /// anything the handler produced.
    HandlerSettled {
        error: anyhow::Error,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::ReporterSettled => "reporter_settled",
            Self::CompletionFinished(_) => "completion_finished",
            Self::LifecycleFinished { .. } => "lifecycle_finished",
            Self::NoHandlerFound { .. } => "no_handler_found",
            Self::HandlerSettled { .. } => "handler_settled",
        }
    }
}

/// Decide the next state from the current phase and the event that ended it.
pub fn transition(phase: Phase, event: Event) -> Result<State> {
    match (phase, event) {
        (Phase::Init, Event::Started) => Ok(State::Reporting),
        (Phase::Reporting, Event::ReporterSettled) => Ok(State::Dispatching),
        (Phase::Dispatching, Event::CompletionFinished(result)) => {
            Ok(State::Exiting(Outcome::from(result)))
        }
        (Phase::Dispatching, Event::LifecycleFinished { result, engine }) => match result {
            Ok(()) => Ok(State::Exiting(Outcome::Success)),
            Err(error) => Ok(State::HandlingError { error, engine }),
        },
        (Phase::HandlingError, Event::NoHandlerFound { error }) => {
            Ok(State::Exiting(Outcome::failure(error)))
        }
        (Phase::HandlingError, Event::HandlerSettled { error }) => {
            Ok(State::Exiting(Outcome::recovered(error)))
        }
        (phase, event) => Err(BootError::IllegalTransition {
            phase,
            event: event.name(),
        }),
    }
}

/// Drives one invocation from start to [`Outcome`].
pub struct Bootstrap {
    invocation_id: InvocationId,
    reporter: Arc<dyn ErrorReporter>,
    reporter_timeout: Option<Duration>,
    autocomplete: Arc<dyn AutocompleteHandler>,
    engine_factory: Box<dyn EngineFactory>,
    faults: FaultTap,
}

impl Bootstrap {
    pub fn new(
        invocation_id: InvocationId,
        reporter: Arc<dyn ErrorReporter>,
        autocomplete: Arc<dyn AutocompleteHandler>,
        engine_factory: impl EngineFactory + 'static,
    ) -> Self {
        Self {
            invocation_id,
            reporter,
            reporter_timeout: None,
            autocomplete,
            engine_factory: Box::new(engine_factory),
            faults: FaultTap::new(invocation_id),
        }
    }

    /// Bound reporter initialisation. An elapsed bound counts as a reporter
    /// failure. Lifecycle steps are never bounded.
    pub fn with_reporter_timeout(mut self, timeout: Duration) -> Self {
        self.reporter_timeout = Some(timeout);
        self
    }

    /// Use an existing fault tap (e.g. one whose panic hook is installed).
    pub fn with_fault_tap(mut self, faults: FaultTap) -> Self {
        self.faults = faults;
        self
    }

    pub fn invocation_id(&self) -> &InvocationId {
        &self.invocation_id
    }

    pub fn fault_tap(&self) -> &FaultTap {
        &self.faults
    }

    /// Run the invocation. `args` excludes the program name.
    pub async fn run(&self, args: &[String]) -> Outcome {
        self.drive(args)
            .instrument(obs::invocation_span(&self.invocation_id))
            .await
    }

    /// Run the invocation and translate its outcome into an exit status.
    pub async fn run_to_exit(&self, args: &[String], exit: &ExitController) -> ExitStatus {
        let outcome = self.run(args).await;
        let _span = obs::InvocationSpan::enter(&self.invocation_id);
        exit.conclude(&self.invocation_id, outcome)
    }

    async fn drive(&self, args: &[String]) -> Outcome {
        let mut state = State::Init;
        loop {
            let phase = state.phase();
            let event = match self.perform(state, args).await {
                ControlFlow::Continue(event) => event,
                ControlFlow::Break(outcome) => return outcome,
            };
            state = match transition(phase, event) {
                Ok(next) => next,
                Err(err) => return Outcome::failure(err.into()),
            };
        }
    }

    /// Carry out the work of `state` and report how it ended. `Exiting` has
    /// no work and breaks out with its outcome.
    async fn perform(&self, state: State, args: &[String]) -> ControlFlow<Outcome, Event> {
        let event = match state {
            State::Init => {
                obs::emit_invocation_started(&self.invocation_id, crate::VERSION);
                Event::Started
            }
            State::Reporting => {
                self.initialize_reporter().await;
                Event::ReporterSettled
            }
            State::Dispatching => {
                if is_completion_request(args) {
                    obs::emit_dispatch_selected("completion");
                    let result = match AssertUnwindSafe(self.autocomplete.complete(args))
                        .catch_unwind()
                        .await
                    {
                        Ok(result) => result,
                        Err(payload) => Err(anyhow::anyhow!(
                            "completion panicked: {}",
                            panic_message(&*payload)
                        )),
                    };
                    Event::CompletionFinished(result)
                } else {
                    obs::emit_dispatch_selected("lifecycle");
                    let (result, engine) = self.run_lifecycle().await;
                    Event::LifecycleFinished { result, engine }
                }
            }
            State::HandlingError { error, engine } => self.report_failure(error, engine).await,
            State::Exiting(outcome) => return ControlFlow::Break(outcome),
        };
        ControlFlow::Continue(event)
    }

    async fn initialize_reporter(&self) {
        let init = self.reporter.initialize(&self.invocation_id);
        let result = match self.reporter_timeout {
            Some(limit) => match tokio::time::timeout(limit, init).await {
                Ok(result) => result,
                Err(_) => Err(BootError::ReporterTimeout(limit).into()),
            },
            None => init.await,
        };

        match result {
            Ok(()) => obs::emit_reporter_ready(&self.invocation_id),
            Err(err) => obs::emit_reporter_failed(&self.invocation_id, &format_args!("{err:#}")),
        }
    }

    /// A panic anywhere in the engine becomes a lifecycle error, so it is
    /// reported and exits 1 like any other failure.
    async fn run_lifecycle(&self) -> (anyhow::Result<()>, Option<Box<dyn LifecycleEngine>>) {
        let constructed = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine_factory.construct(self.faults.clone())
        }));
        let mut engine = match constructed {
            Ok(Ok(engine)) => engine,
            Ok(Err(err)) => return (Err(err), None),
            Err(payload) => return (Err(lifecycle_panicked(payload)), None),
        };
        engine.attach_invocation_id(self.invocation_id);

        let steps = async {
            engine.initialize().await?;
            engine.execute().await
        };
        let result = match AssertUnwindSafe(steps).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(lifecycle_panicked(payload)),
        };
        (result, Some(engine))
    }

    async fn report_failure(
        &self,
        error: anyhow::Error,
        engine: Option<Box<dyn LifecycleEngine>>,
    ) -> Event {
        let Some(engine) = engine else {
            return Event::NoHandlerFound { error };
        };
        let Some((plugin, handler)) = engine.plugins().first_error_handler() else {
            return Event::NoHandlerFound { error };
        };
        let plugin = plugin.name().to_string();
        let handler = Arc::clone(handler);

        obs::emit_handler_selected(&plugin);
        let handled = AssertUnwindSafe(handler.handle(&error, &self.invocation_id))
            .catch_unwind()
            .await;
        match handled {
            Ok(Ok(())) => {}
            Ok(Err(handler_err)) => obs::emit_handler_failed(&plugin, &handler_err),
            Err(payload) => {
                let handler_err =
                    anyhow::anyhow!("error handler panicked: {}", panic_message(&*payload));
                obs::emit_handler_failed(&plugin, &handler_err);
            }
        }
        Event::HandlerSettled { error }
    }
}

fn lifecycle_panicked(payload: Box<dyn std::any::Any + Send>) -> anyhow::Error {
    anyhow::anyhow!("lifecycle panicked: {}", panic_message(&*payload))
}
