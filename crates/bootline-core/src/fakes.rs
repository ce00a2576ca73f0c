//! In-memory fakes for the collaborator traits (testing only)
//!
//! Every fake writes to a shared [`CallLog`] so tests can assert both that a
//! collaborator ran and in which order relative to the others.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::fault::FaultTap;
use crate::invocation::InvocationId;
use crate::lifecycle::{AutocompleteHandler, EngineFactory, LifecycleEngine};
use crate::plugin::{ErrorHandler, PluginRegistry};
use crate::reporter::ErrorReporter;

// ---------------------------------------------------------------------------
// CallLog
// ---------------------------------------------------------------------------

/// Ordered record of collaborator calls, shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == entry)
            .count()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.count(entry) > 0
    }
}

// ---------------------------------------------------------------------------
// FakeReporter
// ---------------------------------------------------------------------------

/// Reporter that records the invocation id it was given.
#[derive(Debug)]
pub struct FakeReporter {
    log: CallLog,
    fail_with: Option<String>,
    delay: Option<Duration>,
    seen: Mutex<Option<InvocationId>>,
}

impl FakeReporter {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_with: None,
            delay: None,
            seen: Mutex::new(None),
        }
    }

    pub fn failing(log: CallLog, message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(log)
        }
    }

    /// Sleep before settling, to exercise ordering and timeouts.
    pub fn delayed(log: CallLog, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(log)
        }
    }

    pub fn seen_invocation(&self) -> Option<InvocationId> {
        *self.seen.lock().unwrap()
    }
}

#[async_trait]
impl ErrorReporter for FakeReporter {
    async fn initialize(&self, invocation_id: &InvocationId) -> anyhow::Result<()> {
        self.log.record("reporter.initialize");
        *self.seen.lock().unwrap() = Some(*invocation_id);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.log.record("reporter.settled");
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeAutocomplete
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FakeAutocomplete {
    log: CallLog,
    fail_with: Option<String>,
    args: Mutex<Vec<String>>,
}

impl FakeAutocomplete {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_with: None,
            args: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(log: CallLog, message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(log)
        }
    }

    pub fn seen_args(&self) -> Vec<String> {
        self.args.lock().unwrap().clone()
    }
}

#[async_trait]
impl AutocompleteHandler for FakeAutocomplete {
    async fn complete(&self, args: &[String]) -> anyhow::Result<()> {
        self.log.record("autocomplete");
        *self.args.lock().unwrap() = args.to_vec();
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeErrorHandler
// ---------------------------------------------------------------------------

/// Error-handler capability that records what it was asked to report.
#[derive(Debug)]
pub struct FakeErrorHandler {
    name: String,
    log: CallLog,
    fail_with: Option<String>,
    panic_with: Option<String>,
    reports: Mutex<Vec<(String, InvocationId)>>,
}

impl FakeErrorHandler {
    pub fn new(name: &str, log: CallLog) -> Self {
        Self {
            name: name.to_string(),
            log,
            fail_with: None,
            panic_with: None,
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str, log: CallLog, message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(name, log)
        }
    }

    /// Handler that panics instead of returning.
    pub fn panicking(name: &str, log: CallLog, message: &str) -> Self {
        Self {
            panic_with: Some(message.to_string()),
            ..Self::new(name, log)
        }
    }

    /// `(error message, invocation id)` for every call, in order.
    pub fn reports(&self) -> Vec<(String, InvocationId)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ErrorHandler for FakeErrorHandler {
    async fn handle(
        &self,
        error: &anyhow::Error,
        invocation_id: &InvocationId,
    ) -> anyhow::Result<()> {
        self.log.record(format!("handler.{}", self.name));
        self.reports
            .lock()
            .unwrap()
            .push((error.to_string(), *invocation_id));
        if let Some(message) = &self.panic_with {
            panic!("{message}");
        }
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeEngine / FakeEngineFactory
// ---------------------------------------------------------------------------

/// Which lifecycle step should fail, and with what message.
#[derive(Debug, Clone, Default)]
pub struct EngineScript {
    pub fail_construct: Option<String>,
    pub fail_initialize: Option<String>,
    pub fail_execute: Option<String>,
    /// `execute` panics with this message.
    pub panic_execute: Option<String>,
    /// Work handed to the fault tap during `execute`, failing with this
    /// message, to simulate a detached background failure.
    pub background_failure: Option<String>,
}

/// Lifecycle engine driven by an [`EngineScript`].
pub struct FakeEngine {
    log: CallLog,
    script: EngineScript,
    plugins: PluginRegistry,
    faults: FaultTap,
    plugin_reads: Arc<AtomicUsize>,
}

#[async_trait]
impl LifecycleEngine for FakeEngine {
    fn attach_invocation_id(&mut self, invocation_id: InvocationId) {
        self.log.record(format!("engine.attach:{invocation_id}"));
    }

    async fn initialize(&mut self) -> anyhow::Result<()> {
        self.log.record("engine.initialize");
        match &self.script.fail_initialize {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }

    async fn execute(&mut self) -> anyhow::Result<()> {
        self.log.record("engine.execute");
        if let Some(message) = &self.script.panic_execute {
            panic!("{message}");
        }
        if let Some(message) = self.script.background_failure.clone() {
            self.faults
                .spawn("fake.background", async move { Err(anyhow::anyhow!(message)) })
                .await?;
        }
        match &self.script.fail_execute {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }

    fn plugins(&self) -> &PluginRegistry {
        self.plugin_reads.fetch_add(1, Ordering::SeqCst);
        self.log.record("engine.plugins");
        &self.plugins
    }
}

/// Factory producing [`FakeEngine`]s and counting constructions.
#[derive(Clone)]
pub struct FakeEngineFactory {
    log: CallLog,
    script: EngineScript,
    plugins: PluginRegistry,
    constructed: Arc<AtomicUsize>,
    plugin_reads: Arc<AtomicUsize>,
}

impl FakeEngineFactory {
    pub fn new(log: CallLog, script: EngineScript, plugins: PluginRegistry) -> Self {
        Self {
            log,
            script,
            plugins,
            constructed: Arc::new(AtomicUsize::new(0)),
            plugin_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Factory whose engines always succeed and carry no plugins.
    pub fn succeeding(log: CallLog) -> Self {
        Self::new(log, EngineScript::default(), PluginRegistry::new())
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// How many times the bootstrap read the plugin list.
    pub fn plugin_reads(&self) -> usize {
        self.plugin_reads.load(Ordering::SeqCst)
    }
}

impl EngineFactory for FakeEngineFactory {
    fn construct(&self, faults: FaultTap) -> anyhow::Result<Box<dyn LifecycleEngine>> {
        self.log.record("engine.construct");
        if let Some(message) = &self.script.fail_construct {
            return Err(anyhow::anyhow!("{message}"));
        }
        self.constructed.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeEngine {
            log: self.log.clone(),
            script: self.script.clone(),
            plugins: self.plugins.clone(),
            faults,
            plugin_reads: Arc::clone(&self.plugin_reads),
        }))
    }
}
