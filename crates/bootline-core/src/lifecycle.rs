//! Seams to the collaborators that do the actual work.
//!
//! The bootstrap never parses commands or resolves plugins itself. It drives
//! a [`LifecycleEngine`] through its two phases, or hands the invocation to an
//! [`AutocompleteHandler`] when shell completion is requested.

use async_trait::async_trait;

use crate::fault::FaultTap;
use crate::invocation::InvocationId;
use crate::plugin::PluginRegistry;

/// First argument that selects the completion fast path.
pub const COMPLETION_SENTINEL: &str = "completion";

/// Plugin lifecycle engine.
///
/// `initialize` resolves plugins and parses the command line; `execute` runs
/// the requested command. The bootstrap guarantees `execute` is only called
/// after `initialize` resolved successfully.
#[async_trait]
pub trait LifecycleEngine: Send {
    /// Tag the engine with the current invocation. Called once, right after
    /// construction and before `initialize`.
    fn attach_invocation_id(&mut self, invocation_id: InvocationId);

    async fn initialize(&mut self) -> anyhow::Result<()>;

    async fn execute(&mut self) -> anyhow::Result<()>;

    /// Registered plugins in registration order.
    fn plugins(&self) -> &PluginRegistry;
}

/// Builds the engine lazily so the completion path never constructs one.
pub trait EngineFactory: Send + Sync {
    fn construct(&self, faults: FaultTap) -> anyhow::Result<Box<dyn LifecycleEngine>>;
}

impl<F> EngineFactory for F
where
    F: Fn(FaultTap) -> anyhow::Result<Box<dyn LifecycleEngine>> + Send + Sync,
{
    fn construct(&self, faults: FaultTap) -> anyhow::Result<Box<dyn LifecycleEngine>> {
        self(faults)
    }
}

/// Shell-completion fast path.
#[async_trait]
pub trait AutocompleteHandler: Send + Sync {
    /// `args` are the command-line arguments after the program name,
    /// sentinel included.
    async fn complete(&self, args: &[String]) -> anyhow::Result<()>;
}

/// Whether `args` (program name excluded) request shell completion.
pub fn is_completion_request(args: &[String]) -> bool {
    args.first().map(String::as_str) == Some(COMPLETION_SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_completion_requires_first_argument() {
        assert!(is_completion_request(&args(&["completion"])));
        assert!(is_completion_request(&args(&["completion", "zsh"])));
        assert!(!is_completion_request(&args(&["deploy", "completion"])));
        assert!(!is_completion_request(&args(&[])));
        assert!(!is_completion_request(&args(&["Completion"])));
    }
}
