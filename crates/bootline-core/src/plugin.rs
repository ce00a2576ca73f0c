//! Plugins as capability tables.
//!
//! A plugin advertises optional behaviour by filling in a capability slot
//! rather than by implementing a trait hierarchy. The bootstrap only cares
//! about one capability: reporting a failed invocation to an external
//! service.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::invocation::InvocationId;

/// Capability: report a failed invocation somewhere outside the process.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle(&self, error: &anyhow::Error, invocation_id: &InvocationId)
        -> anyhow::Result<()>;
}

/// A registered plugin and the capabilities it exposes.
#[derive(Clone)]
pub struct Plugin {
    name: String,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl Plugin {
    /// A plugin with no optional capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error_handler: None,
        }
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error_handler(&self) -> Option<&Arc<dyn ErrorHandler>> {
        self.error_handler.as_ref()
    }

    pub fn has_error_handler(&self) -> bool {
        self.error_handler.is_some()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("error_handler", &self.has_error_handler())
            .finish()
    }
}

/// Ordered list of plugins, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Plugin) {
        self.plugins.push(plugin);
    }

    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.register(plugin);
        self
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// First plugin, in registration order, that exposes an error handler.
    ///
    /// Later plugins with the same capability are never consulted.
    pub fn first_error_handler(&self) -> Option<(&Plugin, &Arc<dyn ErrorHandler>)> {
        self.plugins
            .iter()
            .find_map(|p| p.error_handler().map(|handler| (p, handler)))
    }
}

impl FromIterator<Plugin> for PluginRegistry {
    fn from_iter<I: IntoIterator<Item = Plugin>>(iter: I) -> Self {
        Self {
            plugins: iter.into_iter().collect(),
        }
    }
}
