//! Capability namespaces (plugins) and the registry that resolves them.
//!
//! A [`Plugin`] groups source and filter component classes under one name.
//! Plugins are handed out as `Arc<Plugin>`; the graph builder holds those
//! handles only while it instantiates components, so the strong count drops
//! back as soon as assembly completes or fails.

use crate::graph::component::{FilterComponentClass, SourceComponentClass};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

/// A named namespace of component classes.
pub struct Plugin {
    name: String,
    description: Option<String>,
    sources: Vec<Arc<dyn SourceComponentClass>>,
    filters: Vec<Arc<dyn FilterComponentClass>>,
}

impl Plugin {
    pub fn builder(name: impl Into<String>) -> PluginBuilder {
        PluginBuilder {
            plugin: Plugin {
                name: name.into(),
                description: None,
                sources: Vec::new(),
                filters: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Look up a source class by name.
    pub fn source_class(&self, name: &str) -> Option<Arc<dyn SourceComponentClass>> {
        self.sources.iter().find(|c| c.name() == name).cloned()
    }

    /// Look up a filter class by name.
    pub fn filter_class(&self, name: &str) -> Option<Arc<dyn FilterComponentClass>> {
        self.filters.iter().find(|c| c.name() == name).cloned()
    }

    pub fn source_class_count(&self) -> usize {
        self.sources.len()
    }

    pub fn filter_class_count(&self) -> usize {
        self.filters.len()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field(
                "sources",
                &self.sources.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field(
                "filters",
                &self.filters.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`Plugin`]. A class registered twice under one name replaces the first.
pub struct PluginBuilder {
    plugin: Plugin,
}

impl PluginBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.plugin.description = Some(description.into());
        self
    }

    pub fn source(mut self, class: impl SourceComponentClass + 'static) -> Self {
        self.plugin.sources.retain(|c| c.name() != class.name());
        self.plugin.sources.push(Arc::new(class));
        self
    }

    pub fn filter(mut self, class: impl FilterComponentClass + 'static) -> Self {
        self.plugin.filters.retain(|c| c.name() != class.name());
        self.plugin.filters.push(Arc::new(class));
        self
    }

    pub fn build(self) -> Plugin {
        self.plugin
    }
}

/// Resolves capability namespaces by name.
pub trait PluginRegistry {
    fn find_plugin(&self, name: &str) -> Option<Arc<Plugin>>;
}

/// Thread-safe, in-process plugin registry.
#[derive(Default)]
pub struct PluginSet {
    plugins: RwLock<BTreeMap<String, Arc<Plugin>>>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry consulted by [`TraceContext::create`](crate::TraceContext::create).
    pub fn global() -> &'static PluginSet {
        static GLOBAL: OnceLock<PluginSet> = OnceLock::new();
        GLOBAL.get_or_init(PluginSet::new)
    }

    /// Register a plugin, returning the one it replaced, if any.
    pub fn register(&self, plugin: Plugin) -> Option<Arc<Plugin>> {
        let name = plugin.name().to_string();
        tracing::debug!(
            "Registering plugin '{}' ({} source, {} filter classes)",
            name,
            plugin.source_class_count(),
            plugin.filter_class_count()
        );
        self.write().insert(name, Arc::new(plugin))
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<Plugin>> {
        self.write().remove(name)
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<Plugin>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.plugins.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Arc<Plugin>>> {
        self.plugins.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl PluginRegistry for PluginSet {
    fn find_plugin(&self, name: &str) -> Option<Arc<Plugin>> {
        self.read().get(name).cloned()
    }
}

impl<R: PluginRegistry + ?Sized> PluginRegistry for Arc<R> {
    fn find_plugin(&self, name: &str) -> Option<Arc<Plugin>> {
        (**self).find_plugin(name)
    }
}
