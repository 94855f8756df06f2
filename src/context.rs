//! Trace context: assembly, pull-driven execution and teardown of a
//! source → multiplexer → sink graph.
//!
//! [`TraceContext::create`] wires the graph with the fixed names of
//! [`GraphConfig::default`] against the process-wide [`PluginSet`].
//! [`TraceContextBuilder`] exposes the same assembly with a custom registry,
//! several trace inputs or a loaded configuration.
//!
//! Every construction step either succeeds or returns a [`TraceError`]; all
//! handles acquired up to that point are released on the way out. A context
//! that exists is always fully wired.

use crate::config::GraphConfig;
use crate::error::{Result, TraceError};
use crate::graph::{
    ComponentId, ConfigValue, Graph, PluginRegistry, PluginSet, RunStatus, SimpleSink, ValueMap,
};
use std::path::{Path, PathBuf};

/// Terminal status of a [`TraceContext::pull`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStatus {
    /// The sink consumed at least one message.
    HasMessages,
    /// Every stream is exhausted. Further pulls keep returning this.
    EndOfStream,
}

/// Builder for [`TraceContext`].
pub struct TraceContextBuilder<'r> {
    registry: &'r dyn PluginRegistry,
    inputs: Vec<PathBuf>,
    config: GraphConfig,
}

impl TraceContextBuilder<'static> {
    /// A builder resolving capabilities through [`PluginSet::global`].
    pub fn new() -> Self {
        Self::with_registry(PluginSet::global())
    }
}

impl Default for TraceContextBuilder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> TraceContextBuilder<'r> {
    pub fn with_registry(registry: &'r dyn PluginRegistry) -> Self {
        Self {
            registry,
            inputs: Vec::new(),
            config: GraphConfig::default(),
        }
    }

    /// Add a trace locator. Each locator gets its own source component.
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(path.as_ref().to_path_buf());
        self
    }

    pub fn inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.inputs
            .extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble and wire the graph around `sink`.
    ///
    /// Source output ports are paired with multiplexer input ports strictly by
    /// position; with several inputs the pairing continues at the next free
    /// multiplexer input. The sink is connected to multiplexer output 0.
    pub fn build<'a>(self, sink: impl SimpleSink + 'a) -> Result<TraceContext<'a>> {
        let config = &self.config;
        config.validate()?;
        if self.inputs.is_empty() {
            return Err(TraceError::Config("no trace input given".to_string()));
        }
        // Sources receive locators as strings.
        let locators = self
            .inputs
            .iter()
            .map(|path| {
                path.to_str().ok_or_else(|| {
                    TraceError::Config(format!("trace path {:?} is not valid UTF-8", path))
                })
            })
            .collect::<Result<Vec<&str>>>()?;

        let mut sources = Vec::new();
        sources
            .try_reserve_exact(self.inputs.len())
            .map_err(|e| TraceError::AllocationFailure(format!("trace context: {e}")))?;

        let mut graph = Graph::new().map_err(TraceError::GraphCreation)?;

        // Namespace handles are dropped on every return below, and explicitly
        // once the components exist.
        let source_plugin = self.registry.find_plugin(&config.source_plugin).ok_or_else(|| {
            TraceError::CapabilityNotFound {
                plugin: config.source_plugin.clone(),
            }
        })?;
        let filter_plugin = self.registry.find_plugin(&config.filter_plugin).ok_or_else(|| {
            TraceError::CapabilityNotFound {
                plugin: config.filter_plugin.clone(),
            }
        })?;

        let source_class = source_plugin
            .source_class(&config.source_class)
            .ok_or_else(|| TraceError::ComponentClassNotFound {
                plugin: config.source_plugin.clone(),
                class: config.source_class.clone(),
            })?;
        let filter_class = filter_plugin
            .filter_class(&config.filter_class)
            .ok_or_else(|| TraceError::ComponentClassNotFound {
                plugin: config.filter_plugin.clone(),
                class: config.filter_class.clone(),
            })?;

        for (index, path) in locators.iter().enumerate() {
            let name = config.source_instance_name(index);
            let params = ValueMap::new().with(
                config.inputs_key.as_str(),
                ConfigValue::string_array([*path]),
            );

            let id = graph
                .add_source_component(&*source_class, &name, Some(&params), config.log_level)
                .map_err(|e| TraceError::component_creation(&name, e))?;
            let port_count = graph
                .output_port_count(id)
                .map_err(|e| TraceError::component_creation(&name, e))?;
            if port_count == 0 {
                return Err(TraceError::NoOutputPorts { component: name });
            }

            tracing::debug!("Source '{}' reads {:?} ({} output ports)", name, path, port_count);
            sources.push((id, name, port_count));
        }

        let filter = graph
            .add_filter_component(&*filter_class, &config.filter_name, None, config.log_level)
            .map_err(|e| TraceError::component_creation(&config.filter_name, e))?;

        let mut next_input = 0;
        for (source, name, port_count) in &sources {
            for port in 0..*port_count {
                graph
                    .connect_ports(source.output(port), filter.input(next_input))
                    .map_err(|e| TraceError::port_connection(name, &config.filter_name, e))?;
                next_input += 1;
            }
        }

        let sink_id = graph
            .add_simple_sink_component(&config.sink_name, sink)
            .map_err(|e| TraceError::component_creation(&config.sink_name, e))?;
        graph
            .connect_ports(filter.output(0), sink_id.input(0))
            .map_err(|e| TraceError::port_connection(&config.filter_name, &config.sink_name, e))?;

        drop(source_class);
        drop(filter_class);
        drop(source_plugin);
        drop(filter_plugin);

        tracing::info!(
            "Trace graph ready: {} source(s), {} muxer input(s) wired",
            sources.len(),
            next_input
        );

        Ok(TraceContext {
            graph,
            sources: sources.into_iter().map(|(id, _, _)| id).collect(),
            filter,
            sink: sink_id,
        })
    }
}

/// A fully wired trace graph, driven by [`pull`](Self::pull).
///
/// `'a` is the lifetime of the sink's state; a sink borrowed with `&mut` must
/// outlive the context.
pub struct TraceContext<'a> {
    graph: Graph<'a>,
    sources: Vec<ComponentId>,
    filter: ComponentId,
    sink: ComponentId,
}

impl<'a> TraceContext<'a> {
    /// Wire `path` through the default source and multiplexer into `sink`.
    pub fn create(path: impl AsRef<Path>, sink: impl SimpleSink + 'a) -> Result<Self> {
        TraceContextBuilder::new().input(path).build(sink)
    }

    /// Advance the graph until the sink consumes something or every stream ends.
    ///
    /// "Try again" steps are retried immediately, without backoff or bound, so
    /// this call blocks for as long as the source takes to produce data.
    pub fn pull(&mut self) -> Result<PullStatus> {
        loop {
            match self.graph.run_once()? {
                RunStatus::Ok => return Ok(PullStatus::HasMessages),
                RunStatus::End => return Ok(PullStatus::EndOfStream),
                RunStatus::Again => continue,
            }
        }
    }

    /// Tear the graph down, finalizing the sink.
    pub fn destroy(self) {
        tracing::debug!("Destroying trace context after {} steps", self.graph.steps());
        drop(self);
    }

    pub fn graph(&self) -> &Graph<'a> {
        &self.graph
    }

    pub fn source_components(&self) -> &[ComponentId] {
        &self.sources
    }

    pub fn filter_component(&self) -> ComponentId {
        self.filter
    }

    pub fn sink_component(&self) -> ComponentId {
        self.sink
    }
}
