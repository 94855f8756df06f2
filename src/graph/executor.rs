//! Graph storage and the single-step scheduler.
//!
//! Assembly phase: components are added under unique names and their ports
//! are linked pairwise. The first [`Graph::run_once`] call freezes the
//! topology:
//! 1. Every sink input port must be connected.
//! 2. Message iterators are built upstream-first (sources, then filters).
//! 3. Each sink's `initialize` hook runs once.
//!
//! Every later step consumes one sink, round-robin. Dropping the graph
//! finalizes each sink exactly once.

use crate::graph::component::{
    ComponentKind, FilterComponent, FilterComponentClass, MessageIterator, SourceComponent,
    SourceComponentClass,
};
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::{ComponentId, ConnectionId, PortRef};
use crate::graph::port::{PortDirection, PortTable};
use crate::graph::sink::{ConsumeStatus, SimpleSink};
use crate::graph::value::ValueMap;
use crate::logging::LogLevel;
use std::collections::HashMap;

/// Initial capacity of the component and connection tables.
const INITIAL_CAPACITY: usize = 4;

/// Status of a single graph step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// A sink consumed something.
    Ok,
    /// Nothing was available; try again.
    Again,
    /// Every sink has ended.
    End,
}

/// Lifecycle of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// Components and connections may still be added.
    Configuring,
    Running,
    Ended,
    /// A step failed; the graph cannot run any more.
    Faulted,
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub upstream: PortRef,
    pub downstream: PortRef,
}

struct SinkState<'a> {
    sink: Box<dyn SimpleSink + 'a>,
    upstream: Option<Box<dyn MessageIterator>>,
    ended: bool,
    finalized: bool,
}

enum ComponentInner<'a> {
    Source(Box<dyn SourceComponent>),
    Filter(Box<dyn FilterComponent>),
    Sink(SinkState<'a>),
}

/// A component together with its port tables.
struct ComponentSlot<'a> {
    name: String,
    class_name: Option<String>,
    log_level: LogLevel,
    inputs: PortTable,
    outputs: PortTable,
    inner: ComponentInner<'a>,
}

impl ComponentSlot<'_> {
    fn kind(&self) -> ComponentKind {
        match self.inner {
            ComponentInner::Source(_) => ComponentKind::Source,
            ComponentInner::Filter(_) => ComponentKind::Filter,
            ComponentInner::Sink(_) => ComponentKind::Sink,
        }
    }

    fn ports(&self, direction: PortDirection) -> &PortTable {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    fn ports_mut(&mut self, direction: PortDirection) -> &mut PortTable {
        match direction {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        }
    }
}

/// The trace processing graph.
///
/// `'a` bounds the caller-supplied sinks: a sink borrowed from the caller must
/// outlive the graph.
pub struct Graph<'a> {
    components: Vec<ComponentSlot<'a>>,
    connections: Vec<Connection>,
    names: HashMap<String, ComponentId>,
    sinks: Vec<ComponentId>,
    /// Round-robin cursor into `sinks`.
    next_sink: usize,
    state: GraphState,
    steps: u64,
}

impl<'a> Graph<'a> {
    /// Create an empty graph.
    pub fn new() -> GraphResult<Self> {
        let mut components = Vec::new();
        let mut connections = Vec::new();
        components
            .try_reserve(INITIAL_CAPACITY)
            .map_err(|e| GraphError::Allocation(format!("component table: {e}")))?;
        connections
            .try_reserve(INITIAL_CAPACITY)
            .map_err(|e| GraphError::Allocation(format!("connection table: {e}")))?;

        Ok(Self {
            components,
            connections,
            names: HashMap::new(),
            sinks: Vec::new(),
            next_sink: 0,
            state: GraphState::Configuring,
            steps: 0,
        })
    }

    // ── Graph building ──

    /// Instantiate `class` as a source named `name`.
    pub fn add_source_component(
        &mut self,
        class: &dyn SourceComponentClass,
        name: &str,
        params: Option<&ValueMap>,
        log_level: LogLevel,
    ) -> GraphResult<ComponentId> {
        self.check_can_add(name)?;

        let empty = ValueMap::new();
        let source = class
            .instantiate(params.unwrap_or(&empty), log_level)
            .map_err(|source| GraphError::Instantiation {
                class: class.name().to_string(),
                source,
            })?;

        let outputs = PortTable::new(PortDirection::Output, source.output_port_count())?;
        self.push_component(ComponentSlot {
            name: name.to_string(),
            class_name: Some(class.name().to_string()),
            log_level,
            inputs: PortTable::new(PortDirection::Input, 0)?,
            outputs,
            inner: ComponentInner::Source(source),
        })
    }

    /// Instantiate `class` as a filter named `name`.
    pub fn add_filter_component(
        &mut self,
        class: &dyn FilterComponentClass,
        name: &str,
        params: Option<&ValueMap>,
        log_level: LogLevel,
    ) -> GraphResult<ComponentId> {
        self.check_can_add(name)?;

        let empty = ValueMap::new();
        let filter = class
            .instantiate(params.unwrap_or(&empty), log_level)
            .map_err(|source| GraphError::Instantiation {
                class: class.name().to_string(),
                source,
            })?;

        let inputs = PortTable::new(PortDirection::Input, filter.input_port_count())?;
        let outputs = PortTable::new(PortDirection::Output, filter.output_port_count())?;
        self.push_component(ComponentSlot {
            name: name.to_string(),
            class_name: Some(class.name().to_string()),
            log_level,
            inputs,
            outputs,
            inner: ComponentInner::Filter(filter),
        })
    }

    /// Add a caller-defined sink with a single input port and no parameters.
    pub fn add_simple_sink_component(
        &mut self,
        name: &str,
        sink: impl SimpleSink + 'a,
    ) -> GraphResult<ComponentId> {
        self.check_can_add(name)?;
        self.sinks
            .try_reserve(1)
            .map_err(|e| GraphError::Allocation(format!("sink list: {e}")))?;

        let id = self.push_component(ComponentSlot {
            name: name.to_string(),
            class_name: None,
            log_level: LogLevel::default(),
            inputs: PortTable::new(PortDirection::Input, 1)?,
            outputs: PortTable::new(PortDirection::Output, 0)?,
            inner: ComponentInner::Sink(SinkState {
                sink: Box::new(sink),
                upstream: None,
                ended: false,
                finalized: false,
            }),
        })?;
        self.sinks.push(id);
        Ok(id)
    }

    fn check_can_add(&self, name: &str) -> GraphResult<()> {
        if self.state != GraphState::Configuring {
            return Err(GraphError::AlreadyRunning);
        }
        if self.names.contains_key(name) {
            return Err(GraphError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn push_component(&mut self, slot: ComponentSlot<'a>) -> GraphResult<ComponentId> {
        self.components
            .try_reserve(1)
            .map_err(|e| GraphError::Allocation(format!("component table: {e}")))?;

        let id = ComponentId(self.components.len() as u32);
        tracing::debug!(
            "Added {} component '{}' {:?} (class {:?}, {} in / {} out, log level {})",
            slot.kind(),
            slot.name,
            id,
            slot.class_name.as_deref().unwrap_or("<none>"),
            slot.inputs.len(),
            slot.outputs.len(),
            slot.log_level
        );
        self.names.insert(slot.name.clone(), id);
        self.components.push(slot);
        Ok(id)
    }

    /// Connect an output port to an input port.
    ///
    /// Ports are addressed by position. An index past the end of the port
    /// table fails with [`GraphError::PortOutOfRange`]; a port that already
    /// holds a connection fails with [`GraphError::PortAlreadyConnected`].
    pub fn connect_ports(
        &mut self,
        upstream: PortRef,
        downstream: PortRef,
    ) -> GraphResult<ConnectionId> {
        if self.state != GraphState::Configuring {
            return Err(GraphError::AlreadyRunning);
        }

        self.check_port(upstream, PortDirection::Output)?;
        self.check_port(downstream, PortDirection::Input)?;

        if upstream.component == downstream.component {
            return Err(GraphError::SelfConnection(
                self.components[upstream.component.index()].name.clone(),
            ));
        }
        if self.would_create_cycle(upstream.component, downstream.component) {
            return Err(GraphError::CycleDetected {
                upstream: self.components[upstream.component.index()].name.clone(),
                downstream: self.components[downstream.component.index()].name.clone(),
            });
        }

        self.connections
            .try_reserve(1)
            .map_err(|e| GraphError::Allocation(format!("connection table: {e}")))?;

        let id = ConnectionId(self.connections.len() as u32);
        self.connections.push(Connection {
            id,
            upstream,
            downstream,
        });
        for port in [upstream, downstream] {
            if let Some(p) = self.components[port.component.index()]
                .ports_mut(port.direction)
                .get_mut(port.index)
            {
                p.connection = Some(id);
            }
        }

        // A filter may add an input port once one is taken.
        let slot = &mut self.components[downstream.component.index()];
        if let ComponentInner::Filter(filter) = &mut slot.inner {
            filter.input_port_connected(downstream.index);
            let count = filter.input_port_count();
            slot.inputs.grow_to(count)?;
        }

        tracing::debug!(
            "Connected '{}' out#{} -> '{}' in#{} ({:?})",
            self.components[upstream.component.index()].name,
            upstream.index,
            self.components[downstream.component.index()].name,
            downstream.index,
            id
        );
        Ok(id)
    }

    fn slot(&self, id: ComponentId) -> GraphResult<&ComponentSlot<'a>> {
        self.components
            .get(id.index())
            .ok_or(GraphError::UnknownComponent(id))
    }

    fn check_port(&self, port: PortRef, expected: PortDirection) -> GraphResult<()> {
        let slot = self.slot(port.component)?;
        if port.direction != expected {
            return Err(GraphError::WrongDirection {
                component: slot.name.clone(),
                index: port.index,
                expected,
            });
        }

        let table = slot.ports(expected);
        match table.get(port.index) {
            None => Err(GraphError::PortOutOfRange {
                component: slot.name.clone(),
                direction: expected,
                index: port.index,
                count: table.len(),
            }),
            Some(p) if p.is_connected() => Err(GraphError::PortAlreadyConnected {
                component: slot.name.clone(),
                direction: expected,
                index: port.index,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Check if adding an edge from `from` to `to` would create a cycle.
    fn would_create_cycle(&self, from: ComponentId, to: ComponentId) -> bool {
        // If `to` can reach `from` through existing edges, adding from->to creates a cycle.
        let mut visited = vec![false; self.components.len()];
        let mut stack = vec![to];

        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            let idx = current.index();
            if idx >= self.components.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;

            for conn in &self.connections {
                if conn.upstream.component == current {
                    stack.push(conn.downstream.component);
                }
            }
        }
        false
    }

    // ── Queries ──

    pub fn state(&self) -> GraphState {
        self.state
    }

    /// Number of completed `run_once` calls that did not fail.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn find_component(&self, name: &str) -> Option<ComponentId> {
        self.names.get(name).copied()
    }

    pub fn component_name(&self, id: ComponentId) -> Option<&str> {
        self.components.get(id.index()).map(|s| s.name.as_str())
    }

    pub fn component_kind(&self, id: ComponentId) -> Option<ComponentKind> {
        self.components.get(id.index()).map(|s| s.kind())
    }

    pub fn output_port_count(&self, id: ComponentId) -> GraphResult<usize> {
        Ok(self.slot(id)?.outputs.len())
    }

    pub fn input_port_count(&self, id: ComponentId) -> GraphResult<usize> {
        Ok(self.slot(id)?.inputs.len())
    }

    /// Port table of one direction of a component.
    pub fn ports(&self, id: ComponentId, direction: PortDirection) -> Option<&PortTable> {
        self.components.get(id.index()).map(|s| s.ports(direction))
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    // ── Execution ──

    /// Advance the graph by one step.
    ///
    /// After `End`, every further call returns `End`. After an error, every
    /// further call fails with [`GraphError::Faulted`].
    pub fn run_once(&mut self) -> GraphResult<RunStatus> {
        match self.state {
            GraphState::Ended => return Ok(RunStatus::End),
            GraphState::Faulted => return Err(GraphError::Faulted),
            GraphState::Configuring => {
                if let Err(e) = self.configure() {
                    tracing::error!("Graph configuration failed: {}", e);
                    self.state = GraphState::Faulted;
                    return Err(e);
                }
            }
            GraphState::Running => {}
        }

        match self.consume_next_sink() {
            Ok(status) => {
                self.steps += 1;
                tracing::trace!("Graph step {} -> {:?}", self.steps, status);
                Ok(status)
            }
            Err(e) => {
                tracing::error!("Graph step failed: {}", e);
                self.state = GraphState::Faulted;
                Err(e)
            }
        }
    }

    fn configure(&mut self) -> GraphResult<()> {
        if self.sinks.is_empty() {
            return Err(GraphError::NoSink);
        }

        for sink_id in self.sinks.clone() {
            let slot = &self.components[sink_id.index()];
            let mut upstream_port = None;
            for port in slot.inputs.iter() {
                match port.connection {
                    Some(conn) => upstream_port = Some(self.connections[conn.index()].upstream),
                    None => {
                        return Err(GraphError::UnconnectedSink {
                            component: slot.name.clone(),
                            index: port.index,
                        })
                    }
                }
            }
            let Some(upstream_port) = upstream_port else {
                continue;
            };

            let iterator = self.build_iterator(upstream_port)?;
            if let ComponentInner::Sink(state) = &mut self.components[sink_id.index()].inner {
                state.upstream = Some(iterator);
            }
        }

        for sink_id in self.sinks.clone() {
            let slot = &mut self.components[sink_id.index()];
            if let ComponentInner::Sink(state) = &mut slot.inner {
                state.sink.initialize().map_err(|source| GraphError::Sink {
                    component: slot.name.clone(),
                    source,
                })?;
            }
        }

        self.state = GraphState::Running;
        tracing::info!(
            "Graph running: {} components, {} connections, {} sink(s)",
            self.components.len(),
            self.connections.len(),
            self.sinks.len()
        );
        Ok(())
    }

    /// Build the message iterator behind an output port, creating upstream iterators first.
    fn build_iterator(&mut self, port: PortRef) -> GraphResult<Box<dyn MessageIterator>> {
        let idx = port.component.index();

        let upstream_ports: Vec<PortRef> = match self.components[idx].inner {
            ComponentInner::Filter(_) => self.components[idx]
                .inputs
                .iter()
                .filter_map(|p| p.connection)
                .map(|conn| self.connections[conn.index()].upstream)
                .collect(),
            _ => Vec::new(),
        };

        let mut upstream = Vec::with_capacity(upstream_ports.len());
        for upstream_port in upstream_ports {
            upstream.push(self.build_iterator(upstream_port)?);
        }

        let slot = &mut self.components[idx];
        let result = match &mut slot.inner {
            ComponentInner::Source(source) => source.create_message_iterator(port.index),
            ComponentInner::Filter(filter) => filter.create_message_iterator(port.index, upstream),
            ComponentInner::Sink(_) => Err(anyhow::anyhow!("a sink has no output ports")),
        };
        result.map_err(|source| GraphError::Component {
            component: slot.name.clone(),
            source,
        })
    }

    fn consume_next_sink(&mut self) -> GraphResult<RunStatus> {
        let count = self.sinks.len();
        let mut sink_ended = false;

        for _ in 0..count {
            let sink_id = self.sinks[self.next_sink];
            self.next_sink = (self.next_sink + 1) % count;

            let slot = &mut self.components[sink_id.index()];
            let ComponentInner::Sink(state) = &mut slot.inner else {
                continue;
            };
            if state.ended {
                continue;
            }
            let Some(upstream) = state.upstream.as_mut() else {
                return Err(GraphError::UnconnectedSink {
                    component: slot.name.clone(),
                    index: 0,
                });
            };

            let status = state
                .sink
                .consume(&mut **upstream)
                .map_err(|source| GraphError::Sink {
                    component: slot.name.clone(),
                    source,
                })?;

            match status {
                ConsumeStatus::Ok => return Ok(RunStatus::Ok),
                ConsumeStatus::Again => return Ok(RunStatus::Again),
                ConsumeStatus::End => {
                    tracing::debug!("Sink '{}' ended", slot.name);
                    state.ended = true;
                    state.upstream = None;
                    sink_ended = true;
                    break;
                }
            }
        }

        let all_ended = self.sinks.iter().all(|id| {
            matches!(
                &self.components[id.index()].inner,
                ComponentInner::Sink(state) if state.ended
            )
        });
        if all_ended {
            tracing::info!("All sinks ended after {} steps", self.steps + 1);
            self.state = GraphState::Ended;
            Ok(RunStatus::End)
        } else if sink_ended {
            Ok(RunStatus::Ok)
        } else {
            Ok(RunStatus::Again)
        }
    }

    fn finalize_sinks(&mut self) {
        for slot in &mut self.components {
            if let ComponentInner::Sink(state) = &mut slot.inner {
                if state.finalized {
                    continue;
                }
                // Release the upstream iterator before the sink's own state.
                state.upstream = None;
                state.sink.finalize();
                state.finalized = true;
                tracing::debug!("Finalized sink '{}'", slot.name);
            }
        }
    }
}

impl Drop for Graph<'_> {
    fn drop(&mut self) {
        if self.state == GraphState::Running {
            tracing::warn!("Graph torn down before all sinks ended ({} steps)", self.steps);
        }
        self.finalize_sinks();
        tracing::debug!(
            "Graph dropped ({} components, {} connections)",
            self.components.len(),
            self.connections.len()
        );
    }
}
