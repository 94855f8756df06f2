//! Component abstraction for the graph.
//!
//! Two layers:
//! - **Component classes**: named, shareable templates registered inside a
//!   [`Plugin`](crate::graph::Plugin). A class instantiates components.
//! - **Component instances**: owned by the graph. They report their port
//!   counts and, once the graph runs, hand out [`MessageIterator`]s.
//!
//! The third component kind, the sink, is supplied directly by the caller as
//! a [`SimpleSink`](crate::graph::SimpleSink) and has no class.

use crate::graph::message::MessageBatch;
use crate::graph::value::ValueMap;
use crate::logging::LogLevel;

/// Result of one message-iterator step.
#[derive(Debug)]
pub enum IteratorNext {
    /// One or more messages are available.
    Batch(MessageBatch),
    /// No message right now; call again.
    Again,
    /// The iterator is exhausted.
    End,
}

/// Pull-based producer of message batches.
pub trait MessageIterator {
    fn next_batch(&mut self) -> anyhow::Result<IteratorNext>;
}

/// Template for source components (produce messages only).
pub trait SourceComponentClass: Send + Sync {
    /// Class name, unique within its plugin.
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    /// Create a source instance from its parameters.
    fn instantiate(
        &self,
        params: &ValueMap,
        log_level: LogLevel,
    ) -> anyhow::Result<Box<dyn SourceComponent>>;
}

/// Template for filter components (consume and produce messages).
pub trait FilterComponentClass: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    fn instantiate(
        &self,
        params: &ValueMap,
        log_level: LogLevel,
    ) -> anyhow::Result<Box<dyn FilterComponent>>;
}

/// A source instance living inside a graph.
pub trait SourceComponent {
    fn output_port_count(&self) -> usize;

    /// Called once per connected output port when the graph starts running.
    fn create_message_iterator(&mut self, port: usize) -> anyhow::Result<Box<dyn MessageIterator>>;
}

/// A filter instance living inside a graph.
pub trait FilterComponent {
    fn input_port_count(&self) -> usize;

    fn output_port_count(&self) -> usize;

    /// Called after input port `index` is connected. A filter may add ports here;
    /// the graph re-reads `input_port_count` afterwards.
    fn input_port_connected(&mut self, _index: usize) {}

    /// Called once per connected output port when the graph starts running.
    /// `upstream` holds the iterators of every connected input port, in port order.
    fn create_message_iterator(
        &mut self,
        port: usize,
        upstream: Vec<Box<dyn MessageIterator>>,
    ) -> anyhow::Result<Box<dyn MessageIterator>>;
}

/// Kind of a component slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Source,
    Filter,
    Sink,
}

impl ComponentKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentKind::Source => "source",
            ComponentKind::Filter => "filter",
            ComponentKind::Sink => "sink",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
