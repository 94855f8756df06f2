//! Graph-specific error types.

use crate::graph::id::ComponentId;
use crate::graph::port::PortDirection;
use thiserror::Error;

/// Errors that can occur while building or running a [`Graph`](crate::graph::Graph).
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Allocation failure: {0}")]
    Allocation(String),

    #[error("A component named '{0}' already exists in the graph")]
    DuplicateName(String),

    #[error("Component class '{class}' failed to instantiate: {source}")]
    Instantiation {
        class: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unknown component {0:?}")]
    UnknownComponent(ComponentId),

    #[error(
        "{direction:?} port {index} out of range on '{component}' ({count} available)"
    )]
    PortOutOfRange {
        component: String,
        direction: PortDirection,
        index: usize,
        count: usize,
    },

    #[error("{direction:?} port {index} on '{component}' is already connected")]
    PortAlreadyConnected {
        component: String,
        direction: PortDirection,
        index: usize,
    },

    #[error("Port {index} on '{component}' is not an {expected:?} port")]
    WrongDirection {
        component: String,
        index: usize,
        expected: PortDirection,
    },

    #[error("Cannot connect component '{0}' to itself")]
    SelfConnection(String),

    #[error("Connecting '{upstream}' to '{downstream}' would create a cycle")]
    CycleDetected { upstream: String, downstream: String },

    #[error("Graph cannot be modified once it has started running")]
    AlreadyRunning,

    #[error("Input port {index} of sink '{component}' is not connected")]
    UnconnectedSink { component: String, index: usize },

    #[error("Graph has no sink component")]
    NoSink,

    #[error("Component '{component}' failed: {source}")]
    Component {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Sink '{component}' failed: {source}")]
    Sink {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Graph is faulted after an earlier error")]
    Faulted,
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
