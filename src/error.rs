//! Error handling for tracegraph
//!
//! This module defines the error taxonomy reported while assembling and
//! driving a trace graph, and a Result alias used throughout the crate.
//! Graph-level failures live in [`crate::graph::GraphError`] and are wrapped
//! here with the construction step they happened in.

use crate::graph::GraphError;
use thiserror::Error;

/// Main error type for tracegraph operations
#[derive(Error, Debug)]
pub enum TraceError {
    /// Memory for the graph's component or connection tables could not be reserved
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    /// The empty graph could not be created
    #[error("Graph creation failure: {0}")]
    GraphCreation(#[source] GraphError),

    /// A capability namespace (plugin) is not registered
    #[error("Capability not found: plugin '{plugin}'")]
    CapabilityNotFound { plugin: String },

    /// The namespace resolved but does not provide the requested class
    #[error("Component class '{class}' not found in plugin '{plugin}'")]
    ComponentClassNotFound { plugin: String, class: String },

    /// A component could not be added to the graph
    #[error("Failed to create component '{name}': {source}")]
    ComponentCreation {
        name: String,
        #[source]
        source: GraphError,
    },

    /// The source component exposes no output port to wire
    #[error("Source component '{component}' has no output ports")]
    NoOutputPorts { component: String },

    /// Two components could not be linked
    #[error("Failed to connect '{upstream}' to '{downstream}': {source}")]
    PortConnection {
        upstream: String,
        downstream: String,
        #[source]
        source: GraphError,
    },

    /// A pull step failed after the graph was assembled
    #[error("Execution error: {0}")]
    Execution(#[from] GraphError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TraceError>,
    },
}

impl TraceError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TraceError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Wrap a component-insertion failure, keeping allocation failures distinct.
    pub(crate) fn component_creation(name: impl Into<String>, source: GraphError) -> Self {
        match source {
            GraphError::Allocation(what) => TraceError::AllocationFailure(what),
            source => TraceError::ComponentCreation {
                name: name.into(),
                source,
            },
        }
    }

    /// Wrap a port-connection failure, keeping allocation failures distinct.
    pub(crate) fn port_connection(
        upstream: impl Into<String>,
        downstream: impl Into<String>,
        source: GraphError,
    ) -> Self {
        match source {
            GraphError::Allocation(what) => TraceError::AllocationFailure(what),
            source => TraceError::PortConnection {
                upstream: upstream.into(),
                downstream: downstream.into(),
                source,
            },
        }
    }

    /// The innermost error, with every `WithContext` layer removed.
    pub fn root(&self) -> &TraceError {
        match self {
            TraceError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for tracegraph operations
pub type Result<T> = std::result::Result<T, TraceError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, GraphError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TraceError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| TraceError::from(e).with_context(f()))
    }
}
