//! Component graph: sources, filters and caller-defined sinks linked by ports.
//!
//! Messages flow downstream and are pulled from the sink end:
//!
//! ```text
//! [source] out0 ──► in0 [filter] out0 ──► in0 [sink]
//!          out1 ──► in1
//! ```
//!
//! # Design
//!
//! - **Classes live in plugins**: source and filter classes are resolved by
//!   name through a [`PluginRegistry`] and shared as `Arc`s.
//! - **Components live in the graph**: the [`Graph`] owns every instance;
//!   callers address them by [`ComponentId`].
//! - **Positional ports**: ports are ordered tables; connections address them
//!   by index with explicit bounds checks.
//! - **Pull execution**: [`Graph::run_once`] drives one sink step on the
//!   caller's thread. No threads are spawned.

pub mod component;
pub mod error;
pub mod executor;
pub mod id;
pub mod message;
pub mod plugin;
pub mod port;
pub mod sink;
pub mod value;

pub use component::{
    ComponentKind, FilterComponent, FilterComponentClass, IteratorNext, MessageIterator,
    SourceComponent, SourceComponentClass,
};
pub use error::{GraphError, GraphResult};
pub use executor::{Connection, Graph, GraphState, RunStatus};
pub use id::{ComponentId, ConnectionId, PortRef};
pub use message::{EventMessage, Message, MessageBatch, MessageType, StreamId};
pub use plugin::{Plugin, PluginBuilder, PluginRegistry, PluginSet};
pub use port::{Port, PortDirection, PortTable};
pub use sink::{CallbackSink, ConsumeStatus, SimpleSink};
pub use value::{ConfigValue, ValueMap};
