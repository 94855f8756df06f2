//! # tracegraph: Embeddable Trace Processing Graph
//!
//! Assembles a three-stage graph that turns stored trace streams into one
//! time-ordered message stream delivered to a caller-defined sink:
//!
//! ```text
//! [ctf.fs "input"] ──► [utils.muxer "muxer"] ──► [SimpleSink "simple sink"]
//! ```
//!
//! ## Architecture
//!
//! - **Graph**: components, positional ports and the single-step scheduler
//!   ([`graph::Graph`])
//! - **Plugins**: named capability namespaces holding source and filter
//!   classes, resolved through a [`PluginRegistry`]
//! - **Context**: [`TraceContext`] builds and wires the graph, drives it with a
//!   blocking [`pull`](TraceContext::pull) and tears it down on drop
//! - **Iterators**: [`TraceBatches`] / [`TraceMessages`] for callers that prefer
//!   a `for` loop over a sink
//!
//! Everything runs on the caller's thread. Construction never terminates the
//! process; each failure is returned as a [`TraceError`] after every handle
//! acquired so far has been released.
//!
//! ## Example
//!
//! ```ignore
//! use tracegraph::{ConsumeStatus, IteratorNext, MessageIterator, PullStatus, SimpleSink, TraceContext};
//!
//! struct Printer;
//!
//! impl SimpleSink for Printer {
//!     fn consume(&mut self, upstream: &mut dyn MessageIterator) -> anyhow::Result<ConsumeStatus> {
//!         Ok(match upstream.next_batch()? {
//!             IteratorNext::Batch(batch) => {
//!                 batch.iter().for_each(|m| println!("{m}"));
//!                 ConsumeStatus::Ok
//!             }
//!             IteratorNext::Again => ConsumeStatus::Again,
//!             IteratorNext::End => ConsumeStatus::End,
//!         })
//!     }
//! }
//!
//! fn main() -> tracegraph::Result<()> {
//!     tracegraph::logging::init();
//!     let mut ctx = TraceContext::create("/path/to/trace", Printer)?;
//!     while ctx.pull()? == PullStatus::HasMessages {}
//!     ctx.destroy();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod iterator;
pub mod logging;

// Re-export commonly used types
pub use config::GraphConfig;
pub use context::{PullStatus, TraceContext, TraceContextBuilder};
pub use error::{Result, ResultExt, TraceError};
pub use graph::{
    CallbackSink, ConfigValue, ConsumeStatus, IteratorNext, Message, MessageBatch,
    MessageIterator, Plugin, PluginRegistry, PluginSet, SimpleSink, ValueMap,
};
pub use iterator::{TraceBatches, TraceMessages};
pub use logging::LogLevel;
