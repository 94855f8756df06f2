//! Caller-defined sink component.
//!
//! A `SimpleSink` is the caller's end of the graph: three hooks driven by the
//! graph on the caller's thread, never concurrently. The graph does not own
//! the state behind a borrowed sink (`&mut S` implements `SimpleSink` too), so
//! that state only has to outlive the [`TraceContext`](crate::TraceContext).

use crate::graph::component::MessageIterator;

/// Outcome of one `consume` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeStatus {
    /// Progress was made.
    Ok,
    /// Nothing available yet; the graph step reports "try again".
    Again,
    /// This sink is done.
    End,
}

/// Leaf component implemented by the caller.
pub trait SimpleSink {
    /// Called once, before the first `consume`.
    fn initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once per graph step with the iterator connected to the sink's input port.
    fn consume(&mut self, upstream: &mut dyn MessageIterator) -> anyhow::Result<ConsumeStatus>;

    /// Called exactly once when the sink is removed from the graph.
    fn finalize(&mut self) {}
}

impl<S: SimpleSink + ?Sized> SimpleSink for &mut S {
    fn initialize(&mut self) -> anyhow::Result<()> {
        (**self).initialize()
    }

    fn consume(&mut self, upstream: &mut dyn MessageIterator) -> anyhow::Result<ConsumeStatus> {
        (**self).consume(upstream)
    }

    fn finalize(&mut self) {
        (**self).finalize()
    }
}

impl<S: SimpleSink + ?Sized> SimpleSink for Box<S> {
    fn initialize(&mut self) -> anyhow::Result<()> {
        (**self).initialize()
    }

    fn consume(&mut self, upstream: &mut dyn MessageIterator) -> anyhow::Result<ConsumeStatus> {
        (**self).consume(upstream)
    }

    fn finalize(&mut self) {
        (**self).finalize()
    }
}

/// Sink built from three closures and a user-data value, mirroring a callback table.
pub struct CallbackSink<D, I, C, F>
where
    I: FnMut(&mut D) -> anyhow::Result<()>,
    C: FnMut(&mut D, &mut dyn MessageIterator) -> anyhow::Result<ConsumeStatus>,
    F: FnMut(&mut D),
{
    pub user_data: D,
    pub initialize: I,
    pub consume: C,
    pub finalize: F,
}

impl<D, I, C, F> CallbackSink<D, I, C, F>
where
    I: FnMut(&mut D) -> anyhow::Result<()>,
    C: FnMut(&mut D, &mut dyn MessageIterator) -> anyhow::Result<ConsumeStatus>,
    F: FnMut(&mut D),
{
    pub fn new(user_data: D, initialize: I, consume: C, finalize: F) -> Self {
        Self {
            user_data,
            initialize,
            consume,
            finalize,
        }
    }
}

impl<D, I, C, F> SimpleSink for CallbackSink<D, I, C, F>
where
    I: FnMut(&mut D) -> anyhow::Result<()>,
    C: FnMut(&mut D, &mut dyn MessageIterator) -> anyhow::Result<ConsumeStatus>,
    F: FnMut(&mut D),
{
    fn initialize(&mut self) -> anyhow::Result<()> {
        (self.initialize)(&mut self.user_data)
    }

    fn consume(&mut self, upstream: &mut dyn MessageIterator) -> anyhow::Result<ConsumeStatus> {
        (self.consume)(&mut self.user_data, upstream)
    }

    fn finalize(&mut self) {
        (self.finalize)(&mut self.user_data)
    }
}
