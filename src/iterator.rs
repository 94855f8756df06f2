//! `Iterator` adaptors over a trace context.
//!
//! [`TraceBatches`] and [`TraceMessages`] own a [`TraceContext`] whose sink
//! stores each consumed batch, so messages can be read with a plain `for`
//! loop instead of a callback. Both stop for good after end-of-stream or the
//! first error.

use crate::context::{PullStatus, TraceContext, TraceContextBuilder};
use crate::error::Result;
use crate::graph::{ConsumeStatus, IteratorNext, Message, MessageBatch, MessageIterator, SimpleSink};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

type BatchSlot = Rc<RefCell<Option<MessageBatch>>>;

/// Keeps the batch consumed in the last step.
struct CollectingSink {
    slot: BatchSlot,
}

impl SimpleSink for CollectingSink {
    fn consume(&mut self, upstream: &mut dyn MessageIterator) -> anyhow::Result<ConsumeStatus> {
        match upstream.next_batch()? {
            IteratorNext::Batch(batch) => {
                *self.slot.borrow_mut() = Some(batch);
                Ok(ConsumeStatus::Ok)
            }
            IteratorNext::Again => Ok(ConsumeStatus::Again),
            IteratorNext::End => Ok(ConsumeStatus::End),
        }
    }

    fn finalize(&mut self) {
        self.slot.borrow_mut().take();
    }
}

/// Yields every message batch the multiplexer produces, in order.
pub struct TraceBatches {
    context: Option<TraceContext<'static>>,
    slot: BatchSlot,
}

impl TraceBatches {
    /// Open `path` with the default configuration and the global registry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_builder(TraceContextBuilder::new().input(path))
    }

    /// Build the context from a prepared builder.
    pub fn from_builder(builder: TraceContextBuilder<'_>) -> Result<Self> {
        let slot = BatchSlot::default();
        let context = builder.build(CollectingSink { slot: slot.clone() })?;
        Ok(Self {
            context: Some(context),
            slot,
        })
    }

    /// The underlying context, until the iterator is exhausted.
    pub fn context(&self) -> Option<&TraceContext<'static>> {
        self.context.as_ref()
    }

    fn finish(&mut self) {
        if let Some(context) = self.context.take() {
            context.destroy();
        }
    }
}

impl Iterator for TraceBatches {
    type Item = Result<MessageBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let context = self.context.as_mut()?;
        loop {
            match context.pull() {
                Ok(PullStatus::HasMessages) => {
                    if let Some(batch) = self.slot.borrow_mut().take() {
                        return Some(Ok(batch));
                    }
                }
                Ok(PullStatus::EndOfStream) => {
                    self.finish();
                    return None;
                }
                Err(e) => {
                    self.finish();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for TraceBatches {}

/// Yields messages one at a time, flattening [`TraceBatches`].
pub struct TraceMessages {
    batches: TraceBatches,
    pending: VecDeque<Message>,
}

impl TraceMessages {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        TraceBatches::open(path).map(Self::from)
    }

    pub fn from_builder(builder: TraceContextBuilder<'_>) -> Result<Self> {
        TraceBatches::from_builder(builder).map(Self::from)
    }
}

impl From<TraceBatches> for TraceMessages {
    fn from(batches: TraceBatches) -> Self {
        Self {
            batches,
            pending: VecDeque::new(),
        }
    }
}

impl Iterator for TraceMessages {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Some(Ok(message));
            }
            match self.batches.next()? {
                Ok(batch) => self.pending.extend(batch),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl std::iter::FusedIterator for TraceMessages {}
