//! Test data builders: trace directories on disk and a recording sink

use super::plugins::STREAM_EXTENSION;
use std::io::Write;
use tempfile::TempDir;
use tracegraph::{ConsumeStatus, IteratorNext, Message, MessageIterator, SimpleSink};

/// Builder for a temporary trace directory holding one file per stream
#[derive(Default)]
pub struct TraceDirBuilder {
    streams: Vec<Vec<(u64, String)>>,
}

impl TraceDirBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream of `(timestamp, event name)` records
    pub fn stream(mut self, events: &[(u64, &str)]) -> Self {
        self.streams.push(
            events
                .iter()
                .map(|(ts, name)| (*ts, name.to_string()))
                .collect(),
        );
        self
    }

    pub fn build(self) -> TempDir {
        let dir = tempfile::tempdir().expect("create trace dir");
        for (i, events) in self.streams.iter().enumerate() {
            let path = dir.path().join(format!("stream-{i}.{STREAM_EXTENSION}"));
            let mut file = std::fs::File::create(&path).expect("create stream file");
            for (seq, (ts, name)) in events.iter().enumerate() {
                let record = serde_json::json!({
                    "timestamp": ts,
                    "name": name,
                    "fields": { "seq": seq, "cpu": i },
                });
                writeln!(file, "{record}").expect("write record");
            }
        }
        dir
    }
}

/// Single-stream trace with three events: five messages including stream boundaries
pub fn five_message_trace() -> TempDir {
    TraceDirBuilder::new()
        .stream(&[(100, "sched_switch"), (200, "sched_wakeup"), (300, "irq_handler_entry")])
        .build()
}

/// Sink that records every hook invocation and every message
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub messages: Vec<Message>,
    pub initialized: u32,
    pub consume_calls: u32,
    pub finalized: u32,
}

impl RecordingSink {
    pub fn event_names(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(Message::as_event)
            .map(|e| e.name.as_str())
            .collect()
    }
}

impl SimpleSink for RecordingSink {
    fn initialize(&mut self) -> anyhow::Result<()> {
        self.initialized += 1;
        Ok(())
    }

    fn consume(&mut self, upstream: &mut dyn MessageIterator) -> anyhow::Result<ConsumeStatus> {
        self.consume_calls += 1;
        Ok(match upstream.next_batch()? {
            IteratorNext::Batch(batch) => {
                self.messages.extend(batch);
                ConsumeStatus::Ok
            }
            IteratorNext::Again => ConsumeStatus::Again,
            IteratorNext::End => ConsumeStatus::End,
        })
    }

    fn finalize(&mut self) {
        self.finalized += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_dir_builder() {
        let dir = TraceDirBuilder::new()
            .stream(&[(1, "a")])
            .stream(&[(2, "b"), (3, "c")])
            .build();
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 2);
        let second = std::fs::read_to_string(dir.path().join("stream-1.jsonl")).unwrap();
        assert_eq!(second.lines().count(), 2);
    }
}
