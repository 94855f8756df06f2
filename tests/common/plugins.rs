//! Test capability providers: a `ctf.fs` source reading JSON-lines stream
//! files and a `utils.muxer` filter merging its inputs by timestamp.

use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracegraph::graph::{
    EventMessage, FilterComponent, FilterComponentClass, SourceComponent, SourceComponentClass,
    StreamId,
};
use tracegraph::{ConfigValue, IteratorNext, LogLevel, Message, MessageIterator, Plugin, ValueMap};

/// Extension of stream files inside a trace directory.
pub const STREAM_EXTENSION: &str = "jsonl";

/// Counts component instances alive across all graphs.
#[derive(Clone, Default)]
pub struct LiveCounter(Arc<AtomicUsize>);

impl LiveCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn guard(&self) -> LiveGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        LiveGuard(self.0.clone())
    }
}

/// Decrements its counter on drop.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Deserialize)]
struct EventRecord {
    timestamp: u64,
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, serde_json::Value>,
}

fn json_to_value(value: serde_json::Value) -> ConfigValue {
    match value {
        serde_json::Value::Null => ConfigValue::Null,
        serde_json::Value::Bool(b) => ConfigValue::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => ConfigValue::Int(i),
            None => ConfigValue::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => ConfigValue::String(s),
        serde_json::Value::Array(items) => {
            ConfigValue::Array(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => ConfigValue::Map(
            map.into_iter()
                .fold(ValueMap::new(), |acc, (k, v)| acc.with(k, json_to_value(v))),
        ),
    }
}

/// Decode one stream file into its full message sequence.
fn read_stream(path: &Path, stream: StreamId) -> anyhow::Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)?;
    let mut events = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: EventRecord = serde_json::from_str(line).map_err(|e| {
            anyhow::anyhow!("{}:{}: {}", path.display(), line_no + 1, e)
        })?;
        events.push(Message::Event(EventMessage {
            stream,
            timestamp: Some(record.timestamp),
            name: record.name,
            fields: record
                .fields
                .into_iter()
                .fold(ValueMap::new(), |acc, (k, v)| acc.with(k, json_to_value(v))),
        }));
    }

    let first = events.first().and_then(Message::timestamp);
    let last = events.last().and_then(Message::timestamp);
    let mut messages = Vec::with_capacity(events.len() + 2);
    messages.push(Message::StreamBeginning {
        stream,
        timestamp: first,
    });
    messages.extend(events);
    messages.push(Message::StreamEnd {
        stream,
        timestamp: last,
    });
    Ok(messages)
}

/// `ctf.fs`: one output port per `*.jsonl` file in the directory named by `inputs[0]`.
#[derive(Clone, Default)]
pub struct FsSourceClass {
    /// `Again` results returned before every message.
    pub stalls: u32,
    pub live: LiveCounter,
}

impl SourceComponentClass for FsSourceClass {
    fn name(&self) -> &str {
        "fs"
    }

    fn description(&self) -> Option<&str> {
        Some("Read JSON-lines trace streams from a directory")
    }

    fn instantiate(
        &self,
        params: &ValueMap,
        log_level: LogLevel,
    ) -> anyhow::Result<Box<dyn SourceComponent>> {
        let dir = params
            .get("inputs")
            .and_then(ConfigValue::as_array)
            .and_then(|items| items.first())
            .and_then(ConfigValue::as_str)
            .ok_or_else(|| anyhow::anyhow!("missing 'inputs' parameter"))?;

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("cannot open trace directory {}: {}", dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == STREAM_EXTENSION))
            .collect();
        files.sort();

        let streams = files
            .iter()
            .enumerate()
            .map(|(i, path)| read_stream(path, StreamId(i as u64)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        if log_level.enables(tracing::Level::DEBUG) {
            tracing::debug!("fs source opened {} with {} stream(s)", dir, streams.len());
        }

        Ok(Box::new(FsSource {
            streams: streams.into_iter().map(Some).collect(),
            stalls: self.stalls,
            _live: self.live.guard(),
        }))
    }
}

struct FsSource {
    streams: Vec<Option<Vec<Message>>>,
    stalls: u32,
    _live: LiveGuard,
}

impl SourceComponent for FsSource {
    fn output_port_count(&self) -> usize {
        self.streams.len()
    }

    fn create_message_iterator(&mut self, port: usize) -> anyhow::Result<Box<dyn MessageIterator>> {
        let messages = self
            .streams
            .get_mut(port)
            .and_then(Option::take)
            .ok_or_else(|| anyhow::anyhow!("no stream behind output port {}", port))?;
        Ok(Box::new(StreamIterator {
            messages: messages.into(),
            stalls: self.stalls,
            stalled: 0,
        }))
    }
}

/// Emits one message per batch, preceded by `stalls` empty `Again` results.
struct StreamIterator {
    messages: VecDeque<Message>,
    stalls: u32,
    stalled: u32,
}

impl MessageIterator for StreamIterator {
    fn next_batch(&mut self) -> anyhow::Result<IteratorNext> {
        if self.messages.is_empty() {
            return Ok(IteratorNext::End);
        }
        if self.stalled < self.stalls {
            self.stalled += 1;
            return Ok(IteratorNext::Again);
        }
        self.stalled = 0;
        Ok(self
            .messages
            .pop_front()
            .map_or(IteratorNext::End, |m| IteratorNext::Batch(vec![m])))
    }
}

/// `utils.muxer`: always keeps one free input port, up to `max_inputs`.
#[derive(Clone, Default)]
pub struct MuxerClass {
    pub max_inputs: Option<usize>,
    /// Expose no output port, so nothing can be wired to a sink.
    pub no_output: bool,
    /// Refuse to instantiate.
    pub broken: bool,
    pub live: LiveCounter,
}

impl FilterComponentClass for MuxerClass {
    fn name(&self) -> &str {
        "muxer"
    }

    fn instantiate(
        &self,
        _params: &ValueMap,
        _log_level: LogLevel,
    ) -> anyhow::Result<Box<dyn FilterComponent>> {
        anyhow::ensure!(!self.broken, "muxer class is not usable");
        Ok(Box::new(Muxer {
            inputs: 1,
            max_inputs: self.max_inputs,
            outputs: if self.no_output { 0 } else { 1 },
            _live: self.live.guard(),
        }))
    }
}

struct Muxer {
    inputs: usize,
    max_inputs: Option<usize>,
    outputs: usize,
    _live: LiveGuard,
}

impl FilterComponent for Muxer {
    fn input_port_count(&self) -> usize {
        self.inputs
    }

    fn output_port_count(&self) -> usize {
        self.outputs
    }

    fn input_port_connected(&mut self, index: usize) {
        let can_grow = self.max_inputs.map_or(true, |max| self.inputs < max);
        if index + 1 == self.inputs && can_grow {
            self.inputs += 1;
        }
    }

    fn create_message_iterator(
        &mut self,
        _port: usize,
        upstream: Vec<Box<dyn MessageIterator>>,
    ) -> anyhow::Result<Box<dyn MessageIterator>> {
        Ok(Box::new(MuxIterator {
            inputs: upstream
                .into_iter()
                .map(|iterator| MuxInput {
                    iterator,
                    queue: VecDeque::new(),
                    ended: false,
                })
                .collect(),
        }))
    }
}

struct MuxInput {
    iterator: Box<dyn MessageIterator>,
    queue: VecDeque<Message>,
    ended: bool,
}

/// Merges inputs by timestamp; ties go to the lower input index.
struct MuxIterator {
    inputs: Vec<MuxInput>,
}

impl MessageIterator for MuxIterator {
    fn next_batch(&mut self) -> anyhow::Result<IteratorNext> {
        for input in &mut self.inputs {
            while input.queue.is_empty() && !input.ended {
                match input.iterator.next_batch()? {
                    IteratorNext::Batch(batch) => input.queue.extend(batch),
                    IteratorNext::Again => return Ok(IteratorNext::Again),
                    IteratorNext::End => input.ended = true,
                }
            }
        }

        let next = self
            .inputs
            .iter()
            .enumerate()
            .filter_map(|(i, input)| input.queue.front().map(|m| (m.timestamp().unwrap_or(0), i)))
            .min();

        Ok(match next {
            Some((_, i)) => self.inputs[i]
                .queue
                .pop_front()
                .map_or(IteratorNext::Again, |m| IteratorNext::Batch(vec![m])),
            None => IteratorNext::End,
        })
    }
}

/// Build the two namespaces the default configuration resolves.
pub fn ctf_plugin(source: FsSourceClass) -> Plugin {
    Plugin::builder("ctf")
        .description("Trace readers")
        .source(source)
        .build()
}

pub fn utils_plugin(muxer: MuxerClass) -> Plugin {
    Plugin::builder("utils")
        .description("Graph utilities")
        .filter(muxer)
        .build()
}
