//! Trace messages flowing from sources through filters to sinks.

use crate::graph::value::ValueMap;
use std::fmt;

/// Identifies one decoded stream within a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StreamId(pub u64);

/// Discriminant of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    StreamBeginning,
    StreamEnd,
    Event,
    PacketBeginning,
    PacketEnd,
    DiscardedEvents,
    DiscardedPackets,
    MessageIteratorInactivity,
}

/// Payload of an event message.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage {
    pub stream: StreamId,
    /// Default clock snapshot in nanoseconds.
    pub timestamp: Option<u64>,
    pub name: String,
    pub fields: ValueMap,
}

/// A discrete unit of trace data.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    StreamBeginning {
        stream: StreamId,
        timestamp: Option<u64>,
    },
    StreamEnd {
        stream: StreamId,
        timestamp: Option<u64>,
    },
    PacketBeginning {
        stream: StreamId,
        timestamp: Option<u64>,
    },
    PacketEnd {
        stream: StreamId,
        timestamp: Option<u64>,
    },
    Event(EventMessage),
    DiscardedEvents {
        stream: StreamId,
        timestamp: Option<u64>,
        count: Option<u64>,
    },
    DiscardedPackets {
        stream: StreamId,
        timestamp: Option<u64>,
        count: Option<u64>,
    },
    MessageIteratorInactivity {
        timestamp: u64,
    },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::StreamBeginning { .. } => MessageType::StreamBeginning,
            Message::StreamEnd { .. } => MessageType::StreamEnd,
            Message::PacketBeginning { .. } => MessageType::PacketBeginning,
            Message::PacketEnd { .. } => MessageType::PacketEnd,
            Message::Event(_) => MessageType::Event,
            Message::DiscardedEvents { .. } => MessageType::DiscardedEvents,
            Message::DiscardedPackets { .. } => MessageType::DiscardedPackets,
            Message::MessageIteratorInactivity { .. } => MessageType::MessageIteratorInactivity,
        }
    }

    /// Default clock snapshot in nanoseconds, if the message carries one.
    pub fn timestamp(&self) -> Option<u64> {
        match self {
            Message::StreamBeginning { timestamp, .. }
            | Message::StreamEnd { timestamp, .. }
            | Message::PacketBeginning { timestamp, .. }
            | Message::PacketEnd { timestamp, .. }
            | Message::DiscardedEvents { timestamp, .. }
            | Message::DiscardedPackets { timestamp, .. } => *timestamp,
            Message::Event(event) => event.timestamp,
            Message::MessageIteratorInactivity { timestamp } => Some(*timestamp),
        }
    }

    /// Stream this message belongs to. Inactivity messages belong to none.
    pub fn stream(&self) -> Option<StreamId> {
        match self {
            Message::StreamBeginning { stream, .. }
            | Message::StreamEnd { stream, .. }
            | Message::PacketBeginning { stream, .. }
            | Message::PacketEnd { stream, .. }
            | Message::DiscardedEvents { stream, .. }
            | Message::DiscardedPackets { stream, .. } => Some(*stream),
            Message::Event(event) => Some(event.stream),
            Message::MessageIteratorInactivity { .. } => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventMessage> {
        match self {
            Message::Event(event) => Some(event),
            _ => None,
        }
    }

    pub fn into_event(self) -> Option<EventMessage> {
        match self {
            Message::Event(event) => Some(event),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.timestamp() {
            Some(ts) => write!(f, "[{ts}] ")?,
            None => write!(f, "[-] ")?,
        }
        match self {
            Message::Event(event) => write!(f, "{} (stream {})", event.name, event.stream.0),
            other => write!(f, "{:?}", other.message_type()),
        }
    }
}

/// Messages returned by one iterator step.
pub type MessageBatch = Vec<Message>;
