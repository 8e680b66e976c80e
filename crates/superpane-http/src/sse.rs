//! Server-sent events, as much of the format as the listen endpoint uses.

use superpane_api::{MutationEvent, PaneError, Result};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental decoder: feed it body chunks as they arrive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every event it completed. Partial lines
    /// (including split UTF-8 sequences) wait for the next chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => trace!(field, "ignoring event field"),
            }
        }
        events
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() && event.is_none() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}

/// What one listen event means for the mutation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenMessage {
    Mutation(MutationEvent),
    Error(PaneError),
    /// The server is closing the channel
    Disconnect,
    Ignore,
}

impl ListenMessage {
    pub fn from_event(event: &SseEvent) -> Self {
        match event.event.as_str() {
            "mutation" => match serde_json::from_str::<MutationEvent>(&event.data) {
                Ok(mutation) => ListenMessage::Mutation(mutation),
                Err(e) => ListenMessage::Error(PaneError::subscription(format!(
                    "Malformed mutation event: {}",
                    e
                ))),
            },
            "channelError" => ListenMessage::Error(PaneError::subscription(event.data.clone())),
            "disconnect" => ListenMessage::Disconnect,
            other => {
                debug!(event = other, "ignoring listen event");
                ListenMessage::Ignore
            }
        }
    }

    pub fn into_item(self) -> Option<Result<MutationEvent>> {
        match self {
            ListenMessage::Mutation(event) => Some(Ok(event)),
            ListenMessage::Error(e) => Some(Err(e)),
            ListenMessage::Disconnect | ListenMessage::Ignore => None,
        }
    }
}
