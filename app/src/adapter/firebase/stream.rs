//! Server-sent events as produced by the Realtime Database REST streaming API.

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEvent {
    pub event: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FirebaseEvent {
    Put { path: String, data: Value },
    Patch { path: String, data: Map<String, Value> },
    KeepAlive,
    Cancel(String),
    AuthRevoked,
    Ignored(String),
}

/// Splits a byte stream into events. Chunks may end anywhere, incomplete events
/// are kept until the next chunk arrives.
#[derive(Default)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
}

#[derive(Deserialize)]
struct Payload<T> {
    path: String,
    data: T,
}

impl EventStreamDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawEvent> {
        self.buffer.extend(chunk.iter().filter(|b| **b != b'\r'));

        let mut events = vec![];
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }

        events
    }
}

fn parse_block(block: &str) -> Option<RawEvent> {
    let mut event = RawEvent::default();
    let mut data_lines = vec![];

    for line in block.lines() {
        //comment line
        if line.starts_with(':') {
            continue;
        }

        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);

        match field {
            "event" => event.event = value.to_owned(),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if event.event.is_empty() && data_lines.is_empty() {
        return None;
    }

    event.data = data_lines.join("\n");
    Some(event)
}

impl FirebaseEvent {
    pub fn parse(raw: &RawEvent) -> anyhow::Result<Self> {
        match raw.event.as_str() {
            "put" => {
                let payload: Payload<Value> =
                    serde_json::from_str(&raw.data).with_context(|| format!("Invalid put event: {}", raw.data))?;
                Ok(FirebaseEvent::Put {
                    path: payload.path,
                    data: payload.data,
                })
            }
            "patch" => {
                let payload: Payload<Map<String, Value>> =
                    serde_json::from_str(&raw.data).with_context(|| format!("Invalid patch event: {}", raw.data))?;
                Ok(FirebaseEvent::Patch {
                    path: payload.path,
                    data: payload.data,
                })
            }
            "keep-alive" => Ok(FirebaseEvent::KeepAlive),
            "cancel" => Ok(FirebaseEvent::Cancel(raw.data.clone())),
            "auth_revoked" => Ok(FirebaseEvent::AuthRevoked),
            other => Ok(FirebaseEvent::Ignored(other.to_owned())),
        }
    }
}
