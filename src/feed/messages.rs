//! Real-time channel wire messages
//!
//! Server → client messages are JSON objects tagged by `type`;
//! client → server commands are tagged by `action` and omit absent fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::events::ChanEvent;

/// Message pushed by the server
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    Bar(BarMessage),
    Event(EventMessage),
    Snapshot(SnapshotMessage),
    ReplayStatus(ReplayStatus),
    Error(ErrorMessage),
}

/// OHLCV bar update
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BarMessage {
    pub idx: u64,
    /// Epoch seconds
    pub ts: f64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    #[serde(default)]
    pub v: Option<f64>,
    #[serde(default)]
    pub tf: Option<String>,
    #[serde(default)]
    pub stream_id: Option<String>,
}

/// Domain event envelope; variant fields travel in `payload`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EventMessage {
    pub event_type: String,
    pub bar_idx: u64,
    pub bar_ts: f64,
    pub seq: u64,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub event_id: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub tf: Option<String>,
    #[serde(default)]
    pub stream_id: Option<String>,
}

fn default_schema_version() -> u32 {
    1
}

impl EventMessage {
    /// Flatten the envelope into a typed event
    ///
    /// Payload keys are laid over the common fields, so a payload may override them.
    /// Fails for event types outside the known set.
    pub fn to_chan_event(&self) -> Result<ChanEvent> {
        let mut flat = Map::with_capacity(self.payload.len() + 8);
        flat.insert("event_type".into(), Value::from(self.event_type.as_str()));
        flat.insert("bar_idx".into(), Value::from(self.bar_idx));
        flat.insert("bar_ts".into(), Value::from(self.bar_ts));
        flat.insert("seq".into(), Value::from(self.seq));
        flat.insert("event_id".into(), Value::from(self.event_id.as_str()));
        flat.insert("schema_version".into(), Value::from(self.schema_version));
        if let Some(tf) = &self.tf {
            flat.insert("tf".into(), Value::from(tf.as_str()));
        }
        if let Some(stream_id) = &self.stream_id {
            flat.insert("stream_id".into(), Value::from(stream_id.as_str()));
        }
        flat.extend(self.payload.iter().map(|(k, v)| (k.clone(), v.clone())));

        Ok(serde_json::from_value(Value::Object(flat))?)
    }
}

/// Point-in-time summary sent on (re)subscribe
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapshotMessage {
    pub bar_idx: u64,
    #[serde(default)]
    pub strokes: Vec<Value>,
    #[serde(default)]
    pub event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorMessage {
    pub message: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayMode {
    #[default]
    Idle,
    Paused,
    Playing,
    Done,
}

/// Replay progress; the server copy is authoritative
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ReplayStatus {
    pub mode: ReplayMode,
    pub current_idx: u64,
    pub total_bars: u64,
    pub speed: f64,
}

impl Default for ReplayStatus {
    fn default() -> Self {
        Self {
            mode: ReplayMode::Idle,
            current_idx: 0,
            total_bars: 0,
            speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Subscribe,
    Unsubscribe,
    ReplayStart,
    ReplayStep,
    ReplaySeek,
    ReplayPlay,
    ReplayPause,
}

/// Command sent to the server
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WsCommand {
    pub action: CommandAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seek_idx: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl WsCommand {
    fn bare(action: CommandAction) -> Self {
        Self {
            action,
            symbol: None,
            tf: None,
            step_count: None,
            seek_idx: None,
            speed: None,
        }
    }

    pub fn subscribe(symbol: impl Into<String>, tf: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            tf: Some(tf.into()),
            ..Self::bare(CommandAction::Subscribe)
        }
    }

    pub fn unsubscribe(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Self::bare(CommandAction::Unsubscribe)
        }
    }

    pub fn replay_start(symbol: impl Into<String>, tf: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            tf: Some(tf.into()),
            ..Self::bare(CommandAction::ReplayStart)
        }
    }

    pub fn replay_step(count: u32) -> Self {
        Self {
            step_count: Some(count),
            ..Self::bare(CommandAction::ReplayStep)
        }
    }

    pub fn replay_seek(bar_idx: u64) -> Self {
        Self {
            seek_idx: Some(bar_idx),
            ..Self::bare(CommandAction::ReplaySeek)
        }
    }

    pub fn replay_play(speed: f64) -> Self {
        Self {
            speed: Some(speed),
            ..Self::bare(CommandAction::ReplayPlay)
        }
    }

    pub fn replay_pause() -> Self {
        Self::bare(CommandAction::ReplayPause)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
