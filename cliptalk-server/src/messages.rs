//! Listener protocol
//!
//! Every frame is a JSON object discriminated by its `action` field.

use cliptalk_core::{LanguageTag, QueueDepthReport};
use serde::{Deserialize, Serialize};

/// Server → listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A new utterance is selected; its audio is at `GET /audio`
    NewText { text: String, lang: LanguageTag },

    QueueDepth {
        queue: String,
        size: usize,
        capacity: usize,
    },

    ToggleMonitoring { state: bool },
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&QueueDepthReport> for ServerEvent {
    fn from(report: &QueueDepthReport) -> Self {
        ServerEvent::QueueDepth {
            queue: report.queue.clone(),
            size: report.size,
            capacity: report.capacity,
        }
    }
}

/// Listener → server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Current utterance finished or was skipped
    AdvanceToNext,

    SetMonitoring { state: bool },
}

impl ClientMessage {
    /// Parse a text frame. Bare `next`/`ended` and `on`/`off` words are
    /// accepted alongside the JSON form.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        match text.trim() {
            "next" | "ended" => Ok(ClientMessage::AdvanceToNext),
            "on" => Ok(ClientMessage::SetMonitoring { state: true }),
            "off" => Ok(ClientMessage::SetMonitoring { state: false }),
            other => serde_json::from_str(other),
        }
    }
}
