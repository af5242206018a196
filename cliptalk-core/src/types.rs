use crate::audio_buffer::AudioBuffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Immutable snippet of user text travelling through the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextItem(Arc<str>);

impl TextItem {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 20 characters followed by an ellipsis, for log lines
    pub fn preview(&self) -> String {
        let mut preview: String = self.0.chars().take(20).collect();
        preview.push_str("...");
        preview
    }
}

impl From<&str> for TextItem {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for TextItem {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for TextItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Language of a text item, decided by the synthesis worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageTag {
    En,
    Fa,
}

impl LanguageTag {
    pub fn code(&self) -> &'static str {
        match self {
            LanguageTag::En => "en",
            LanguageTag::Fa => "fa",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(LanguageTag::En),
            "fa" => Some(LanguageTag::Fa),
            _ => None,
        }
    }

    /// Whether the text reads right to left
    pub fn is_rtl(&self) -> bool {
        matches!(self, LanguageTag::Fa)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A text whose audio is being (or has been) produced, waiting for the listener
#[derive(Debug, Clone)]
pub struct PendingDelivery {
    pub text: TextItem,
    pub lang: LanguageTag,
    pub buffer: AudioBuffer,
}

/// Occupancy snapshot pushed to the depth observer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDepthReport {
    pub queue: String,
    pub size: usize,
    pub capacity: usize,
}

impl fmt::Display for QueueDepthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.queue, self.size, self.capacity)
    }
}
