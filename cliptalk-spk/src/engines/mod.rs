//! TTS engine implementations

pub mod native;
pub mod api;
pub mod piper;
pub mod custom;
mod process;

use crate::config::{EngineKind, SpeechConfig, DEFAULT_ENGINE_KEY};
use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;
use cliptalk_core::LanguageTag;
use futures_util::stream::BoxStream;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub use api::CloudTtsEngine;
pub use custom::CustomTtsEngine;
pub use native::NativeTtsEngine;
pub use piper::PiperTtsEngine;

/// Audio produced by one synthesis call, chunk by chunk.
///
/// An `Err` item ends the attempt; chunks yielded before it were already
/// written out.
pub type AudioStream = BoxStream<'static, Result<Bytes, SpeechError>>;

/// Trait for TTS engines
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Start synthesizing `text`; failures to start are returned directly
    async fn synthesize(&self, text: &str, lang: LanguageTag) -> Result<AudioStream, SpeechError>;

    /// Media type of the produced audio
    fn media_type(&self) -> &str;

    /// Check if engine is available
    fn is_available(&self) -> bool;

    /// Get engine name
    fn name(&self) -> &str;
}

/// Language to backend lookup with a default fallback, built once at startup
#[derive(Clone)]
pub struct BackendTable {
    default: Arc<dyn SynthesisBackend>,
    by_lang: HashMap<LanguageTag, Arc<dyn SynthesisBackend>>,
}

impl BackendTable {
    pub fn new(default: Arc<dyn SynthesisBackend>) -> Self {
        Self {
            default,
            by_lang: HashMap::new(),
        }
    }

    /// Route `lang` to `backend` instead of the default
    pub fn with_language(mut self, lang: LanguageTag, backend: Arc<dyn SynthesisBackend>) -> Self {
        self.by_lang.insert(lang, backend);
        self
    }

    /// Resolve every engine named in the configuration.
    ///
    /// Each engine kind is constructed once and shared by the languages routed to it.
    pub fn from_config(config: &SpeechConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        let mut built: HashMap<EngineKind, Arc<dyn SynthesisBackend>> = HashMap::new();
        let mut resolve = |kind: EngineKind| -> Result<Arc<dyn SynthesisBackend>, SpeechError> {
            if let Some(backend) = built.get(&kind) {
                return Ok(backend.clone());
            }
            let backend = build_backend(kind, config)?;
            if backend.is_available() {
                info!("Speech engine {} ready", backend.name());
            } else {
                warn!("Speech engine {} is configured but not available", backend.name());
            }
            built.insert(kind, backend.clone());
            Ok(backend)
        };

        let default_kind = config
            .engines
            .get(DEFAULT_ENGINE_KEY)
            .copied()
            .ok_or_else(|| SpeechError::Config("missing default engine".to_string()))?;
        let mut table = Self::new(resolve(default_kind)?);

        for (key, kind) in &config.engines {
            if let Some(lang) = LanguageTag::from_code(key) {
                table.by_lang.insert(lang, resolve(*kind)?);
            }
        }

        Ok(table)
    }

    /// Backend for `lang`, falling back to the default entry
    pub fn resolve(&self, lang: LanguageTag) -> Arc<dyn SynthesisBackend> {
        self.by_lang
            .get(&lang)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

fn build_backend(kind: EngineKind, config: &SpeechConfig) -> Result<Arc<dyn SynthesisBackend>, SpeechError> {
    Ok(match kind {
        EngineKind::Cloud => Arc::new(CloudTtsEngine::new(config.cloud.clone())?),
        EngineKind::Native => Arc::new(NativeTtsEngine::new(config.native.clone())),
        EngineKind::Piper => Arc::new(PiperTtsEngine::new(config.piper.clone())),
    })
}

/// Reject empty or oversized text and strip control characters other than line breaks
pub(crate) fn sanitize_text(text: &str) -> Result<String, SpeechError> {
    if text.trim().is_empty() {
        return Err(SpeechError::Engine("Text cannot be empty".to_string()));
    }

    if text.len() > 100_000 {
        return Err(SpeechError::Engine("Text too long (max 100KB)".to_string()));
    }

    Ok(text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\r')
        .collect())
}
