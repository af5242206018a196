//! Custom TTS engine implementation
//! Lets embedders plug a synchronous synthesis function into the pipeline

use crate::engines::{AudioStream, SynthesisBackend};
use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;
use cliptalk_core::LanguageTag;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Receives the chunks of one synthesis call
///
/// `send` returns `false` once the consumer stopped listening, at which point
/// the function should give up.
pub struct ChunkSink {
    tx: mpsc::Sender<Result<Bytes, SpeechError>>,
}

impl ChunkSink {
    pub fn send(&self, chunk: impl Into<Bytes>) -> bool {
        self.tx.blocking_send(Ok(chunk.into())).is_ok()
    }
}

type SynthesizeFn = dyn Fn(&str, LanguageTag, &ChunkSink) -> Result<(), SpeechError> + Send + Sync;

/// Custom TTS engine wrapper
///
/// The function runs on the blocking thread pool; chunks it sends are
/// streamed while it is still running.
pub struct CustomTtsEngine {
    name: String,
    media_type: String,
    synthesize_fn: Arc<SynthesizeFn>,
}

impl CustomTtsEngine {
    pub fn new<F>(name: impl Into<String>, media_type: impl Into<String>, synthesize_fn: F) -> Self
    where
        F: Fn(&str, LanguageTag, &ChunkSink) -> Result<(), SpeechError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            synthesize_fn: Arc::new(synthesize_fn),
        }
    }
}

#[async_trait]
impl SynthesisBackend for CustomTtsEngine {
    async fn synthesize(&self, text: &str, lang: LanguageTag) -> Result<AudioStream, SpeechError> {
        if text.is_empty() {
            return Err(SpeechError::Engine("Text cannot be empty".to_string()));
        }

        let (tx, rx) = mpsc::channel(16);
        let synthesize_fn = self.synthesize_fn.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let sink = ChunkSink { tx };
            if let Err(e) = synthesize_fn(&text, lang, &sink) {
                let _ = sink.tx.blocking_send(Err(e));
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }

    fn media_type(&self) -> &str {
        &self.media_type
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.name
    }
}
