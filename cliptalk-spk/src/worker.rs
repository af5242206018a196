//! Synthesis worker
//!
//! Takes text items off the input queue one at a time, publishes a pending
//! delivery for each before any audio exists, then drives the resolved backend
//! into the item's audio buffer with bounded retries.

use crate::config::RetryConfig;
use crate::engines::{BackendTable, SynthesisBackend};
use crate::error::SpeechError;
use cliptalk_core::{
    detect_language, AudioBuffer, InstrumentedQueue, LanguageTag, PendingDelivery, TextItem,
};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How processing of one item ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// All audio was written
    Completed,
    /// The buffer was shut down by someone else mid-synthesis
    Cancelled,
    /// Every attempt failed
    Abandoned,
}

enum AttemptEnd {
    Finished,
    BufferClosed,
}

/// Shuts the buffer down on every exit path, panics included
struct ShutdownOnDrop(AudioBuffer);

impl Drop for ShutdownOnDrop {
    fn drop(&mut self) {
        self.0.shutdown(false);
    }
}

/// Single consumer of the input queue
#[derive(Clone)]
pub struct SynthesisWorker {
    input: InstrumentedQueue<TextItem>,
    output: InstrumentedQueue<PendingDelivery>,
    backends: BackendTable,
    retry: RetryConfig,
    buffer_capacity: Option<usize>,
}

impl SynthesisWorker {
    pub fn new(
        input: InstrumentedQueue<TextItem>,
        output: InstrumentedQueue<PendingDelivery>,
        backends: BackendTable,
        retry: RetryConfig,
    ) -> Self {
        Self {
            input,
            output,
            backends,
            retry,
            buffer_capacity: None,
        }
    }

    /// Bound every audio buffer to `capacity` unread chunks
    pub fn with_buffer_capacity(mut self, capacity: Option<usize>) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Process items forever
    pub async fn run(&self) {
        info!("Synthesis worker started");
        loop {
            self.process_next().await;
        }
    }

    /// Wait for the next item and see it through to acknowledgement
    pub async fn process_next(&self) -> ItemOutcome {
        let (text, token) = self.input.dequeue().await;
        let outcome = self.process(&text).await;
        token.ack();
        outcome
    }

    async fn process(&self, text: &TextItem) -> ItemOutcome {
        let lang = detect_language(text.as_str());
        let backend = self.backends.resolve(lang);
        let buffer = AudioBuffer::with_capacity(backend.media_type(), self.buffer_capacity);
        let _shutdown = ShutdownOnDrop(buffer.clone());

        debug!("Synthesizing {:?} ({}) with {}", text.preview(), lang, backend.name());
        self.output
            .enqueue(PendingDelivery {
                text: text.clone(),
                lang,
                buffer: buffer.clone(),
            })
            .await;

        self.synthesize_with_retry(backend, text, lang, &buffer).await
    }

    async fn synthesize_with_retry(
        &self,
        backend: Arc<dyn SynthesisBackend>,
        text: &TextItem,
        lang: LanguageTag,
        buffer: &AudioBuffer,
    ) -> ItemOutcome {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            metrics::counter!("cliptalk_synthesis_attempts_total", "engine" => backend.name().to_string())
                .increment(1);

            match attempt_once(backend.as_ref(), text, lang, buffer).await {
                Ok(AttemptEnd::Finished) => {
                    info!("Audio cached for {:?}", text.preview());
                    return ItemOutcome::Completed;
                }
                Ok(AttemptEnd::BufferClosed) => {
                    debug!("Audio buffer shut down for {:?}", text.preview());
                    return ItemOutcome::Cancelled;
                }
                Err(e) => {
                    metrics::counter!("cliptalk_synthesis_failures_total", "engine" => backend.name().to_string())
                        .increment(1);
                    warn!(
                        "Attempt {}/{} failed for {:?}: {}",
                        attempt,
                        max_attempts,
                        text.preview(),
                        e
                    );
                }
            }

            if buffer.is_shut_down() {
                debug!("Audio buffer shut down for {:?}", text.preview());
                return ItemOutcome::Cancelled;
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.retry.delay_after(attempt)).await;
            }
        }

        metrics::counter!("cliptalk_items_abandoned_total").increment(1);
        error!(
            "Giving up on {:?} after {} attempts",
            text.preview(),
            max_attempts
        );
        ItemOutcome::Abandoned
    }
}

async fn attempt_once(
    backend: &dyn SynthesisBackend,
    text: &TextItem,
    lang: LanguageTag,
    buffer: &AudioBuffer,
) -> Result<AttemptEnd, SpeechError> {
    let mut stream = backend.synthesize(text.as_str(), lang).await?;

    while let Some(chunk) = stream.next().await {
        if buffer.write(chunk?).await.is_closed() {
            return Ok(AttemptEnd::BufferClosed);
        }
    }

    Ok(AttemptEnd::Finished)
}
