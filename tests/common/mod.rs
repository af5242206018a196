// Shared harness: a wired pipeline with a closure backend and an attached listener

#![allow(dead_code)]

use cliptalk_core::{AudioBuffer, LanguageTag, TextItem};
use cliptalk_server::config::ClipTalkConfig;
use cliptalk_server::{delivery, ListenerHandle, Pipeline, ServerEvent};
use cliptalk_spk::engines::custom::{ChunkSink, CustomTtsEngine};
use cliptalk_spk::{BackendTable, SpeechError};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn config(input_capacity: usize, output_capacity: usize) -> ClipTalkConfig {
    let mut config = ClipTalkConfig::default();
    config.pipeline.input_capacity = input_capacity;
    config.pipeline.output_capacity = output_capacity;
    config.speech.retry.initial_delay_ms = 1;
    config.speech.retry.max_delay_ms = 5;
    config.text.debounce_ms = 0;
    config
}

pub fn pipeline<F>(config: &ClipTalkConfig, synthesize: F) -> Pipeline
where
    F: Fn(&str, LanguageTag, &ChunkSink) -> Result<(), SpeechError> + Send + Sync + 'static,
{
    let backend = CustomTtsEngine::new("scripted", "audio/mpeg", synthesize);
    Pipeline::build(config, BackendTable::new(Arc::new(backend)))
}

/// Speaks each text as its own bytes
pub fn echo(text: &str, _lang: LanguageTag, sink: &ChunkSink) -> Result<(), SpeechError> {
    sink.send(text.to_string());
    Ok(())
}

pub fn start_worker(pipeline: &Pipeline) {
    let worker = pipeline.worker.clone();
    tokio::spawn(async move { worker.run().await });
}

pub struct Listener {
    pub handle: Arc<ListenerHandle>,
    pub events: UnboundedReceiver<ServerEvent>,
    /// Every event received so far, in order
    pub seen: Vec<ServerEvent>,
}

/// Attach a listener and start its delivery loop
pub fn connect(pipeline: &Pipeline) -> Listener {
    let (handle, events) = ListenerHandle::new();
    let _kicked = pipeline.state.session.attach(handle.clone());
    tokio::spawn(delivery::run(
        pipeline.state.session.clone(),
        pipeline.state.output.clone(),
        handle.clone(),
    ));
    Listener {
        handle,
        events,
        seen: Vec::new(),
    }
}

impl Listener {
    /// Next `new-text` event, skipping depth and monitoring events
    pub async fn next_text(&mut self) -> String {
        self.text_within(WAIT)
            .await
            .expect("timed out waiting for new-text")
    }

    /// Whether a `new-text` arrives within `window`
    pub async fn text_within(&mut self, window: Duration) -> Option<String> {
        let seen = &mut self.seen;
        let events = &mut self.events;
        timeout(window, async {
            loop {
                let event = events.recv().await?;
                seen.push(event.clone());
                if let ServerEvent::NewText { text, .. } = event {
                    return Some(text);
                }
            }
        })
        .await
        .ok()
        .flatten()
    }

    /// Sizes of every depth report seen for `queue`
    pub fn depth_sizes(&self, queue: &str) -> Vec<usize> {
        self.seen
            .iter()
            .filter_map(|event| match event {
                ServerEvent::QueueDepth { queue: name, size, .. } if name == queue => Some(*size),
                _ => None,
            })
            .collect()
    }

    /// Drain whatever events are queued right now
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            self.seen.push(event.clone());
            events.push(event);
        }
        events
    }
}

pub async fn submit(pipeline: &Pipeline, text: &str) {
    timeout(WAIT, pipeline.state.input.enqueue(TextItem::from(text)))
        .await
        .expect("input queue stayed full");
}

pub fn current_buffer(pipeline: &Pipeline) -> AudioBuffer {
    pipeline
        .state
        .session
        .current_buffer()
        .expect("no buffer selected")
}

/// Everything the buffer yields until its terminal marker
pub async fn read_all(buffer: AudioBuffer) -> Vec<u8> {
    timeout(WAIT, async {
        let mut audio = Vec::new();
        let mut chunks = Box::pin(cliptalk_server::audio_stream::chunks(buffer));
        while let Some(Ok(chunk)) = chunks.next().await {
            audio.extend_from_slice(&chunk);
        }
        audio
    })
    .await
    .expect("audio never ended")
}
