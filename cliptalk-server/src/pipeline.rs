//! Wiring of queues, session, intake and worker

use crate::config::ClipTalkConfig;
use crate::http::AppState;
use crate::intake::TextIntake;
use crate::session::Session;
use cliptalk_core::{InstrumentedQueue, ObserverSlot, INPUT_QUEUE, OUTPUT_QUEUE};
use cliptalk_spk::{BackendTable, SynthesisWorker};
use std::sync::Arc;

/// A fully wired pipeline, not yet running
pub struct Pipeline {
    pub state: AppState,
    pub worker: SynthesisWorker,
}

impl Pipeline {
    pub fn build(config: &ClipTalkConfig, backends: BackendTable) -> Self {
        let observers = Arc::new(ObserverSlot::new());
        let input = InstrumentedQueue::new(
            INPUT_QUEUE,
            config.pipeline.input_capacity,
            observers.clone(),
        );
        let output = InstrumentedQueue::new(
            OUTPUT_QUEUE,
            config.pipeline.output_capacity,
            observers.clone(),
        );

        let session = Arc::new(Session::new(observers));
        let intake = Arc::new(TextIntake::new(
            input.clone(),
            config.text.clone(),
            session.clone(),
        ));

        let worker = SynthesisWorker::new(
            input.clone(),
            output.clone(),
            backends,
            config.speech.retry.clone(),
        )
        .with_buffer_capacity(config.pipeline.audio_buffer_bound());

        Self {
            state: AppState {
                session,
                input,
                output,
                intake,
            },
            worker,
        }
    }
}
