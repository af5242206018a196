pub mod types;
pub mod error;
pub mod config;
pub mod lang;
pub mod audio_buffer;
pub mod observer;
pub mod queue;
pub mod wav;

pub use error::{Error, Result};
pub use types::{LanguageTag, PendingDelivery, QueueDepthReport, TextItem};
pub use config::PipelineConfig;
pub use lang::detect_language;
pub use audio_buffer::{AudioBuffer, BufferState, ReadOutcome, WriteOutcome};
pub use observer::{DepthObserver, ObserverSlot};
pub use queue::{AckToken, InstrumentedQueue};
pub use wav::PcmFormat;

/// Name under which the text queue reports its depth
pub const INPUT_QUEUE: &str = "input-queue";

/// Name under which the delivery queue reports its depth
pub const OUTPUT_QUEUE: &str = "output-queue";
