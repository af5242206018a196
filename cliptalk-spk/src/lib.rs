//! cliptalk-spk: speech synthesis for the ClipTalk pipeline
//!
//! Provides:
//! - Cloud, native and Piper TTS backends behind one streaming trait
//! - A language to backend table resolved once from configuration
//! - The synthesis worker that feeds audio buffers ahead of playback

pub mod error;
pub mod config;
pub mod engines;
pub mod worker;

pub use error::SpeechError;
pub use config::{EngineKind, RetryConfig, SpeechConfig};
pub use engines::{AudioStream, BackendTable, SynthesisBackend};
pub use engines::custom::ChunkSink;
pub use worker::{ItemOutcome, SynthesisWorker};
