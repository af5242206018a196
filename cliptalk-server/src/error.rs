//! Error types for the ClipTalk server

use cliptalk_core::Error as CoreError;
use cliptalk_spk::SpeechError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Listener error: {0}")]
    Listener(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
