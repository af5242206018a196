//! Error types for cliptalk-spk

use cliptalk_core::Error as CoreError;
use thiserror::Error;

/// Speech synthesis errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine not available: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        SpeechError::Api(err.to_string())
    }
}
