//! Application configuration
//!
//! Sources are layered: defaults, then a config file, then `CLIPTALK_*`
//! environment variables, then command-line flags (applied in `main`).

use crate::error::{Result, ServerError};
use cliptalk_core::PipelineConfig;
use cliptalk_spk::config::{EngineKind, DEFAULT_ENGINE_KEY};
use cliptalk_spk::SpeechConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete ClipTalk configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipTalkConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub speech: SpeechConfig,
    pub text: TextFilterConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3775,
        }
    }
}

impl ServerConfig {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Rules applied to incoming text before it is queued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextFilterConfig {
    /// Shortest text (in characters, after cleanup) worth speaking
    pub min_text_length: usize,

    /// Minimum share of spaces among characters; filters out code, hashes and URLs
    pub min_space_ratio: f64,

    /// Texts arriving sooner than this after the previous one are dropped
    pub debounce_ms: u64,
}

impl Default for TextFilterConfig {
    fn default() -> Self {
        Self {
            min_text_length: 1,
            min_space_ratio: 0.05,
            debounce_ms: 1000,
        }
    }
}

impl TextFilterConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_space_ratio) {
            return Err("min_space_ratio must be between 0.0 and 1.0".to_string());
        }
        if self.debounce_ms > 60_000 {
            return Err("debounce_ms too large (max 60000)".to_string());
        }
        Ok(())
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ClipTalkConfig {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration, trying JSON, then TOML, then YAML
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let json_err = match serde_json::from_str::<ClipTalkConfig>(content) {
            Ok(config) => return Ok(config),
            Err(e) => e,
        };

        let toml_err = match toml::from_str::<ClipTalkConfig>(content) {
            Ok(config) => return Ok(config),
            Err(e) => e,
        };

        match serde_yaml::from_str::<ClipTalkConfig>(content) {
            Ok(config) => Ok(config),
            Err(yaml_err) => Err(ServerError::Parse(format!(
                "Unknown format (json: {}; toml: {}; yaml: {})",
                json_err,
                toml_err.message(),
                yaml_err
            ))),
        }
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("CLIPTALK_HOST") {
            self.server.bind_address = host;
        }

        if let Some(port) = lookup("CLIPTALK_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ServerError::Config(format!("Invalid CLIPTALK_PORT: {}", port)))?;
        }

        if let Some(level) = lookup("CLIPTALK_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(engine) = lookup("CLIPTALK_ENGINE") {
            self.set_default_engine(&engine)?;
        }

        if let Some(key) = lookup("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.speech.cloud.api_key = Some(key);
            }
        }

        Ok(())
    }

    /// Route every language without an explicit entry to `engine`
    pub fn set_default_engine(&mut self, engine: &str) -> Result<()> {
        let kind: EngineKind = engine.parse().map_err(ServerError::Config)?;
        self.speech
            .engines
            .insert(DEFAULT_ENGINE_KEY.to_string(), kind);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.bind_address.trim().is_empty() {
            return Err(ServerError::Config("server.bind_address cannot be empty".to_string()));
        }

        if self.server.port == 0 {
            return Err(ServerError::Config("server.port cannot be 0".to_string()));
        }

        self.pipeline
            .validate()
            .map_err(|e| ServerError::Config(format!("pipeline: {}", e)))?;
        self.speech
            .validate()
            .map_err(|e| ServerError::Config(format!("speech: {}", e)))?;
        self.text
            .validate()
            .map_err(|e| ServerError::Config(format!("text: {}", e)))?;

        Ok(())
    }
}
