//! Configuration for speech synthesis

use cliptalk_core::LanguageTag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Key of the engine table entry used when a language has no entry of its own
pub const DEFAULT_ENGINE_KEY: &str = "default";

/// Speech synthesis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Language code (or `default`) to engine kind
    pub engines: BTreeMap<String, EngineKind>,

    /// Retry policy applied to every synthesis attempt
    pub retry: RetryConfig,

    /// Cloud speech API settings
    pub cloud: CloudConfig,

    /// OS speech command settings
    pub native: NativeConfig,

    /// Local Piper model settings
    pub piper: PiperConfig,
}

/// TTS engine kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// OpenAI-compatible speech endpoint
    Cloud,
    /// Native platform TTS (espeak-ng on Linux, `say` on macOS, System.Speech on Windows)
    Native,
    /// Piper TTS (local neural TTS)
    Piper,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Cloud => "cloud",
            EngineKind::Native => "native",
            EngineKind::Piper => "piper",
        }
    }
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud" => Ok(EngineKind::Cloud),
            "native" => Ok(EngineKind::Native),
            "piper" => Ok(EngineKind::Piper),
            other => Err(format!("Unknown engine kind: {}", other)),
        }
    }
}

/// Retry configuration for synthesis attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per item, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds
    pub initial_delay_ms: u64,

    /// Upper bound on the doubled delay in milliseconds
    pub max_delay_ms: u64,
}

/// Cloud TTS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// API base URL
    pub endpoint: String,

    /// API key (falls back to `OPENAI_API_KEY`)
    pub api_key: Option<String>,

    /// Model ID
    pub model: String,

    /// Voice per language code
    pub voices: BTreeMap<String, String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Encoding requested from the API (`mp3`, `wav`, `opus`, ...)
    pub response_format: String,
}

/// Native TTS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    /// Override of the platform speech command
    pub command: Option<PathBuf>,

    /// Speech rate (words per minute, 0-500, default 175)
    pub rate: u32,

    /// Voice per language code
    pub voices: BTreeMap<String, String>,
}

/// Piper TTS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PiperConfig {
    /// Piper executable (looked up on PATH when relative)
    pub executable: PathBuf,

    /// `.onnx` voice model per language code
    pub models: BTreeMap<String, PathBuf>,

    /// Phoneme length scale per language code (lower is faster)
    pub length_scale: BTreeMap<String, f32>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        let mut engines = BTreeMap::new();
        engines.insert(DEFAULT_ENGINE_KEY.to_string(), EngineKind::Cloud);

        Self {
            engines,
            retry: RetryConfig::default(),
            cloud: CloudConfig::default(),
            native: NativeConfig::default(),
            piper: PiperConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        let mut voices = BTreeMap::new();
        voices.insert("en".to_string(), "alloy".to_string());
        voices.insert("fa".to_string(), "onyx".to_string());

        Self {
            endpoint: "https://api.openai.com".to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            voices,
            timeout_secs: 30,
            response_format: "mp3".to_string(),
        }
    }
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            command: None,
            rate: 175,
            voices: BTreeMap::new(),
        }
    }
}

impl Default for PiperConfig {
    fn default() -> Self {
        let voices_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cliptalk")
            .join("voices");

        let mut models = BTreeMap::new();
        models.insert("en".to_string(), voices_dir.join("en_US-hfc_male-medium.onnx"));
        models.insert("fa".to_string(), voices_dir.join("fa_IR-gyro-medium.onnx"));

        let mut length_scale = BTreeMap::new();
        length_scale.insert("fa".to_string(), 0.8);

        Self {
            executable: PathBuf::from("piper"),
            models,
            length_scale,
        }
    }
}

impl RetryConfig {
    /// Validate retry configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }

        if self.max_attempts > 100 {
            return Err("max_attempts too large (max 100)".to_string());
        }

        if self.initial_delay_ms > 60_000 {
            return Err("Initial delay too large (max 60000 ms)".to_string());
        }

        if self.max_delay_ms > 300_000 {
            return Err("Max delay too large (max 300000 ms)".to_string());
        }

        if self.initial_delay_ms > self.max_delay_ms {
            return Err("Initial delay cannot be greater than max delay".to_string());
        }

        Ok(())
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(20);
        let delay = self.initial_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

impl CloudConfig {
    pub fn voice_for(&self, lang: LanguageTag) -> &str {
        self.voices
            .get(lang.code())
            .map(String::as_str)
            .unwrap_or("alloy")
    }

    /// Media type matching `response_format`
    pub fn media_type(&self) -> &'static str {
        match self.response_format.as_str() {
            "wav" => "audio/wav",
            "opus" => "audio/ogg",
            "aac" => "audio/aac",
            "flac" => "audio/flac",
            "pcm" => "audio/L16",
            _ => "audio/mpeg",
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() {
            return Err("API endpoint cannot be empty".to_string());
        }

        if !self.endpoint.starts_with("https://") {
            return Err("API endpoint must use HTTPS".to_string());
        }

        if self.endpoint.len() > 2048 {
            return Err("API endpoint URL too long (max 2048 chars)".to_string());
        }

        if self.endpoint.chars().any(|c| c == '\0' || c.is_control()) {
            return Err("API endpoint contains invalid characters".to_string());
        }

        if self.model.is_empty() || self.model.len() > 256 {
            return Err("API model name must be 1-256 chars".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("API timeout must be greater than 0".to_string());
        }

        if self.timeout_secs > 300 {
            return Err("API timeout too large (max 300 seconds)".to_string());
        }

        Ok(())
    }
}

impl NativeConfig {
    pub fn voice_for(&self, lang: LanguageTag) -> Option<&str> {
        self.voices.get(lang.code()).map(String::as_str)
    }
}

impl PiperConfig {
    pub fn model_for(&self, lang: LanguageTag) -> Option<&PathBuf> {
        self.models.get(lang.code())
    }

    pub fn length_scale_for(&self, lang: LanguageTag) -> Option<f32> {
        self.length_scale.get(lang.code()).copied()
    }
}

impl SpeechConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.engines.contains_key(DEFAULT_ENGINE_KEY) {
            return Err(format!("Engine table must contain a '{}' entry", DEFAULT_ENGINE_KEY));
        }

        for key in self.engines.keys() {
            if key != DEFAULT_ENGINE_KEY && LanguageTag::from_code(key).is_none() {
                return Err(format!("Unknown language in engine table: {}", key));
            }
        }

        self.retry.validate()?;

        if self.uses(EngineKind::Cloud) {
            self.cloud.validate()?;
        }

        if self.native.rate > 500 {
            return Err("Speech rate must be between 0 and 500 WPM".to_string());
        }

        for (lang, scale) in &self.piper.length_scale {
            if !(0.1..=5.0).contains(scale) {
                return Err(format!("Length scale for {} must be between 0.1 and 5.0", lang));
            }
        }

        Ok(())
    }

    /// Whether any language is routed to `kind`
    pub fn uses(&self, kind: EngineKind) -> bool {
        self.engines.values().any(|k| *k == kind)
    }
}
