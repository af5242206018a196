//! Piper TTS engine implementation
//! Local neural TTS using Piper

use crate::config::PiperConfig;
use crate::engines::process::spawn_streaming;
use crate::engines::{sanitize_text, AudioStream, SynthesisBackend};
use crate::error::SpeechError;
use async_trait::async_trait;
use cliptalk_core::{LanguageTag, PcmFormat};
use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

const DEFAULT_SAMPLE_RATE: u32 = 22_050;

/// Piper TTS engine
pub struct PiperTtsEngine {
    config: PiperConfig,
}

impl PiperTtsEngine {
    pub fn new(config: PiperConfig) -> Self {
        for (lang, model) in &config.models {
            if !model.exists() {
                warn!("Piper model for {} not found at {:?}", lang, model);
            }
        }
        Self { config }
    }

    fn model_for(&self, lang: LanguageTag) -> Result<&PathBuf, SpeechError> {
        let model = self.config.model_for(lang).ok_or_else(|| {
            SpeechError::Config(format!("No Piper model configured for {}", lang))
        })?;

        if !model.exists() {
            return Err(SpeechError::Unavailable(format!(
                "Piper model not found: {:?}",
                model
            )));
        }

        Ok(model)
    }
}

/// Sample rate from the `<model>.onnx.json` file Piper ships next to each voice
pub(crate) async fn model_sample_rate(model: &Path) -> u32 {
    let mut config_path = model.as_os_str().to_owned();
    config_path.push(".json");

    let parsed = match tokio::fs::read(&config_path).await {
        Ok(raw) => serde_json::from_slice::<serde_json::Value>(&raw).ok(),
        Err(_) => None,
    };

    parsed
        .as_ref()
        .and_then(|v| v.pointer("/audio/sample_rate"))
        .and_then(|v| v.as_u64())
        .and_then(|rate| u32::try_from(rate).ok())
        .unwrap_or(DEFAULT_SAMPLE_RATE)
}

#[async_trait]
impl SynthesisBackend for PiperTtsEngine {
    async fn synthesize(&self, text: &str, lang: LanguageTag) -> Result<AudioStream, SpeechError> {
        let text = sanitize_text(text)?;
        let model = self.model_for(lang)?;
        let sample_rate = model_sample_rate(model).await;

        let mut cmd = Command::new(&self.config.executable);
        cmd.arg("--model").arg(model).arg("--output_raw");
        if let Some(scale) = self.config.length_scale_for(lang) {
            cmd.arg("--length_scale").arg(scale.to_string());
        }
        debug!("Running piper with {:?} at {} Hz", model, sample_rate);

        // One utterance per line on stdin
        let input = format!("{}\n", text.replace(['\r', '\n'], " "));
        let pcm = spawn_streaming(cmd, Some(input)).await?;

        let header = PcmFormat::mono16(sample_rate).streaming_header();
        Ok(stream::once(async move { Ok(header) }).chain(pcm).boxed())
    }

    fn media_type(&self) -> &str {
        "audio/wav"
    }

    fn is_available(&self) -> bool {
        let executable = &self.config.executable;
        let on_path = executable.components().count() == 1;
        (on_path || executable.exists()) && self.config.models.values().any(|m| m.exists())
    }

    fn name(&self) -> &str {
        "piper"
    }
}
