//! Cloud TTS engine
//! Talks to an OpenAI-compatible `/v1/audio/speech` endpoint and streams the body

use crate::config::CloudConfig;
use crate::engines::{sanitize_text, AudioStream, SynthesisBackend};
use crate::error::SpeechError;
use async_trait::async_trait;
use cliptalk_core::LanguageTag;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Cloud TTS engine
pub struct CloudTtsEngine {
    client: Client,
    endpoint: String,
    config: CloudConfig,
}

impl CloudTtsEngine {
    pub fn new(config: CloudConfig) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SpeechError::Engine(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            config,
        })
    }

    fn api_key(&self) -> Option<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

#[async_trait]
impl SynthesisBackend for CloudTtsEngine {
    async fn synthesize(&self, text: &str, lang: LanguageTag) -> Result<AudioStream, SpeechError> {
        let text = sanitize_text(text)?;
        let api_key = self
            .api_key()
            .ok_or_else(|| SpeechError::Unavailable("cloud API key not provided".to_string()))?;

        let request_body = json!({
            "model": self.config.model,
            "input": text,
            "voice": self.config.voice_for(lang),
            "response_format": self.config.response_format,
        });

        let url = format!("{}/v1/audio/speech", self.endpoint);
        debug!("POST {} ({} chars, {})", url, text.chars().count(), lang);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| SpeechError::Api(format!("Speech API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SpeechError::Api(format!("Speech API error ({}): {}", status, error_text)));
        }

        Ok(response.bytes_stream().map(|chunk| chunk.map_err(SpeechError::from)).boxed())
    }

    fn media_type(&self) -> &str {
        self.config.media_type()
    }

    fn is_available(&self) -> bool {
        self.api_key().is_some()
    }

    fn name(&self) -> &str {
        "cloud"
    }
}
