//! Native platform TTS engine
//!
//! Linux streams WAV from `espeak-ng --stdout`. macOS (`say`) and Windows
//! (System.Speech through PowerShell) can only render to a file, so the
//! finished file is read back as a single chunk.

use crate::config::NativeConfig;
use crate::engines::{sanitize_text, AudioStream, SynthesisBackend};
use crate::error::SpeechError;
use async_trait::async_trait;
use cliptalk_core::LanguageTag;
use std::path::PathBuf;
use tokio::process::Command;

/// Native TTS engine (platform-specific)
pub struct NativeTtsEngine {
    command: PathBuf,
    config: NativeConfig,
    available: bool,
}

impl NativeTtsEngine {
    pub fn new(config: NativeConfig) -> Self {
        let command = config
            .command
            .clone()
            .unwrap_or_else(|| PathBuf::from(platform::DEFAULT_COMMAND));
        let available = platform::probe(&command);

        Self {
            command,
            config,
            available,
        }
    }

    fn voice_for(&self, lang: LanguageTag) -> Option<String> {
        self.config
            .voice_for(lang)
            .map(str::to_string)
            .or_else(|| platform::default_voice(lang).map(str::to_string))
    }
}

#[async_trait]
impl SynthesisBackend for NativeTtsEngine {
    async fn synthesize(&self, text: &str, lang: LanguageTag) -> Result<AudioStream, SpeechError> {
        if !self.available {
            return Err(SpeechError::Unavailable(format!(
                "{} not available",
                self.command.display()
            )));
        }

        let text = sanitize_text(text)?;
        platform::synthesize(&self.command, &text, self.voice_for(lang), self.config.rate).await
    }

    fn media_type(&self) -> &str {
        "audio/wav"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// Render into a temporary file and yield its contents as one chunk
#[cfg(any(target_os = "macos", target_os = "windows"))]
async fn render_to_file(
    mut command: Command,
    output: tempfile::TempPath,
) -> Result<AudioStream, SpeechError> {
    use futures_util::stream::{self, StreamExt};

    let result = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| SpeechError::Engine(format!("Failed to run speech command: {}", e)))?;

    if !result.status.success() {
        return Err(SpeechError::Engine(format!(
            "Speech command failed: {}",
            String::from_utf8_lossy(&result.stderr)
        )));
    }

    let audio = tokio::fs::read(&output).await?;
    Ok(stream::once(async move { Ok(bytes::Bytes::from(audio)) }).boxed())
}

#[cfg(target_os = "linux")]
mod platform {
    use super::*;
    use crate::engines::process::spawn_streaming;
    use std::path::Path;

    pub const DEFAULT_COMMAND: &str = "espeak-ng";

    pub fn probe(command: &Path) -> bool {
        std::process::Command::new(command)
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub fn default_voice(lang: LanguageTag) -> Option<&'static str> {
        Some(lang.code())
    }

    pub async fn synthesize(
        command: &Path,
        text: &str,
        voice: Option<String>,
        rate: u32,
    ) -> Result<AudioStream, SpeechError> {
        let mut cmd = Command::new(command);
        cmd.arg("--stdout").arg("--stdin").arg("-s").arg(rate.to_string());
        if let Some(voice) = voice {
            cmd.arg("-v").arg(voice);
        }
        // Text comes from stdin so it is never parsed as an option
        spawn_streaming(cmd, Some(text.to_string())).await
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::*;
    use std::path::Path;

    pub const DEFAULT_COMMAND: &str = "say";

    pub fn probe(command: &Path) -> bool {
        std::process::Command::new(command)
            .arg("-v")
            .arg("?")
            .stdout(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub fn default_voice(_lang: LanguageTag) -> Option<&'static str> {
        None
    }

    pub async fn synthesize(
        command: &Path,
        text: &str,
        voice: Option<String>,
        rate: u32,
    ) -> Result<AudioStream, SpeechError> {
        let output = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        let mut cmd = Command::new(command);
        cmd.arg("-r")
            .arg(rate.to_string())
            .arg("--file-format=WAVE")
            .arg("--data-format=LEI16@22050")
            .arg("-o")
            .arg(&*output);
        if let Some(voice) = voice {
            cmd.arg("-v").arg(voice);
        }
        cmd.arg("--").arg(text);

        render_to_file(cmd, output).await
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use std::path::Path;

    pub const DEFAULT_COMMAND: &str = "powershell";

    pub fn probe(command: &Path) -> bool {
        std::process::Command::new(command)
            .arg("-NoProfile")
            .arg("-Command")
            .arg("Add-Type -AssemblyName System.Speech")
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub fn default_voice(_lang: LanguageTag) -> Option<&'static str> {
        None
    }

    fn quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    pub async fn synthesize(
        command: &Path,
        text: &str,
        voice: Option<String>,
        rate: u32,
    ) -> Result<AudioStream, SpeechError> {
        let output = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        // System.Speech rate runs -10..10 with 0 at roughly 175 WPM
        let sapi_rate = ((rate as i32 - 175) / 20).clamp(-10, 10);
        let select_voice = voice
            .map(|v| format!("$s.SelectVoice({}); ", quote(&v)))
            .unwrap_or_default();
        let script = format!(
            "Add-Type -AssemblyName System.Speech; \
             $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
             {}$s.Rate = {}; $s.SetOutputToWaveFile({}); $s.Speak({}); $s.Dispose()",
            select_voice,
            sapi_rate,
            quote(&output.to_string_lossy()),
            quote(&text.replace(['\r', '\n'], " ")),
        );

        let mut cmd = Command::new(command);
        cmd.arg("-NoProfile").arg("-Command").arg(script);
        render_to_file(cmd, output).await
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
mod platform {
    use super::*;
    use std::path::Path;

    pub const DEFAULT_COMMAND: &str = "espeak-ng";

    pub fn probe(_command: &Path) -> bool {
        false
    }

    pub fn default_voice(_lang: LanguageTag) -> Option<&'static str> {
        None
    }

    pub async fn synthesize(
        _command: &Path,
        _text: &str,
        _voice: Option<String>,
        _rate: u32,
    ) -> Result<AudioStream, SpeechError> {
        Err(SpeechError::Unavailable("Native TTS not supported on this platform".to_string()))
    }
}
