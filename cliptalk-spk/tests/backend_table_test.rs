//! Tests for engine routing

use cliptalk_core::LanguageTag;
use cliptalk_spk::config::{EngineKind, SpeechConfig};
use cliptalk_spk::engines::custom::CustomTtsEngine;
use cliptalk_spk::{BackendTable, SpeechError, SynthesisBackend};
use std::sync::Arc;

fn named(name: &'static str) -> Arc<dyn SynthesisBackend> {
    Arc::new(CustomTtsEngine::new(name, "audio/wav", |_, _, _| Ok(())))
}

#[test]
fn test_resolve_falls_back_to_default() {
    let table = BackendTable::new(named("default")).with_language(LanguageTag::Fa, named("persian"));

    assert_eq!(table.resolve(LanguageTag::Fa).name(), "persian");
    assert_eq!(table.resolve(LanguageTag::En).name(), "default");
}

#[test]
fn test_from_config_builds_each_kind_once() {
    let mut config = SpeechConfig::default();
    config.engines.insert("default".to_string(), EngineKind::Native);
    config.engines.insert("en".to_string(), EngineKind::Native);
    config.engines.insert("fa".to_string(), EngineKind::Piper);

    let table = BackendTable::from_config(&config).unwrap();
    let default = table.resolve(LanguageTag::En);
    let persian = table.resolve(LanguageTag::Fa);

    assert_eq!(default.name(), "native");
    assert_eq!(persian.name(), "piper");
    assert_eq!(persian.media_type(), "audio/wav");
}

#[test]
fn test_from_config_rejects_invalid_table() {
    let mut config = SpeechConfig::default();
    config.engines.remove("default");

    let result = BackendTable::from_config(&config);
    assert!(matches!(result, Err(SpeechError::Config(_))));
}

#[test]
fn test_cloud_engine_reports_its_format() {
    let mut config = SpeechConfig::default();
    config.cloud.api_key = Some("test-key".to_string());
    config.cloud.response_format = "wav".to_string();

    let table = BackendTable::from_config(&config).unwrap();
    let cloud = table.resolve(LanguageTag::En);
    assert_eq!(cloud.name(), "cloud");
    assert_eq!(cloud.media_type(), "audio/wav");
    assert!(cloud.is_available());
}
