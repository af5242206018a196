//! Configuration loading tests

use cliptalk_server::config::ClipTalkConfig;
use cliptalk_server::ServerError;
use cliptalk_spk::config::EngineKind;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_json() {
    let file = write_config(r#"{"server": {"port": 4000}, "pipeline": {"output_capacity": 2}}"#);
    let config = ClipTalkConfig::from_file(file.path()).unwrap();

    assert_eq!(config.server.port, 4000);
    assert_eq!(config.server.bind_address, "127.0.0.1");
    assert_eq!(config.pipeline.output_capacity, 2);
    assert_eq!(config.pipeline.input_capacity, 50);
}

#[test]
fn test_load_toml() {
    let file = write_config(
        r#"
[server]
port = 4100

[speech.engines]
default = "native"
fa = "piper"

[text]
debounce_ms = 0
"#,
    );
    let config = ClipTalkConfig::from_file(file.path()).unwrap();

    assert_eq!(config.server.port, 4100);
    assert_eq!(config.speech.engines["default"], EngineKind::Native);
    assert_eq!(config.speech.engines["fa"], EngineKind::Piper);
    assert_eq!(config.text.debounce_ms, 0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_yaml() {
    let file = write_config(
        "logging:\n  level: debug\n  json: true\nspeech:\n  retry:\n    max_attempts: 5\n",
    );
    let config = ClipTalkConfig::from_file(file.path()).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert_eq!(config.speech.retry.max_attempts, 5);
}

#[test]
fn test_unparseable_config() {
    let file = write_config("server: [unclosed");
    let result = ClipTalkConfig::from_file(file.path());
    assert!(matches!(result, Err(ServerError::Parse(_))));
}

#[test]
fn test_missing_config_file() {
    let result = ClipTalkConfig::from_file("/nonexistent/cliptalk.toml");
    assert!(matches!(result, Err(ServerError::Config(_))));
}

#[test]
fn test_validation_catches_section_errors() {
    let config = ClipTalkConfig::from_str(r#"{"speech": {"retry": {"max_attempts": 0}}}"#).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("speech"));
}
