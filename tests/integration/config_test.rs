//! Configuration Integration Tests

use std::io::Write;

use uber_codegen::models::settings::ConfigFile;
use uber_codegen::{AppConfig, AppError, LogFormat, Pipeline};

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_file_overrides_defaults() {
    let file = config_file(
        r#"
model = "llama-3.1-8b-instant"
timeout_secs = 20
generation_temperature = 0.3
log_format = "json"
"#,
    );

    let mut config = AppConfig::default();
    config.apply_file(&ConfigFile::read(file.path()).unwrap());
    config.validate().unwrap();

    assert_eq!(config.gateway.model, "llama-3.1-8b-instant");
    assert_eq!(config.gateway.timeout_secs, 20);
    assert_eq!(config.gateway.generation_temperature, 0.3);
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.log_level, "info");
}

#[test]
fn test_malformed_file_is_config_error() {
    let file = config_file("model = [unterminated");
    let err = ConfigFile::read(file.path()).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert!(!err.is_client_error());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, AppError::Io(_)));
}

#[test]
fn test_invalid_overlay_fails_validation() {
    let file = config_file("base_url = \"groq.local\"");
    let mut config = AppConfig::default();
    config.apply_file(&ConfigFile::read(file.path()).unwrap());
    assert!(matches!(config.validate(), Err(AppError::Config(_))));
}

#[tokio::test]
async fn test_pipeline_builds_from_config() {
    let mut config = AppConfig::default();
    config.gateway.api_key = Some("gsk_configured_key_0001".into());
    let pipeline = Pipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.gateway().settings().model, config.gateway.model);
}
