// tests/config_loading.rs

use std::fs;
use std::time::Duration;

use taskstack::config::{load_and_validate, load_or_default};
use taskstack::errors::TaskstackError;
use taskstack_test_utils::builders::ConfigFileBuilder;

#[test]
fn full_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Taskstack.toml");
    fs::write(
        &path,
        r#"
[config]
concurrent = 6
poll_interval = "250ms"
bin_dir = "/opt/app/bin"
program = "/opt/app/bin/console"
args = ["--env", "prod"]
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.config.concurrent, 6);
    assert_eq!(cfg.config.poll_interval, Duration::from_millis(250));
    assert_eq!(cfg.config.bin_dir.to_str(), Some("/opt/app/bin"));
    assert_eq!(cfg.config.args, vec!["--env", "prod"]);
}

#[test]
fn missing_file_means_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.config.concurrent, 3);
    assert_eq!(cfg.config.poll_interval, Duration::from_secs(1));

    let err = load_and_validate(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, TaskstackError::IoError(_)));
}

#[test]
fn invalid_values_are_config_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Taskstack.toml");
    fs::write(&path, "[config]\nconcurrent = 0\n").unwrap();

    let err = load_or_default(&path).unwrap_err();
    assert!(matches!(err, TaskstackError::ConfigError(_)));
}

#[test]
fn builder_produces_validated_config() {
    let cfg = ConfigFileBuilder::new()
        .concurrent(2)
        .poll_interval("5ms")
        .program("php", &["bin/console"])
        .build();

    assert_eq!(cfg.config.concurrent, 2);
    assert_eq!(cfg.config.poll_interval, Duration::from_millis(5));
    assert_eq!(cfg.config.args, vec!["bin/console"]);
}
