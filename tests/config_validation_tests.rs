//! Config Validation Tests
//!
//! Exercises typo detection and range validation through the public config
//! API, the way an operator's bridge_config.toml reaches it.

use std::time::Duration;

use bridge_sentinel::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use bridge_sentinel::config::{BridgeConfig, ChannelOrder, ConfigError};

const FULL_DEPLOYMENT: &str = r#"
[node]
name = "millbrook-span-2"
tick_interval_ms = 1000

[sensor]
i2c_bus = "/dev/i2c-1"
address = 104

[gpio]
sysfs_root = "/sys/class/gpio"
indicator_pin = 17
vibration_pin = 27

[transport]
enabled = true
bind_addr = "0.0.0.0:5000"
peer_host = "10.0.0.12"
peer_port = 5000
receive_timeout_ms = 100
connect_timeout_secs = 5

[notify]
enabled = true
smtp_host = "smtp.gmail.com"
smtp_port = 587
username = "bridge.alerts@example.com"
password = "app-password"
recipient = "inspector@example.com"
renotify_interval_secs = 600

[telemetry]
enabled = true
database_url = "https://bridge-monitor.example.com"
path = "bridge_data"
timeout_secs = 10

[vision]
model_path = "/opt/bridge/crack_detection.onnx"
input_size = 227
channel_order = "bgr"
frame_interval_ms = 500
annotate_dir = "/var/lib/bridge/annotated"
"#;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn full_deployment_document_has_no_unknown_keys() {
    let warnings = validate_unknown_keys(FULL_DEPLOYMENT);
    assert!(warnings.is_empty(), "Unexpected warnings: {warnings:?}");
}

#[test]
fn typo_in_notify_section_suggests_correct_key() {
    let toml_str = r#"
[notify]
recipent = "inspector@example.com"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "notify.recipent");
    assert_eq!(warnings[0].suggestion.as_deref(), Some("notify.recipient"));
    assert!(warnings[0].to_string().contains("did you mean 'notify.recipient'"));
}

#[test]
fn typo_does_not_block_loading() {
    let toml_str = r#"
[node]
tick_intervall_ms = 250
"#;
    let config = BridgeConfig::from_toml_str(toml_str).expect("typos only warn");
    // The misspelt key is ignored; the default applies
    assert_eq!(config.node.tick_interval(), Duration::from_secs(1));
}

#[test]
fn unrelated_key_gets_no_suggestion() {
    assert!(suggest_correction("zzzzzzzzzzzzzz", &known_config_keys()).is_none());
}

// ============================================================================
// Loading and Range Validation
// ============================================================================

#[test]
fn full_deployment_document_loads() {
    let config = BridgeConfig::from_toml_str(FULL_DEPLOYMENT).expect("valid deployment");
    assert_eq!(config.node.name, "millbrook-span-2");
    assert_eq!(config.sensor.address, 0x68);
    assert_eq!(config.gpio.indicator_pin, 17);
    assert_eq!(config.gpio.vibration_pin, 27);
    assert_eq!(config.transport.receive_timeout(), Duration::from_millis(100));
    assert_eq!(config.notify.renotify_interval_secs, 600);
    assert_eq!(config.notify.sender(), "bridge.alerts@example.com");
    assert_eq!(config.vision.channel_order, ChannelOrder::Bgr);
    assert!(config.vision.annotate_dir.is_some());
}

#[test]
fn explicit_config_file_loads_and_validates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bridge_config.toml");
    std::fs::write(&path, FULL_DEPLOYMENT).expect("write");

    let config = BridgeConfig::load(Some(&path)).expect("explicit load");
    assert_eq!(config.transport.peer_host, "10.0.0.12");
}

#[test]
fn explicit_invalid_file_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bridge_config.toml");
    std::fs::write(
        &path,
        r#"
[gpio]
indicator_pin = 17
vibration_pin = 17
"#,
    )
    .expect("write");

    match BridgeConfig::load(Some(&path)) {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("must differ")));
        }
        other => panic!("Expected validation error, got {other:?}"),
    }
}

#[test]
fn malformed_toml_reports_file_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[node\nname = ").expect("write");

    let err = BridgeConfig::load_from_file(&path).expect_err("parse failure");
    assert!(matches!(err, ConfigError::Parse(ref p, _) if p == &path));
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn every_validation_problem_is_reported_at_once() {
    let toml_str = r#"
[node]
tick_interval_ms = 50

[transport]
receive_timeout_ms = 80
peer_port = 0

[sensor]
address = 200
"#;
    match BridgeConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("receive_timeout_ms")));
            assert!(errors.iter().any(|e| e.contains("peer_port")));
            assert!(errors.iter().any(|e| e.contains("sensor.address")));
        }
        other => panic!("Expected validation error, got {other:?}"),
    }
}

#[test]
fn disabled_transport_skips_bind_addr_check() {
    let mut config = BridgeConfig::default();
    config.transport.enabled = false;
    config.transport.bind_addr = "not-an-address".to_string();
    let (errors, _) = validate_ranges(&config);
    assert!(errors.is_empty(), "Unexpected errors: {errors:?}");
}

#[test]
fn notify_without_password_is_a_warning() {
    let mut config = BridgeConfig::default();
    config.notify.enabled = true;
    config.notify.recipient = "inspector@example.com".to_string();
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "notify.password"));
}
