//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = HuddleConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_port_zero() {
    let mut config = HuddleConfig::default();
    config.relay.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.port"));
}

#[test]
fn catches_empty_bind() {
    let mut config = HuddleConfig::default();
    config.relay.bind = "  ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.bind"));
}

#[test]
fn catches_http_server_url() {
    let mut config = HuddleConfig::default();
    config.client.server_url = "http://localhost:5000".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("client.server_url"));
}

#[test]
fn accepts_wss_server_url() {
    let mut config = HuddleConfig::default();
    config.client.server_url = "wss://relay.example/ws".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_frame_size_too_small() {
    let mut config = HuddleConfig::default();
    config.audio.frame_size = 64;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("audio.frame_size"));
}

#[test]
fn catches_sample_rate_too_high() {
    let mut config = HuddleConfig::default();
    config.audio.sample_rate = 400_000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("audio.sample_rate"));
}

#[test]
fn collects_every_error() {
    let mut config = HuddleConfig::default();
    config.relay.outbound_queue = 1;
    config.client.connect_timeout_secs = 0;
    config.audio.frame_size = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.outbound_queue"));
    assert!(err.contains("client.connect_timeout_secs"));
    assert!(err.contains("audio.frame_size"));
    assert_eq!(err.matches("; ").count(), 2);
}
