//! Validation for the relay and client sections.

use crate::schema::HuddleConfig;

use super::helpers::validate_range;

pub(crate) fn validate_relay(errors: &mut Vec<String>, config: &HuddleConfig) {
    validate_range(errors, "relay.port", config.relay.port.into(), 1, 65535);
    validate_range(
        errors,
        "relay.outbound_queue",
        config.relay.outbound_queue as u64,
        16,
        65536,
    );
    if config.relay.bind.trim().is_empty() {
        errors.push("relay.bind must not be empty".into());
    }
}

pub(crate) fn validate_client(errors: &mut Vec<String>, config: &HuddleConfig) {
    let url = &config.client.server_url;
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(format!(
            "client.server_url = {url:?} must start with ws:// or wss://"
        ));
    }
    validate_range(
        errors,
        "client.connect_timeout_secs",
        config.client.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "client.outbound_queue",
        config.client.outbound_queue as u64,
        16,
        65536,
    );
}
