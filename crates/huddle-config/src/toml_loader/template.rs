//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Huddle Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[relay]
# bind = "0.0.0.0"
# port = 5000            # 1-65535
# outbound_queue = 256   # 16-65536

[client]
# server_url = "ws://localhost:5000"
# connect_timeout_secs = 15   # 1-120
# outbound_queue = 256        # 16-65536

[audio]
# frame_size = 4096      # 256-16384
# sample_rate = 48000    # 8000-192000

[identity]
# store_path = "/path/to/identity.json"

[logging]
# level = "INFO"         # TRACE, DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
