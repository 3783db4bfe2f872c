//! Standard locations for Mixdesk configuration files

use std::path::PathBuf;

/// Default engine config file name
pub const ENGINE_CONFIG_FILE: &str = "engine.yaml";

/// Configuration directory: `<config dir>/mixdesk`
///
/// Falls back to the working directory when the platform has no config dir.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mixdesk")
}

/// Path of a file inside the configuration directory
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
