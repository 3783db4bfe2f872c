//! Configuration for Mixdesk
//!
//! - Generic YAML config loading/saving
//! - Standard config paths
//! - `EngineConfig`, the engine's full settings document
//!
//! # Usage
//!
//! ```ignore
//! use mixdesk_core::config::{default_config_path, load_config, EngineConfig, ENGINE_CONFIG_FILE};
//!
//! let config: EngineConfig = load_config(&default_config_path(ENGINE_CONFIG_FILE));
//! ```

mod engine;
mod io;
mod paths;

pub use engine::{
    default_session, AnalyzerConfig, EngineConfig, MasterConfig, TransportConfig, RAMP_MS_RANGE,
};
pub use io::{load_config, read_config, save_config};
pub use paths::{default_config_dir, default_config_path, ENGINE_CONFIG_FILE};
