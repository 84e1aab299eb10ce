//! Configuration: TOML-backed settings and the manager that loads,
//! validates, and atomically saves them.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{LoggingSettings, Settings, StageWeight};
