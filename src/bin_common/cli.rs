//! CLI utilities for binaries
//!
//! Resolves which configuration file a binary should load.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Dashboard transport configuration (config/panel.yaml)
    Panel,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Panel => "config/panel.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        "PANEL_CONFIG_PATH"
    }
}

/// Load configuration path from environment or use default
///
/// # Examples
/// ```
/// use reader_panel::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Panel);
/// assert!(path.to_string_lossy().ends_with(".yaml"));
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Resolve the config path, letting a first positional argument win
///
/// `panel_console path/to/panel.yaml` beats `PANEL_CONFIG_PATH`.
pub fn config_path_from_args(args: &[String]) -> PathBuf {
    match args.first() {
        Some(path) if !path.starts_with('-') => PathBuf::from(path),
        _ => load_config_from_env(ConfigType::Panel),
    }
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}
