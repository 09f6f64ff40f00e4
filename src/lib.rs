//! Reader Panel - Main Library
//!
//! Composition root for the reader dashboard transport layer.
//!
//! ## Architecture
//!
//! - **config**: YAML + environment configuration
//! - **logging** / **log_shipper**: console tracing and remote log batches
//! - **transport**: the single HTTP client and socket client pair
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **panel_http** / **panel_socket**: transport libraries (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```no_run
//! use reader_panel::bin_common::{load_config_from_env, ConfigType};
//! use reader_panel::config::AppConfig;
//! use reader_panel::transport::Transport;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = AppConfig::load(load_config_from_env(ConfigType::Panel))?;
//! let transport = Transport::from_config(&config)?;
//! # Ok(())
//! # }
//! ```

// Re-export workspace libraries for convenience
pub use panel_http;
pub use panel_socket;

pub mod config;
pub mod log_shipper;
pub mod logging;
pub mod transport;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{config_path_from_args, load_config_from_env, parse_args, ConfigType};
    pub use runner::{shutdown_signal, BinaryRunner, RunConfig};
}
