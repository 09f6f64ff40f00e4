//! Logging initialization

use crate::log_shipper::LogShipperLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Console filter: `RUST_LOG` when set, otherwise `level`
pub fn console_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize tracing with standard configuration
pub fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(console_filter(level))
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}

/// Initialize tracing with console output plus remote log shipping
///
/// The shipper applies its own level threshold, independent of the console
/// filter.
pub fn init_tracing_with_shipper(level: &str, shipper: LogShipperLayer) {
    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_filter(console_filter(level));

    tracing_subscriber::registry()
        .with(console)
        .with(shipper)
        .init();
}
