//! Tracing setup.

/// Install the fmt subscriber. Safe to call more than once; later calls are no-ops.
pub fn init() {
    if tracing_subscriber::fmt().try_init().is_ok() {
        tracing::debug!("tracing subscriber installed");
    }
}
