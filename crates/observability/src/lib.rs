//! Process-wide tracing setup.

pub mod tracing;

pub use tracing::LogFormat;

/// Initialize tracing with the format selected by `LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
