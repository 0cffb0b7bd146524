//! Tracing/logging setup shared by every process embedding the engine.

/// Initialize process-wide tracing with defaults (`RUST_LOG`, JSON, `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(&LogSettings::default());
}

/// Initialize tracing from explicit settings.
pub fn init_with(settings: &LogSettings) {
    tracing::init(settings);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use tracing::LogSettings;
