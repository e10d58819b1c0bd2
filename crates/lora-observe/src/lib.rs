//! Process-wide `tracing` setup for the reconciliation daemon.
mod config;
mod error;
mod format;
mod logger;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Install the global subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] when called twice.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    logger::install(cfg)
}
