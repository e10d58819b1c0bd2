use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log format: {0} (expected: text|json|journald)")]
    InvalidFormat(String),
    #[error("journald output is not available in this build")]
    JournaldNotSupported,
    #[error("logger already initialized")]
    AlreadyInitialized,
    #[error("failed to initialize logger: {0}")]
    InitializationFailed(String),
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
}
