use std::{io, path::PathBuf, time::Duration};

/// An invalid logger configuration. The only error a caller ever sees, and only
/// while building the logger.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file rotation interval is zero
    #[error("rotation interval must be greater than zero")]
    InvalidRotationInterval,
    /// The maximum log file size is zero or negative
    #[error("maximum log file size must be greater than zero")]
    InvalidMaxSize,
    /// The log directory cannot be used
    #[error("invalid log directory {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },
    /// No application name to tag entries and name files with
    #[error("application name must not be empty")]
    MissingAppName,
    /// The escalation queue cannot hold a single report
    #[error("escalation queue capacity must be greater than zero")]
    InvalidQueueCapacity,
    /// Escalation is enabled without anywhere to send reports to
    #[error("escalation is enabled but no endpoint is configured")]
    MissingEscalationEndpoint,
    /// The timestamp format is not a valid strftime pattern
    #[error("invalid time format `{0}`")]
    InvalidTimeFormat(String),
    /// The configuration file is not valid TOML for this schema
    #[error("parsing configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration file could not be read
    #[error("reading configuration {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The log file could not be created
    #[error("opening log file: {0}")]
    OpenLogFile(#[source] io::Error),
    /// The background escalation thread could not be started
    #[error("starting escalation worker: {0}")]
    EscalationWorker(#[source] io::Error),
}

/// A failure writing one entry into one sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("writing log entry: {0}")]
    Io(#[from] io::Error),
    #[error("encoding log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A failure delivering a report to the crash-reporting service. Only ever
/// logged locally.
#[derive(Debug, thiserror::Error)]
pub enum EscalationError {
    #[error("crash report transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("crash reporting service answered with status {0}")]
    Status(u16),
    #[error("escalation queue is full")]
    QueueFull,
    #[error("escalation worker is gone")]
    Disconnected,
    #[error("escalation queue not drained within {0:?}")]
    FlushTimeout(Duration),
    #[error("{0}")]
    Other(String),
}
