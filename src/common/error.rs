//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors. Fatal at startup - the bridge never
/// starts relaying with a broken channel-pair table or missing tokens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Stoat REST / gateway errors.
#[derive(Debug, Error)]
pub enum StoatError {
    #[error("Stoat API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway error: {message}")]
    Gateway { message: String },
}

/// Attachment transfer errors. Always recoverable - the dispatcher
/// degrades to appending the source URL instead.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("File exceeds size limit ({size} > {limit} bytes)")]
    Oversized { size: u64, limit: u64 },

    #[error("File fetch returned HTTP {status}")]
    Status { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for Stoat operations.
pub type StoatResult<T> = std::result::Result<T, StoatError>;
