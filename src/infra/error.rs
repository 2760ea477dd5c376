//! Error types for proof gateway infrastructure

use thiserror::Error;

/// Errors raised by stores, transports and other collaborators
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Key-value or record store failure (connectivity, not a missing key)
    #[error("store error: {0}")]
    Store(String),

    /// Shard host request failed
    ///
    /// `status` is set when the host answered with a non-success status and
    /// is `None` when no response was received.
    #[error("shard transport error ({}): {message}", status_label(.status))]
    Transport { status: Option<u16>, message: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn transport_status(status: u16, message: impl Into<String>) -> Self {
        GatewayError::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport_no_response(message: impl Into<String>) -> Self {
        GatewayError::Transport {
            status: None,
            message: message.into(),
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}

/// Result type for gateway infrastructure operations
pub type Result<T> = std::result::Result<T, GatewayError>;
