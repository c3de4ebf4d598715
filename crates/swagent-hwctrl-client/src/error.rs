//! Error types for hw-ctrl client operations.
//!
//! All errors implement `std::error::Error` via `thiserror`. Transport
//! failures are distinguished from remote (application) failures so the
//! retrying and reconnecting channel layers can decide what to do.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use swagent_types::SwitchId;
use thiserror::Error;

/// Result type alias for hw-ctrl client operations.
pub type HwCtrlResult<T> = Result<T, HwCtrlError>;

/// Errors that can occur talking to a hw agent.
#[derive(Debug, Error)]
pub enum HwCtrlError {
    /// No client is configured for the switch.
    #[error("No client found for switch {switch_id}")]
    NoClient { switch_id: SwitchId },

    /// The TCP connection could not be established.
    #[error("Failed to connect to {peer}: {source}")]
    Connect {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Reading or writing an established connection failed.
    #[error("I/O error talking to {peer}: {source}")]
    Io {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The remote closed the connection.
    #[error("Connection to {peer} closed")]
    Disconnected { peer: SocketAddr },

    /// Connect or request did not complete in time.
    #[error("{operation} to {peer} timed out after {timeout:?}")]
    Timeout {
        peer: SocketAddr,
        operation: &'static str,
        timeout: Duration,
    },

    /// The hw agent answered with an error.
    #[error("Remote error for {method}: {message}")]
    Remote { method: String, message: String },

    /// A frame could not be encoded or decoded.
    #[error("Malformed frame: {0}")]
    Codec(#[from] serde_json::Error),

    /// The response did not match the outstanding request.
    #[error("Unexpected response sequence from {peer}: expected {expected}, got {actual}")]
    SequenceMismatch {
        peer: SocketAddr,
        expected: u64,
        actual: u64,
    },

    /// Every attempt of a retried request failed.
    #[error("Request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<HwCtrlError>,
    },

    /// The background executor went away before answering.
    #[error("Client executor {name} is shut down")]
    ExecutorShutdown { name: String },

    /// `base_port + switch_index` does not fit in a port number.
    #[error("Port for switch {switch_id} out of range: base {base_port} + index {switch_index}")]
    PortOutOfRange {
        switch_id: SwitchId,
        base_port: u16,
        switch_index: u16,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// Local OS error outside of a connection (thread or runtime setup,
    /// reading a config file).
    #[error("{context}: {source}")]
    Local {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl HwCtrlError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a local OS error.
    pub fn local(context: impl Into<String>, source: io::Error) -> Self {
        Self::Local {
            context: context.into(),
            source,
        }
    }

    /// Returns true if the failure is transient and the request may
    /// succeed on another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HwCtrlError::Connect { .. }
                | HwCtrlError::Io { .. }
                | HwCtrlError::Disconnected { .. }
                | HwCtrlError::Timeout { .. }
        )
    }

    /// Returns true if the connection that produced this error can no
    /// longer be used.
    pub fn breaks_connection(&self) -> bool {
        self.is_retryable()
            || matches!(
                self,
                HwCtrlError::Codec(_) | HwCtrlError::SequenceMismatch { .. }
            )
    }
}
