//! Error types for the agent ensemble.

use crate::routes::RouteOp;
use std::io;
use swagent_hwctrl_client::HwCtrlError;
use swagent_types::{ClientId, PortId, RouterId, SwitchRunState};
use thiserror::Error;

/// Result type alias for ensemble operations.
pub type EnsembleResult<T> = Result<T, EnsembleError>;

#[derive(Debug, Error)]
pub enum EnsembleError {
    /// An operation needing the platform and switch ran before
    /// `setup_ensemble`.
    #[error("{operation} called before setup_ensemble")]
    NotSetUp { operation: &'static str },

    #[error("Ensemble is already set up")]
    AlreadySetUp,

    #[error("Agent is already started")]
    AlreadyStarted,

    /// Malformed or unusable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Platform construction or platform mapping failure.
    #[error("Platform error: {0}")]
    Platform(String),

    /// The switch runtime rejected an operation.
    #[error("Switch {operation} failed: {message}")]
    Switch {
        operation: &'static str,
        message: String,
    },

    /// A route chunk failed; the chunks after it were not attempted.
    #[error(
        "Route {op} for router {router} client {client} failed after {chunks_applied} of {total_chunks} chunks: {source}"
    )]
    RouteUpdate {
        router: RouterId,
        client: ClientId,
        op: RouteOp,
        chunks_applied: usize,
        total_chunks: usize,
        #[source]
        source: Box<EnsembleError>,
    },

    /// The last completed stats poll has no entry for the port.
    #[error("No stats collected for port {port}")]
    StatsUnavailable { port: PortId },

    /// A run state transition would move backwards.
    #[error("Switch run state cannot regress from {current} to {requested}")]
    RunStateRegression {
        current: SwitchRunState,
        requested: SwitchRunState,
    },

    #[error("State observer name {name} is already registered")]
    ObserverNameInUse { name: String },

    #[error("hw ctrl error: {0}")]
    HwCtrl(#[from] HwCtrlError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnsembleError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a platform error.
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform(message.into())
    }

    /// Creates a switch runtime error.
    pub fn switch(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Switch {
            operation,
            message: message.into(),
        }
    }

    /// Returns true for errors that abort bring-up.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EnsembleError::Config(_)
                | EnsembleError::Platform(_)
                | EnsembleError::Io(_)
                | EnsembleError::Json(_)
                | EnsembleError::RunStateRegression { .. }
        )
    }
}
