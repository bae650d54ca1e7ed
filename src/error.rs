//! Turmoil Error Types
//!
//! This module defines the errors that can occur while selecting targets and
//! talking to the cluster manager.

use std::time::Duration;

/// Error types for chaos operations
#[derive(Debug, thiserror::Error)]
pub enum TurmoilError {
    /// Network or API failure while calling the cluster manager
    #[error("Cluster communication error: {0}")]
    ClientCommunication(String),

    /// Selection attempted against zero candidates
    #[error("No candidates left to select from")]
    EmptyPopulation,

    /// Malformed or out-of-range configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An action exceeded its time bound
    #[error("Action timed out after {0:?}")]
    Timeout(Duration),
}

impl TurmoilError {
    /// Whether this error is a benign no-op for a timer tick
    pub fn is_benign(&self) -> bool {
        matches!(self, TurmoilError::EmptyPopulation)
    }
}

impl From<reqwest::Error> for TurmoilError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        TurmoilError::ClientCommunication(message)
    }
}

pub type Result<T> = std::result::Result<T, TurmoilError>;
