//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing keys, malformed hostname)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Public IP or domain lookup failed
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// The DNS provider rejected the update or could not be reached
    #[error("Update error: {0}")]
    Update(String),

    /// An operation failed on every attempt of its retry budget
    #[error("{label} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        /// Name of the operation, for logging
        label: String,
        /// Number of attempts made
        attempts: u32,
        /// The failure of the last attempt
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create an update error
    pub fn update(msg: impl Into<String>) -> Self {
        Self::Update(msg.into())
    }

    /// Whether this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
