//! Error types shared by every benchmark component
//!
//! Everything in here is a configuration error: an algorithm name the
//! catalog does not know, a level it cannot classify, or a settings value
//! the run cannot start with. None of them are retried.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for catalog lookups and configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Name is not a known key-exchange algorithm
    #[error("Unknown key-exchange algorithm: {0}")]
    UnknownKeyExchange(String),

    /// Name is not a known signature algorithm
    #[error("Unknown signature algorithm: {0}")]
    UnknownSignature(String),

    /// Name carries no curve prefix and is not a known post-quantum name
    #[error("Unknown security level for algorithm: {0}")]
    UnknownSecurityLevel(String),

    /// Numeric security level outside {1, 3, 5}
    #[error("Invalid security level: {0}")]
    InvalidSecurityLevel(u8),

    /// Root family not present in the persistence table
    #[error("Unknown root family: {0}")]
    UnknownRootFamily(String),

    /// Family has no representative for this level
    #[error("Root family {family} has no algorithm for level {level}")]
    NoRootForLevel { family: String, level: u8 },

    /// KEX and Auth levels differ on an explicitly requested pair
    #[error("Security level mismatch: {kex} is level {kex_level}, {auth} is level {auth_level}")]
    LevelMismatch {
        kex: String,
        kex_level: u8,
        auth: String,
        auth_level: u8,
    },

    /// Settings that cannot produce a run
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        CoreError::Configuration(msg.into())
    }
}
