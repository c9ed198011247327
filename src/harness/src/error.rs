//! Error types for the benchmark harness

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Chain assembly or leaf issuance
    #[error(transparent)]
    Pki(#[from] pqbench_pki::PkiError),

    /// Catalog lookup or configuration
    #[error(transparent)]
    Core(#[from] pqbench_core::CoreError),

    /// Key material handed to the engine
    #[error("Crypto error: {0}")]
    Crypto(#[from] pqbench_crypto::CryptoError),

    /// Socket connect, accept, read or write
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine-reported handshake failure
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Handshake completed with the wrong variant or flags
    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// Request or response bytes differ from the configured message
    #[error("Application data error: {0}")]
    AppData(String),

    /// Runnable pair without a dial target
    #[error("No address for {kex} / {auth}")]
    NoTarget { kex: String, auth: String },
}

impl HarnessError {
    pub fn handshake<S: Into<String>>(msg: S) -> Self {
        HarnessError::Handshake(msg.into())
    }
}
