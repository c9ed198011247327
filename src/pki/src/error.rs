//! Error types for credential issuance, root persistence and chain assembly

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PkiError>;

#[derive(Debug, Error)]
pub enum PkiError {
    /// Primitive failure while generating, signing or verifying
    #[error("Crypto error: {0}")]
    Crypto(#[from] pqbench_crypto::CryptoError),

    /// Unknown algorithm name or level
    #[error(transparent)]
    Core(#[from] pqbench_core::CoreError),

    /// Certificate DER encoding or decoding
    #[error("DER encoding error: {0}")]
    Der(#[from] der::Error),

    /// Certificate or PEM input that cannot be parsed
    #[error("Certificate parse error: {0}")]
    Parse(String),

    /// Algorithm not valid in this position of the chain
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Issuer key is a KEM key
    #[error("Key cannot sign certificates: {0}")]
    KeyCannotSign(String),

    /// Path validation failure
    #[error("Certificate verification failed: {0}")]
    Verification(String),

    /// Root record or PEM file I/O
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No record for the requested family and level
    #[error("Root record not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    /// Record field that is not hex
    #[error("Root record line {line}: invalid hex")]
    InvalidHex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },

    /// Record without exactly eight fields
    #[error("Root record has {found} fields, expected {expected}")]
    FieldCount { expected: usize, found: usize },

    /// Record line over the configured limit
    #[error("Root record line {line} exceeds {limit} bytes")]
    RecordTooLarge { line: usize, limit: usize },

    /// Record fields that decode but do not fit together
    #[error("Malformed root record: {0}")]
    MalformedRecord(String),
}

impl PkiError {
    pub fn verification<S: Into<String>>(msg: S) -> Self {
        PkiError::Verification(msg.into())
    }
}
