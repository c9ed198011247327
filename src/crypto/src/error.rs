//! Error types for the primitive layer

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material of the wrong shape for its algorithm
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Public key bytes that do not decode
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Secret key bytes that do not decode
    #[error("Invalid secret key")]
    InvalidSecretKey,

    /// Signature bytes that do not decode
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Well-formed signature that does not verify
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Signing primitive failure
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Ciphertext of the wrong length for the KEM
    #[error("Invalid ciphertext")]
    InvalidCiphertext,

    /// Key could not be serialized
    #[error("Key encoding failed: {0}")]
    KeyEncoding(String),

    /// Serialized key could not be parsed
    #[error("Key decoding failed: {0}")]
    KeyDecoding(String),

    /// KEM keys cannot sign, signature keys cannot decapsulate
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}
