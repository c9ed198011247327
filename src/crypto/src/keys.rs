//! Identifier-addressed key generation and signing
//!
//! [`generate_key`] is the single entry point credential issuance uses: it
//! matches on the [`AlgorithmId`] variant and returns the matching
//! [`PrivateKey`] variant.

use crate::classical::EcKeyPair;
use crate::error::{CryptoError, Result};
use crate::hybrid::{HybridKeyPair, KemKeyPair};
use pqbench_core::AlgorithmId;

/// Private key of an issued credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateKey {
    HybridSignature(HybridKeyPair),
    Kem(KemKeyPair),
    Ecdsa(EcKeyPair),
}

impl PrivateKey {
    pub fn algorithm(&self) -> AlgorithmId {
        match self {
            PrivateKey::HybridSignature(key) => AlgorithmId::HybridSignature(key.id()),
            PrivateKey::Kem(key) => AlgorithmId::KeyExchange(key.id()),
            PrivateKey::Ecdsa(key) => AlgorithmId::Classical(key.curve()),
        }
    }

    /// Public key bytes for the certificate's subject public key
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            PrivateKey::HybridSignature(key) => key.public_key_bytes(),
            PrivateKey::Kem(key) => key.public_key_bytes(),
            PrivateKey::Ecdsa(key) => key.public_point(),
        }
    }

    /// Sign with this key; KEM keys cannot sign
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        match self {
            PrivateKey::HybridSignature(key) => key.sign(message),
            PrivateKey::Ecdsa(key) => key.sign(message),
            PrivateKey::Kem(key) => Err(CryptoError::UnsupportedOperation(format!(
                "{} is a key-encapsulation key and cannot sign",
                key.id()
            ))),
        }
    }

    pub fn as_hybrid(&self) -> Option<&HybridKeyPair> {
        match self {
            PrivateKey::HybridSignature(key) => Some(key),
            _ => None,
        }
    }
}

/// Generate a fresh key for `id`
pub fn generate_key(id: AlgorithmId) -> PrivateKey {
    match id {
        AlgorithmId::KeyExchange(kex) => PrivateKey::Kem(KemKeyPair::generate(kex)),
        AlgorithmId::HybridSignature(sig) => {
            PrivateKey::HybridSignature(HybridKeyPair::generate(sig))
        }
        AlgorithmId::Classical(curve) => PrivateKey::Ecdsa(EcKeyPair::generate(curve)),
    }
}

/// Verify `signature` over `message` made by the holder of `public_key`
pub fn verify_signature(
    id: AlgorithmId,
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    match id {
        AlgorithmId::HybridSignature(sig) => {
            HybridKeyPair::verify(sig, public_key, message, signature)
        }
        AlgorithmId::Classical(curve) => EcKeyPair::verify(curve, public_key, message, signature),
        AlgorithmId::KeyExchange(kex) => Err(CryptoError::UnsupportedOperation(format!(
            "{} keys do not produce signatures",
            kex
        ))),
    }
}
