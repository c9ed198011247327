use crate::classical::EcKeyPair;
use crate::error::{CryptoError, Result};
use crate::kem::KeyEncapsulation;
use pqbench_core::KeyExchangeId;

/// Static KEM key for KEMTLS authentication.
///
/// Depending on the identifier this is an ECDH key used as a KEM, a pure
/// post-quantum KEM key, or both. Hybrid shared secrets are the ECDH secret
/// followed by the KEM secret.
#[derive(Clone, PartialEq, Eq)]
pub struct KemKeyPair {
    id: KeyExchangeId,
    classical: Option<EcKeyPair>,
    pq: Option<(Vec<u8>, Vec<u8>)>,
}

impl std::fmt::Debug for KemKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemKeyPair")
            .field("id", &self.id)
            .field("classical", &self.classical)
            .field("pq_public_len", &self.pq.as_ref().map(|(pk, _)| pk.len()))
            .finish()
    }
}

impl KemKeyPair {
    pub fn generate(id: KeyExchangeId) -> Self {
        let classical = id.curve().map(EcKeyPair::generate);
        let pq = id.kem().map(|kem| kem.generate_keypair());
        Self { id, classical, pq }
    }

    pub fn id(&self) -> KeyExchangeId {
        self.id
    }

    /// Public key as placed in a certificate
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match (&self.classical, &self.pq) {
            (Some(ec), Some((pk, _))) => super::join(&ec.public_point(), pk),
            (Some(ec), None) => ec.public_point(),
            (None, Some((pk, _))) => pk.clone(),
            (None, None) => Vec::new(),
        }
    }

    /// Encapsulate to a certified KEM public key (returns (shared_secret, ciphertext))
    pub fn encapsulate(id: KeyExchangeId, public_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        match id {
            KeyExchangeId::Ecdh(curve) => {
                let ephemeral = EcKeyPair::generate(curve);
                Ok((ephemeral.diffie_hellman(public_key)?, ephemeral.public_point()))
            }
            KeyExchangeId::Kem(kem) => kem.encapsulate(public_key),
            KeyExchangeId::Hybrid(curve, kem) => {
                let (classical_pk, pq_pk) = super::split(public_key)?;
                let ephemeral = EcKeyPair::generate(curve);
                let mut shared = ephemeral.diffie_hellman(classical_pk)?;
                let (pq_shared, pq_ct) = kem.encapsulate(pq_pk)?;
                shared.extend_from_slice(&pq_shared);
                Ok((shared, super::join(&ephemeral.public_point(), &pq_ct)))
            }
        }
    }

    /// Recover the shared secret from a ciphertext sent to this key
    pub fn decapsulate(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match (self.id, &self.classical, &self.pq) {
            (KeyExchangeId::Ecdh(_), Some(ec), None) => ec.diffie_hellman(ciphertext),
            (KeyExchangeId::Kem(kem), None, Some((_, sk))) => kem.decapsulate(sk, ciphertext),
            (KeyExchangeId::Hybrid(_, kem), Some(ec), Some((_, sk))) => {
                let (classical_ct, pq_ct) = super::split(ciphertext)
                    .map_err(|_| CryptoError::InvalidCiphertext)?;
                let mut shared = ec.diffie_hellman(classical_ct)?;
                shared.extend_from_slice(&kem.decapsulate(sk, pq_ct)?);
                Ok(shared)
            }
            _ => Err(CryptoError::InvalidKey(format!("{} key is missing a component", self.id))),
        }
    }
}
