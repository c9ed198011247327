use crate::classical::EcKeyPair;
use crate::error::{CryptoError, Result};
use crate::signatures::{check_key_sizes, SignatureScheme};
use pqbench_core::HybridSignatureId;

/// Hybrid signature key: ECDSA on a NIST curve plus a post-quantum scheme.
///
/// Both halves sign the same message; a signature verifies only when both
/// halves do.
#[derive(Clone, PartialEq, Eq)]
pub struct HybridKeyPair {
    id: HybridSignatureId,
    classical: EcKeyPair,
    pq_public: Vec<u8>,
    pq_secret: Vec<u8>,
}

impl std::fmt::Debug for HybridKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridKeyPair")
            .field("id", &self.id)
            .field("classical", &self.classical)
            .field("pq_public_len", &self.pq_public.len())
            .field("pq_secret_len", &self.pq_secret.len())
            .finish()
    }
}

impl HybridKeyPair {
    /// Generate a new hybrid signature keypair
    pub fn generate(id: HybridSignatureId) -> Self {
        let classical = EcKeyPair::generate(id.curve);
        let (pq_public, pq_secret) = id.scheme.generate_keypair();
        Self {
            id,
            classical,
            pq_public,
            pq_secret,
        }
    }

    /// Reassemble a keypair from its stored components
    pub fn from_parts(
        id: HybridSignatureId,
        classical: EcKeyPair,
        pq_secret: Vec<u8>,
        pq_public: Vec<u8>,
    ) -> Result<Self> {
        if classical.curve() != id.curve {
            return Err(CryptoError::InvalidKey(format!(
                "{} requires a {} key, got {}",
                id,
                id.curve,
                classical.curve()
            )));
        }
        check_key_sizes(id.scheme, &pq_public, &pq_secret)?;
        Ok(Self {
            id,
            classical,
            pq_public,
            pq_secret,
        })
    }

    pub fn id(&self) -> HybridSignatureId {
        self.id
    }

    pub fn classical(&self) -> &EcKeyPair {
        &self.classical
    }

    pub fn pq_public(&self) -> &[u8] {
        &self.pq_public
    }

    pub fn pq_secret(&self) -> &[u8] {
        &self.pq_secret
    }

    /// Composite public key as placed in a certificate
    pub fn public_key_bytes(&self) -> Vec<u8> {
        super::join(&self.classical.public_point(), &self.pq_public)
    }

    /// Sign a message with both classical and post-quantum keys
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let classical = self.classical.sign(message)?;
        let post_quantum = self.id.scheme.sign(&self.pq_secret, message)?;
        Ok(super::join(&classical, &post_quantum))
    }

    /// Verify a composite signature against a composite public key
    pub fn verify(
        id: HybridSignatureId,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        let (classical_pk, pq_pk) = super::split(public_key)?;
        let (classical_sig, pq_sig) =
            super::split(signature).map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

        EcKeyPair::verify(id.curve, classical_pk, message, classical_sig)?;
        id.scheme.verify(pq_pk, message, pq_sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pqbench_core::{ClassicalCurve, PqSignatureScheme};

    fn p256_dilithium2() -> HybridSignatureId {
        HybridSignatureId::new(ClassicalCurve::P256, PqSignatureScheme::Dilithium2)
    }

    #[test]
    fn test_hybrid_signature() {
        let keypair = HybridKeyPair::generate(p256_dilithium2());
        let message = b"test message";

        let signature = keypair.sign(message).unwrap();
        let public_key = keypair.public_key_bytes();
        let result = HybridKeyPair::verify(keypair.id(), &public_key, message, &signature);

        assert!(result.is_ok());
    }

    #[test]
    fn test_hybrid_signature_invalid() {
        let keypair1 = HybridKeyPair::generate(p256_dilithium2());
        let keypair2 = HybridKeyPair::generate(p256_dilithium2());
        let message = b"test message";

        let signature = keypair1.sign(message).unwrap();
        let public_key = keypair2.public_key_bytes();
        let result = HybridKeyPair::verify(keypair2.id(), &public_key, message, &signature);

        assert!(result.is_err());
    }

    #[test]
    fn test_classical_half_is_checked() {
        let keypair = HybridKeyPair::generate(p256_dilithium2());
        let other = HybridKeyPair::generate(p256_dilithium2());
        let message = b"test message";

        // Valid post-quantum half, foreign classical half
        let classical = other.classical().sign(message).unwrap();
        let pq = PqSignatureScheme::Dilithium2.sign(keypair.pq_secret(), message).unwrap();
        let forged = super::super::join(&classical, &pq);

        let public_key = keypair.public_key_bytes();
        assert!(HybridKeyPair::verify(keypair.id(), &public_key, message, &forged).is_err());
    }

    #[test]
    fn test_from_parts_rejects_curve_mismatch() {
        let keypair = HybridKeyPair::generate(p256_dilithium2());
        let wrong_curve = EcKeyPair::generate(ClassicalCurve::P384);
        let result = HybridKeyPair::from_parts(
            keypair.id(),
            wrong_curve,
            keypair.pq_secret().to_vec(),
            keypair.pq_public().to_vec(),
        );
        assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
    }
}
