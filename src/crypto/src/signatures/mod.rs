//! Post-quantum signature schemes (Dilithium, Falcon)
//!
//! Keys and signatures cross this boundary as opaque byte strings; the
//! scheme identifier alone selects the primitive.

use crate::error::{CryptoError, Result};
use pqbench_core::PqSignatureScheme;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};

/// Generic signature scheme over raw key bytes
pub trait SignatureScheme: Send + Sync {
    /// Generate a new keypair (returns (public_key, secret_key))
    fn generate_keypair(&self) -> (Vec<u8>, Vec<u8>);

    /// Sign a message with a secret key, returning a detached signature
    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>>;

    /// Verify a detached signature with a public key
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()>;
}

/// Bind `$m` to the pqcrypto module for `$scheme` and evaluate `$body`
macro_rules! with_scheme {
    ($scheme:expr, $m:ident => $body:expr) => {
        match $scheme {
            PqSignatureScheme::Dilithium2 => {
                use pqcrypto_dilithium::dilithium2 as $m;
                $body
            }
            PqSignatureScheme::Dilithium3 => {
                use pqcrypto_dilithium::dilithium3 as $m;
                $body
            }
            PqSignatureScheme::Dilithium5 => {
                use pqcrypto_dilithium::dilithium5 as $m;
                $body
            }
            PqSignatureScheme::Falcon512 => {
                use pqcrypto_falcon::falcon512 as $m;
                $body
            }
            PqSignatureScheme::Falcon1024 => {
                use pqcrypto_falcon::falcon1024 as $m;
                $body
            }
        }
    };
}

impl SignatureScheme for PqSignatureScheme {
    fn generate_keypair(&self) -> (Vec<u8>, Vec<u8>) {
        with_scheme!(*self, m => {
            let (pk, sk) = m::keypair();
            (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
        })
    }

    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        with_scheme!(*self, m => {
            let sk = m::SecretKey::from_bytes(secret_key)
                .map_err(|_| CryptoError::InvalidSecretKey)?;
            Ok(m::detached_sign(message, &sk).as_bytes().to_vec())
        })
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
        with_scheme!(*self, m => {
            let pk = m::PublicKey::from_bytes(public_key)
                .map_err(|_| CryptoError::InvalidPublicKey)?;
            let sig = m::DetachedSignature::from_bytes(signature)
                .map_err(|_| CryptoError::InvalidSignature(format!("{} signature", self.name())))?;
            m::verify_detached_signature(&sig, message, &pk)
                .map_err(|_| CryptoError::SignatureVerificationFailed)
        })
    }
}

/// Check that secret and public key bytes have the sizes `scheme` expects
pub fn check_key_sizes(
    scheme: PqSignatureScheme,
    public_key: &[u8],
    secret_key: &[u8],
) -> Result<()> {
    with_scheme!(scheme, m => {
        m::PublicKey::from_bytes(public_key).map_err(|_| CryptoError::InvalidPublicKey)?;
        m::SecretKey::from_bytes(secret_key).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PqSignatureScheme; 5] = [
        PqSignatureScheme::Dilithium2,
        PqSignatureScheme::Dilithium3,
        PqSignatureScheme::Dilithium5,
        PqSignatureScheme::Falcon512,
        PqSignatureScheme::Falcon1024,
    ];

    #[test]
    fn test_sign_verify_every_scheme() {
        for scheme in ALL {
            let (pk, sk) = scheme.generate_keypair();
            let sig = scheme.sign(&sk, b"message").unwrap();
            assert!(scheme.verify(&pk, b"message", &sig).is_ok(), "{:?}", scheme);
            assert!(scheme.verify(&pk, b"tampered", &sig).is_err(), "{:?}", scheme);
        }
    }

    #[test]
    fn test_wrong_key_size_rejected() {
        let (pk, sk) = PqSignatureScheme::Dilithium2.generate_keypair();
        assert!(check_key_sizes(PqSignatureScheme::Dilithium2, &pk, &sk).is_ok());
        assert!(matches!(
            check_key_sizes(PqSignatureScheme::Dilithium3, &pk, &sk),
            Err(CryptoError::InvalidPublicKey)
        ));
        assert!(matches!(
            PqSignatureScheme::Dilithium2.sign(&sk[..10], b"m"),
            Err(CryptoError::InvalidSecretKey)
        ));
    }
}
