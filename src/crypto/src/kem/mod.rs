//! Post-quantum key encapsulation (Kyber, Saber, NTRU)

use crate::error::{CryptoError, Result};
use pqbench_core::KemScheme;
use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};

/// Key encapsulation mechanism over raw key bytes
pub trait KeyEncapsulation: Send + Sync {
    /// Generate a new keypair (returns (public_key, secret_key))
    fn generate_keypair(&self) -> (Vec<u8>, Vec<u8>);

    /// Encapsulate to a public key (returns (shared_secret, ciphertext))
    fn encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>;

    /// Recover the shared secret from a ciphertext
    fn decapsulate(&self, secret_key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

macro_rules! with_kem {
    ($scheme:expr, $m:ident => $body:expr) => {
        match $scheme {
            KemScheme::Kyber512 => {
                use pqcrypto_kyber::kyber512 as $m;
                $body
            }
            KemScheme::Kyber768 => {
                use pqcrypto_kyber::kyber768 as $m;
                $body
            }
            KemScheme::Kyber1024 => {
                use pqcrypto_kyber::kyber1024 as $m;
                $body
            }
            KemScheme::LightSaber => {
                use pqcrypto_saber::lightsaber as $m;
                $body
            }
            KemScheme::Saber => {
                use pqcrypto_saber::saber as $m;
                $body
            }
            KemScheme::FireSaber => {
                use pqcrypto_saber::firesaber as $m;
                $body
            }
            KemScheme::NtruHps2048509 => {
                use pqcrypto_ntru::ntruhps2048509 as $m;
                $body
            }
            KemScheme::NtruHps2048677 => {
                use pqcrypto_ntru::ntruhps2048677 as $m;
                $body
            }
            KemScheme::NtruHps4096821 => {
                use pqcrypto_ntru::ntruhps4096821 as $m;
                $body
            }
            KemScheme::NtruHps40961229 => {
                use pqcrypto_ntru::ntruhps40961229 as $m;
                $body
            }
            KemScheme::NtruHrss701 => {
                use pqcrypto_ntru::ntruhrss701 as $m;
                $body
            }
            KemScheme::NtruHrss1373 => {
                use pqcrypto_ntru::ntruhrss1373 as $m;
                $body
            }
        }
    };
}

impl KeyEncapsulation for KemScheme {
    fn generate_keypair(&self) -> (Vec<u8>, Vec<u8>) {
        with_kem!(*self, m => {
            let (pk, sk) = m::keypair();
            (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
        })
    }

    fn encapsulate(&self, public_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        with_kem!(*self, m => {
            let pk = m::PublicKey::from_bytes(public_key)
                .map_err(|_| CryptoError::InvalidPublicKey)?;
            let (ss, ct) = m::encapsulate(&pk);
            Ok((ss.as_bytes().to_vec(), ct.as_bytes().to_vec()))
        })
    }

    fn decapsulate(&self, secret_key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        with_kem!(*self, m => {
            let sk = m::SecretKey::from_bytes(secret_key)
                .map_err(|_| CryptoError::InvalidSecretKey)?;
            let ct = m::Ciphertext::from_bytes(ciphertext)
                .map_err(|_| CryptoError::InvalidCiphertext)?;
            Ok(m::decapsulate(&ct, &sk).as_bytes().to_vec())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encapsulate_decapsulate() {
        for scheme in [KemScheme::Kyber512, KemScheme::Saber, KemScheme::NtruHrss701] {
            let (pk, sk) = scheme.generate_keypair();
            let (ss, ct) = scheme.encapsulate(&pk).unwrap();
            assert_eq!(scheme.decapsulate(&sk, &ct).unwrap(), ss, "{:?}", scheme);
        }
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let (pk, sk) = KemScheme::Kyber768.generate_keypair();
        let (_, ct) = KemScheme::Kyber768.encapsulate(&pk).unwrap();
        assert!(matches!(
            KemScheme::Kyber768.decapsulate(&sk, &ct[1..]),
            Err(CryptoError::InvalidCiphertext)
        ));
    }
}
