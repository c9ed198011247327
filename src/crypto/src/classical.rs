//! NIST prime-curve keys
//!
//! [`EcKeyPair`] is the classical half of every hybrid key and the whole key
//! in classical-only runs. Public points are exchanged in uncompressed SEC1
//! form; private keys serialize as SEC1 `ECPrivateKey` DER, which carries the
//! named-curve OID.

use crate::error::{CryptoError, Result};
use pqbench_core::ClassicalCurve;
use rand::rngs::OsRng;

use p256::elliptic_curve::sec1::ToEncodedPoint;

/// Classical private key on one of the three supported curves
#[derive(Clone)]
pub enum EcKeyPair {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl std::fmt::Debug for EcKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcKeyPair")
            .field("curve", &self.curve())
            .field("public_point", &self.public_point().len())
            .finish()
    }
}

impl PartialEq for EcKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.curve() == other.curve() && self.scalar_bytes() == other.scalar_bytes()
    }
}

impl Eq for EcKeyPair {}

impl EcKeyPair {
    /// Generate a fresh key on `curve`
    pub fn generate(curve: ClassicalCurve) -> Self {
        match curve {
            ClassicalCurve::P256 => EcKeyPair::P256(p256::SecretKey::random(&mut OsRng)),
            ClassicalCurve::P384 => EcKeyPair::P384(p384::SecretKey::random(&mut OsRng)),
            ClassicalCurve::P521 => EcKeyPair::P521(p521::SecretKey::random(&mut OsRng)),
        }
    }

    pub fn curve(&self) -> ClassicalCurve {
        match self {
            EcKeyPair::P256(_) => ClassicalCurve::P256,
            EcKeyPair::P384(_) => ClassicalCurve::P384,
            EcKeyPair::P521(_) => ClassicalCurve::P521,
        }
    }

    /// Uncompressed SEC1 public point
    pub fn public_point(&self) -> Vec<u8> {
        match self {
            EcKeyPair::P256(sk) => sk.public_key().to_encoded_point(false).as_bytes().to_vec(),
            EcKeyPair::P384(sk) => sk.public_key().to_encoded_point(false).as_bytes().to_vec(),
            EcKeyPair::P521(sk) => sk.public_key().to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    fn scalar_bytes(&self) -> Vec<u8> {
        match self {
            EcKeyPair::P256(sk) => sk.to_bytes().to_vec(),
            EcKeyPair::P384(sk) => sk.to_bytes().to_vec(),
            EcKeyPair::P521(sk) => sk.to_bytes().to_vec(),
        }
    }

    /// SEC1 `ECPrivateKey` DER encoding
    pub fn to_sec1_der(&self) -> Result<Vec<u8>> {
        let der = match self {
            EcKeyPair::P256(sk) => sk.to_sec1_der(),
            EcKeyPair::P384(sk) => sk.to_sec1_der(),
            EcKeyPair::P521(sk) => sk.to_sec1_der(),
        }
        .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
        Ok(der.to_vec())
    }

    /// Parse a SEC1 `ECPrivateKey` DER encoding for `curve`
    pub fn from_sec1_der(curve: ClassicalCurve, der: &[u8]) -> Result<Self> {
        let key = match curve {
            ClassicalCurve::P256 => p256::SecretKey::from_sec1_der(der).map(EcKeyPair::P256),
            ClassicalCurve::P384 => p384::SecretKey::from_sec1_der(der).map(EcKeyPair::P384),
            ClassicalCurve::P521 => p521::SecretKey::from_sec1_der(der).map(EcKeyPair::P521),
        };
        key.map_err(|e| CryptoError::KeyDecoding(format!("{} private key: {}", curve, e)))
    }

    /// Parse a PEM private key, PKCS#8 or SEC1
    pub fn from_pem(curve: ClassicalCurve, pem: &str) -> Result<Self> {
        use p256::pkcs8::DecodePrivateKey;

        let key = match curve {
            ClassicalCurve::P256 => p256::SecretKey::from_pkcs8_pem(pem)
                .ok()
                .or_else(|| p256::SecretKey::from_sec1_pem(pem).ok())
                .map(EcKeyPair::P256),
            ClassicalCurve::P384 => p384::SecretKey::from_pkcs8_pem(pem)
                .ok()
                .or_else(|| p384::SecretKey::from_sec1_pem(pem).ok())
                .map(EcKeyPair::P384),
            ClassicalCurve::P521 => p521::SecretKey::from_pkcs8_pem(pem)
                .ok()
                .or_else(|| p521::SecretKey::from_sec1_pem(pem).ok())
                .map(EcKeyPair::P521),
        };
        key.ok_or_else(|| {
            CryptoError::KeyDecoding(format!("no {} private key in PEM input", curve))
        })
    }

    /// ECDSA signature (DER), hashed with the curve's matching SHA-2
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        use p256::ecdsa::signature::Signer;

        let der = match self {
            EcKeyPair::P256(sk) => {
                let signing_key = p256::ecdsa::SigningKey::from(sk);
                let sig: p256::ecdsa::Signature = signing_key.sign(message);
                sig.to_der().as_bytes().to_vec()
            }
            EcKeyPair::P384(sk) => {
                let signing_key = p384::ecdsa::SigningKey::from(sk);
                let sig: p384::ecdsa::Signature = signing_key.sign(message);
                sig.to_der().as_bytes().to_vec()
            }
            EcKeyPair::P521(sk) => {
                let signing_key = p521::ecdsa::SigningKey::from_slice(&sk.to_bytes())
                    .map_err(|e| CryptoError::Signing(e.to_string()))?;
                let sig: p521::ecdsa::Signature = signing_key.sign(message);
                sig.to_der().as_bytes().to_vec()
            }
        };
        Ok(der)
    }

    /// Verify a DER ECDSA signature against an uncompressed public point
    pub fn verify(
        curve: ClassicalCurve,
        public_point: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        use p256::ecdsa::signature::Verifier;

        match curve {
            ClassicalCurve::P256 => {
                let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_point)
                    .map_err(|_| CryptoError::InvalidPublicKey)?;
                let sig = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
                vk.verify(message, &sig)
            }
            ClassicalCurve::P384 => {
                let vk = p384::ecdsa::VerifyingKey::from_sec1_bytes(public_point)
                    .map_err(|_| CryptoError::InvalidPublicKey)?;
                let sig = p384::ecdsa::Signature::from_der(signature)
                    .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
                vk.verify(message, &sig)
            }
            ClassicalCurve::P521 => {
                let vk = p521::ecdsa::VerifyingKey::from_sec1_bytes(public_point)
                    .map_err(|_| CryptoError::InvalidPublicKey)?;
                let sig = p521::ecdsa::Signature::from_der(signature)
                    .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
                vk.verify(message, &sig)
            }
        }
        .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// ECDH with a peer's uncompressed point, returning the raw x-coordinate
    pub fn diffie_hellman(&self, peer_point: &[u8]) -> Result<Vec<u8>> {
        let shared = match self {
            EcKeyPair::P256(sk) => {
                let peer = p256::PublicKey::from_sec1_bytes(peer_point)
                    .map_err(|_| CryptoError::InvalidPublicKey)?;
                p256::elliptic_curve::ecdh::diffie_hellman(sk.to_nonzero_scalar(), peer.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            EcKeyPair::P384(sk) => {
                let peer = p384::PublicKey::from_sec1_bytes(peer_point)
                    .map_err(|_| CryptoError::InvalidPublicKey)?;
                p384::elliptic_curve::ecdh::diffie_hellman(sk.to_nonzero_scalar(), peer.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
            EcKeyPair::P521(sk) => {
                let peer = p521::PublicKey::from_sec1_bytes(peer_point)
                    .map_err(|_| CryptoError::InvalidPublicKey)?;
                p521::elliptic_curve::ecdh::diffie_hellman(sk.to_nonzero_scalar(), peer.as_affine())
                    .raw_secret_bytes()
                    .to_vec()
            }
        };
        Ok(shared)
    }
}
