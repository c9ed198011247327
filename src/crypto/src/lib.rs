//! # PQBench Cryptography Module
//!
//! Primitive operations addressed purely by algorithm identifier. Nothing
//! above this crate inspects primitive internals.
//!
//! ## Module Structure
//!
//! ```text
//! crypto/
//! ├── classical/     - ECDSA / ECDH on P-256, P-384, P-521
//! ├── signatures/    - Dilithium and Falcon
//! ├── kem/           - Kyber, Saber and NTRU
//! ├── hybrid/        - Classical + post-quantum composites
//! └── keys/          - Identifier-dispatched generation and verification
//! ```

pub mod classical;
pub mod error;
pub mod hybrid;
pub mod kem;
pub mod keys;
pub mod signatures;

pub use classical::EcKeyPair;
pub use error::{CryptoError, Result};
pub use hybrid::{HybridKeyPair, KemKeyPair};
pub use kem::KeyEncapsulation;
pub use keys::{generate_key, verify_signature, PrivateKey};
pub use signatures::SignatureScheme;
