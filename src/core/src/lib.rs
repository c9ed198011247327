//! # PQBench Core
//!
//! Algorithm catalog, security-level classification and the immutable
//! benchmark configuration shared by the credential, chain and harness
//! crates.

pub mod algorithms;
pub mod config;
pub mod error;

pub use algorithms::{
    AlgorithmCatalog, AlgorithmDescriptor, AlgorithmId, AlgorithmKind, ClassicalCurve,
    HybridSignatureId, KemScheme, KeyExchangeId, PqSignatureScheme, SecurityLevel,
};
pub use config::{BenchmarkConfig, HandshakeMode, RootFamily, RootSource};
pub use error::{CoreError, Result};
