//! # PQBench PKI
//!
//! Certificates for hybrid, post-quantum and classical keys.
//!
//! ## Module Structure
//!
//! ```text
//! pki/
//! ├── certificate/   - Parsed DER certificates and signature checks
//! ├── factory/       - One-shot certificate issuance per algorithm
//! ├── root_store/    - Eight-line root CA records on disk
//! ├── chain/         - Root + intermediate assembly, leaf issuance, path validation
//! └── oids/          - Algorithm identifiers
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pqbench_core::{AlgorithmCatalog, BenchmarkConfig, SecurityLevel};
//! use pqbench_pki::{ChainAssembler, KeyUsages, LeafRole};
//!
//! # fn main() -> pqbench_pki::Result<()> {
//! let assembler = ChainAssembler::new(&BenchmarkConfig::default());
//! let chain = assembler.build_chain(SecurityLevel::L3)?;
//! let kex = AlgorithmCatalog::resolve_key_exchange("P384_Kyber768")?.id;
//! let usage = KeyUsages::KeyAgreement.into();
//! let server = chain.issue_leaf(kex, LeafRole::Server, usage, "127.0.0.1")?;
//! chain.verify_leaf(&server.leaf)?;
//! # Ok(())
//! # }
//! ```

pub mod certificate;
pub mod chain;
pub mod error;
pub mod factory;
pub mod oids;
pub mod root_store;

pub use certificate::{Certificate, ExtKeyUsage};
pub use chain::{ChainAssembler, EndpointCredential, LeafRole, TrustChain};
pub use error::{PkiError, Result};
pub use factory::{CredentialFactory, IssueRequest, IssuedCredential, Issuer};
pub use root_store::{RootRecord, RootStore};

pub use der::flagset::FlagSet;
pub use x509_cert::ext::pkix::KeyUsages;
