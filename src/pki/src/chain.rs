//! Trust chain assembly
//!
//! [`ChainAssembler::build_chain`] produces a root and an intermediate CA for
//! one security level. Leaves are issued separately through
//! [`TrustChain::issue_leaf`], since the leaf algorithm changes per algorithm
//! pair while the CAs are reused.
//!
//! An assembler resolves each level's root once. Clones share those roots,
//! so a client and server built from clones of one assembler trust the same
//! anchor even when the root is synthesized.

use crate::certificate::{Certificate, ExtKeyUsage};
use crate::error::{PkiError, Result};
use crate::factory::{CredentialFactory, IssueRequest, Issuer};
use crate::root_store::RootStore;
use chrono::{DateTime, Utc};
use der::flagset::FlagSet;
use pqbench_core::{
    AlgorithmCatalog, AlgorithmId, BenchmarkConfig, HandshakeMode, RootFamily, RootSource,
    SecurityLevel,
};
use parking_lot::Mutex;
use pqbench_crypto::{EcKeyPair, PrivateKey};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use x509_cert::ext::pkix::KeyUsages;

/// Hosts placed in CA certificates' SANs
const CA_HOSTS: &str = "127.0.0.1";

/// Which endpoint a leaf identifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafRole {
    Server,
    Client,
}

impl LeafRole {
    pub fn name(self) -> &'static str {
        match self {
            LeafRole::Server => "server",
            LeafRole::Client => "client",
        }
    }

    pub fn ext_key_usage(self) -> ExtKeyUsage {
        match self {
            LeafRole::Server => ExtKeyUsage::ServerAuth,
            LeafRole::Client => ExtKeyUsage::ClientAuth,
        }
    }
}

/// A leaf with its key and the chain an endpoint presents
#[derive(Debug, Clone)]
pub struct EndpointCredential {
    pub leaf: Certificate,
    pub key: PrivateKey,
    /// `[leaf, intermediate]`
    pub chain: Vec<Certificate>,
}

/// Root and intermediate CA for one security level
#[derive(Debug, Clone)]
pub struct TrustChain {
    root: Certificate,
    intermediate: Certificate,
    intermediate_key: PrivateKey,
    level: SecurityLevel,
}

impl TrustChain {
    pub fn root(&self) -> &Certificate {
        &self.root
    }

    pub fn intermediate(&self) -> &Certificate {
        &self.intermediate
    }

    pub fn intermediate_key(&self) -> &PrivateKey {
        &self.intermediate_key
    }

    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    /// Issue a leaf under the intermediate
    pub fn issue_leaf(
        &self,
        algorithm: AlgorithmId,
        role: LeafRole,
        key_usage: FlagSet<KeyUsages>,
        hosts: &str,
    ) -> Result<EndpointCredential> {
        let issued = CredentialFactory::issue(&IssueRequest {
            algorithm,
            issuer: Issuer::Signed {
                certificate: &self.intermediate,
                key: &self.intermediate_key,
            },
            is_ca: false,
            role: role.name(),
            key_usage,
            ext_key_usage: &[role.ext_key_usage()],
            hosts,
        })?;

        debug!(role = role.name(), algorithm = %algorithm, level = %self.level, "Issued leaf");

        Ok(EndpointCredential {
            chain: vec![issued.certificate.clone(), self.intermediate.clone()],
            leaf: issued.certificate,
            key: issued.private_key,
        })
    }

    /// Validate `leaf -> intermediate -> root` at the current time
    pub fn verify_leaf(&self, leaf: &Certificate) -> Result<()> {
        self.verify_leaf_at(leaf, Utc::now())
    }

    pub fn verify_leaf_at(&self, leaf: &Certificate, now: DateTime<Utc>) -> Result<()> {
        if leaf.is_ca() {
            return Err(PkiError::verification(format!(
                "leaf '{}' is a CA",
                leaf.common_name()
            )));
        }
        check_validity(leaf, now)?;
        verify_link(leaf, &self.intermediate, now)?;
        verify_link(&self.intermediate, &self.root, now)?;

        if !self.root.is_self_issued() {
            return Err(PkiError::verification("root is not self-issued"));
        }
        self.root.verify_issued_by(&self.root)
    }
}

fn check_validity(cert: &Certificate, now: DateTime<Utc>) -> Result<()> {
    if !cert.is_valid_at(now) {
        return Err(PkiError::verification(format!(
            "'{}' is not valid at {} (valid {} to {})",
            cert.common_name(),
            now,
            cert.not_before(),
            cert.not_after()
        )));
    }
    Ok(())
}

fn verify_link(child: &Certificate, issuer: &Certificate, now: DateTime<Utc>) -> Result<()> {
    if !issuer.is_ca() {
        return Err(PkiError::verification(format!(
            "issuer '{}' is not a CA",
            issuer.common_name()
        )));
    }
    if !issuer.key_usage().contains(KeyUsages::KeyCertSign) {
        return Err(PkiError::verification(format!(
            "issuer '{}' lacks certificate signing usage",
            issuer.common_name()
        )));
    }
    check_validity(issuer, now)?;
    child.verify_issued_by(issuer)
}

type RootCa = (Certificate, PrivateKey);

/// Builds root + intermediate chains from the configured root source
#[derive(Debug, Clone)]
pub struct ChainAssembler {
    mode: HandshakeMode,
    root: RootSource,
    max_record_line_bytes: usize,
    roots: Arc<Mutex<BTreeMap<SecurityLevel, RootCa>>>,
}

impl ChainAssembler {
    pub fn new(config: &BenchmarkConfig) -> Self {
        Self {
            mode: config.mode,
            root: config.root.clone(),
            max_record_line_bytes: config.max_record_line_bytes,
            roots: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Root and a freshly signed intermediate for `level`
    pub fn build_chain(&self, level: SecurityLevel) -> Result<TrustChain> {
        let (root, root_key) = self.root_for(level)?;
        let algorithm = self.intermediate_algorithm(level, &root_key)?;

        let intermediate = CredentialFactory::issue(&IssueRequest {
            algorithm,
            issuer: Issuer::Signed {
                certificate: &root,
                key: &root_key,
            },
            is_ca: true,
            role: "intermediate",
            key_usage: FlagSet::from(KeyUsages::KeyCertSign),
            ext_key_usage: &[],
            hosts: CA_HOSTS,
        })?;

        info!(
            level = %level,
            root = %root.public_key_algorithm(),
            intermediate = %algorithm,
            "Built trust chain"
        );

        Ok(TrustChain {
            root,
            intermediate: intermediate.certificate,
            intermediate_key: intermediate.private_key,
            level,
        })
    }

    /// Intermediate algorithm for `level`; fixed by the level and root source
    fn intermediate_algorithm(
        &self,
        level: SecurityLevel,
        root_key: &PrivateKey,
    ) -> Result<AlgorithmId> {
        match (&self.root, self.mode) {
            (RootSource::Persisted { .. }, _) | (RootSource::Pem { .. }, _) => {
                Ok(root_key.algorithm())
            }
            (RootSource::Synthesized, HandshakeMode::Classic) => {
                Ok(AlgorithmId::Classical(level.curve()))
            }
            (RootSource::Synthesized, _) => representative(RootFamily::Dilithium, level),
        }
    }

    /// Root CA for `level`, resolved on first use and shared afterwards
    pub fn root_for(&self, level: SecurityLevel) -> Result<(Certificate, PrivateKey)> {
        if let Some(root) = self.roots.lock().get(&level) {
            return Ok(root.clone());
        }

        // Resolved outside the lock; a concurrent first use keeps whichever
        // root landed first
        let root = self.resolve_root(level)?;
        Ok(self.roots.lock().entry(level).or_insert(root).clone())
    }

    fn resolve_root(&self, level: SecurityLevel) -> Result<RootCa> {
        match &self.root {
            RootSource::Synthesized => {
                let algorithm = match self.mode {
                    HandshakeMode::Classic => AlgorithmId::Classical(level.curve()),
                    _ => representative(RootFamily::Dilithium, level)?,
                };
                let root = CredentialFactory::issue(&IssueRequest {
                    algorithm,
                    issuer: Issuer::SelfSigned,
                    is_ca: true,
                    role: "root",
                    key_usage: FlagSet::from(KeyUsages::KeyCertSign),
                    ext_key_usage: &[],
                    hosts: CA_HOSTS,
                })?;
                debug!(level = %level, algorithm = %algorithm, "Synthesized root CA");
                Ok((root.certificate, root.private_key))
            }
            RootSource::Persisted { family, dir } => {
                let store = RootStore::new(dir).with_max_line_bytes(self.max_record_line_bytes);
                let (certificate, key) = store.load(*family, level)?;
                Ok((certificate, PrivateKey::HybridSignature(key)))
            }
            RootSource::Pem { cert, key } => load_pem_root(cert, key),
        }
    }
}

fn representative(family: RootFamily, level: SecurityLevel) -> Result<AlgorithmId> {
    Ok(AlgorithmCatalog::resolve_signature(family.representative(level)?)?.id)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PkiError::RootNotFound {
            path: PathBuf::from(path),
        },
        _ => PkiError::Io(e),
    })
}

/// Classical ECDSA root from a PEM certificate and PEM private key
fn load_pem_root(cert_path: &Path, key_path: &Path) -> Result<(Certificate, PrivateKey)> {
    let cert_pem = read_file(cert_path)?;
    let (_, pem) = x509_parser::pem::parse_x509_pem(&cert_pem)
        .map_err(|e| PkiError::Parse(format!("{}: {}", cert_path.display(), e)))?;
    let certificate = Certificate::from_der(&pem.contents)?;

    let curve = match certificate.public_key_algorithm() {
        AlgorithmId::Classical(curve) => curve,
        other => {
            return Err(PkiError::UnsupportedAlgorithm(format!(
                "PEM root must be an ECDSA certificate, found {}",
                other
            )))
        }
    };

    let key_pem = read_file(key_path)?;
    let key_pem = String::from_utf8(key_pem)
        .map_err(|_| PkiError::Parse(format!("{} is not UTF-8", key_path.display())))?;
    let key = EcKeyPair::from_pem(curve, &key_pem)?;
    if key.public_point() != certificate.public_key() {
        return Err(PkiError::verification(format!(
            "{} does not hold the key of {}",
            key_path.display(),
            cert_path.display()
        )));
    }

    info!(cert = %cert_path.display(), curve = %curve, "Loaded PEM root CA");
    Ok((certificate, PrivateKey::Ecdsa(key)))
}
