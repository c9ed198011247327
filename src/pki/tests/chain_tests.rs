//! Integration tests for chain assembly
//!
//! Tests:
//! - Synthesized chains at every level and mode
//! - Leaf issuance under the intermediate (server and client roles)
//! - Path validation failures
//! - Persisted and PEM root sources

use pqbench_core::{
    AlgorithmCatalog, AlgorithmId, BenchmarkConfig, ClassicalCurve, HandshakeMode, RootFamily,
    RootSource, SecurityLevel,
};
use pqbench_pki::{ChainAssembler, ExtKeyUsage, KeyUsages, LeafRole, PkiError, RootStore};
use tempfile::TempDir;

fn config(mode: HandshakeMode) -> BenchmarkConfig {
    BenchmarkConfig {
        mode,
        ..Default::default()
    }
}

#[test]
fn test_level3_chain_without_persisted_root() {
    let chain = ChainAssembler::new(&config(HandshakeMode::Kemtls))
        .build_chain(SecurityLevel::L3)
        .unwrap();

    assert!(chain.root().is_ca());
    assert!(chain.root().is_self_issued());
    assert!(chain.intermediate().is_ca());
    chain.intermediate().verify_issued_by(chain.root()).unwrap();

    let kex = AlgorithmCatalog::resolve_key_exchange("P384_Kyber768").unwrap().id;
    let server = chain
        .issue_leaf(kex, LeafRole::Server, KeyUsages::KeyAgreement.into(), "127.0.0.1")
        .unwrap();

    assert!(!server.leaf.is_ca());
    assert_eq!(server.leaf.public_key_algorithm(), kex);
    server.leaf.verify_issued_by(chain.intermediate()).unwrap();
    chain.verify_leaf(&server.leaf).unwrap();
}

#[test]
fn test_chain_validity_across_modes_and_levels() {
    for level in SecurityLevel::ALL {
        // KEMTLS: KEM leaf
        let chain = build(HandshakeMode::Kemtls, level);
        let name = format!("{}_Kyber{}", level.curve(), kyber(level));
        let kex = AlgorithmCatalog::resolve_key_exchange(&name).unwrap().id;
        let leaf = chain
            .issue_leaf(kex, LeafRole::Server, KeyUsages::KeyAgreement.into(), "127.0.0.1")
            .unwrap();
        chain.verify_leaf(&leaf.leaf).unwrap();

        // PQTLS: hybrid signature leaf at the same level
        let chain = build(HandshakeMode::Pqtls, level);
        let at_level = AlgorithmCatalog::hybrid_signatures()
            .iter()
            .filter(|d| d.security_level == level);
        for desc in at_level {
            let usage = KeyUsages::DigitalSignature.into();
            let leaf = chain
                .issue_leaf(desc.id, LeafRole::Server, usage, "127.0.0.1")
                .unwrap();
            chain.verify_leaf(&leaf.leaf).unwrap();
        }

        // Classic: plain curve leaf
        let chain = build(HandshakeMode::Classic, level);
        let leaf = chain
            .issue_leaf(
                AlgorithmId::Classical(level.curve()),
                LeafRole::Server,
                KeyUsages::DigitalSignature.into(),
                "127.0.0.1",
            )
            .unwrap();
        chain.verify_leaf(&leaf.leaf).unwrap();
    }
}

fn build(mode: HandshakeMode, level: SecurityLevel) -> pqbench_pki::TrustChain {
    ChainAssembler::new(&config(mode)).build_chain(level).unwrap()
}

fn kyber(level: SecurityLevel) -> u16 {
    match level {
        SecurityLevel::L1 => 512,
        SecurityLevel::L3 => 768,
        SecurityLevel::L5 => 1024,
    }
}

#[test]
fn test_endpoint_chain_and_roles() {
    let chain = ChainAssembler::new(&config(HandshakeMode::Pqtls))
        .build_chain(SecurityLevel::L1)
        .unwrap();
    let auth = AlgorithmCatalog::resolve_signature("P256_Falcon512").unwrap().id;

    let server = chain
        .issue_leaf(
            auth,
            LeafRole::Server,
            KeyUsages::DigitalSignature.into(),
            "10.0.0.2,bench.local",
        )
        .unwrap();
    let client = chain
        .issue_leaf(auth, LeafRole::Client, KeyUsages::DigitalSignature.into(), "10.0.0.3")
        .unwrap();

    assert_eq!(server.chain.len(), 2);
    assert_eq!(&server.chain[0], &server.leaf);
    assert_eq!(&server.chain[1], chain.intermediate());

    assert_eq!(server.leaf.common_name(), "server");
    assert_eq!(server.leaf.ext_key_usage(), &[ExtKeyUsage::ServerAuth]);
    assert_eq!(server.leaf.dns_names(), &["bench.local".to_string()]);
    assert_eq!(client.leaf.common_name(), "client");
    assert_eq!(client.leaf.ext_key_usage(), &[ExtKeyUsage::ClientAuth]);
    assert_eq!(client.key.public_key_bytes(), client.leaf.public_key());
}

#[test]
fn test_leaf_from_other_chain_rejected() {
    let assembler = ChainAssembler::new(&config(HandshakeMode::Classic));
    let first = assembler.build_chain(SecurityLevel::L1).unwrap();
    let second = assembler.build_chain(SecurityLevel::L1).unwrap();

    let leaf = first
        .issue_leaf(
            AlgorithmId::Classical(ClassicalCurve::P256),
            LeafRole::Server,
            KeyUsages::DigitalSignature.into(),
            "127.0.0.1",
        )
        .unwrap();

    // Same subject names, different keys
    let err = second.verify_leaf(&leaf.leaf).unwrap_err();
    assert!(matches!(err, PkiError::Verification(_)));
}

#[test]
fn test_persisted_root_source() {
    let dir = TempDir::new().unwrap();
    let store = RootStore::new(dir.path());
    let (_, root_cert, _) = store.generate("P384_Dilithium3").unwrap();

    let config = BenchmarkConfig {
        mode: HandshakeMode::Pqtls,
        root: RootSource::Persisted {
            family: RootFamily::Dilithium,
            dir: dir.path().to_path_buf(),
        },
        ..Default::default()
    };
    let chain = ChainAssembler::new(&config).build_chain(SecurityLevel::L3).unwrap();

    assert_eq!(chain.root(), &root_cert);
    assert_eq!(chain.intermediate().public_key_algorithm().name(), "P384_Dilithium3");

    let auth = AlgorithmCatalog::resolve_signature("P384_Dilithium3").unwrap().id;
    let leaf = chain
        .issue_leaf(auth, LeafRole::Server, KeyUsages::DigitalSignature.into(), "127.0.0.1")
        .unwrap();
    chain.verify_leaf(&leaf.leaf).unwrap();
}

#[test]
fn test_falcon_level3_uses_level1_record() {
    let dir = TempDir::new().unwrap();
    RootStore::new(dir.path()).generate("P256_Falcon512").unwrap();

    let config = BenchmarkConfig {
        mode: HandshakeMode::Pqtls,
        root: RootSource::Persisted {
            family: RootFamily::Falcon,
            dir: dir.path().to_path_buf(),
        },
        ..Default::default()
    };
    let chain = ChainAssembler::new(&config).build_chain(SecurityLevel::L3).unwrap();
    assert_eq!(chain.root().public_key_algorithm().name(), "P256_Falcon512");
}

#[test]
fn test_pem_root_source() {
    let dir = TempDir::new().unwrap();
    let cert_path = dir.path().join("root.pem");
    let key_path = dir.path().join("root.key");

    std::fs::write(&cert_path, PEM_ROOT_CERT).unwrap();
    std::fs::write(&key_path, PEM_ROOT_KEY).unwrap();

    let config = BenchmarkConfig {
        mode: HandshakeMode::Classic,
        root: RootSource::Pem {
            cert: cert_path,
            key: key_path,
        },
        ..Default::default()
    };
    let chain = ChainAssembler::new(&config).build_chain(SecurityLevel::L1).unwrap();
    assert_eq!(
        chain.intermediate().public_key_algorithm(),
        AlgorithmId::Classical(ClassicalCurve::P256)
    );
    chain.intermediate().verify_issued_by(chain.root()).unwrap();
}

#[test]
fn test_pem_root_missing_files() {
    let dir = TempDir::new().unwrap();
    let config = BenchmarkConfig {
        root: RootSource::Pem {
            cert: dir.path().join("absent.pem"),
            key: dir.path().join("absent.key"),
        },
        ..Default::default()
    };
    let err = ChainAssembler::new(&config).build_chain(SecurityLevel::L1).unwrap_err();
    assert!(matches!(err, PkiError::RootNotFound { .. }));
}

// Self-signed P-256 CA with its PKCS#8 key
const PEM_ROOT_CERT: &str = include_str!("data/root_p256.pem");
const PEM_ROOT_KEY: &str = include_str!("data/root_p256.key");
