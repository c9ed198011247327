//! Integration tests for identifier-addressed primitives

use pqbench_core::{AlgorithmCatalog, AlgorithmId};
use pqbench_crypto::{
    generate_key, verify_signature, CryptoError, EcKeyPair, HybridKeyPair, KemKeyPair, PrivateKey,
};
use proptest::prelude::*;

#[test]
fn every_hybrid_signature_signs_and_verifies() {
    for desc in AlgorithmCatalog::hybrid_signatures() {
        let key = generate_key(desc.id);
        let sig = key.sign(b"to be signed").unwrap();
        verify_signature(desc.id, &key.public_key_bytes(), b"to be signed", &sig)
            .unwrap_or_else(|e| panic!("{}: {}", desc.name, e));
    }
}

#[test]
fn every_key_exchange_encapsulates() {
    for desc in AlgorithmCatalog::key_exchanges() {
        let AlgorithmId::KeyExchange(id) = desc.id else {
            panic!("{} is not a key exchange", desc.name);
        };
        let PrivateKey::Kem(key) = generate_key(desc.id) else {
            panic!("{} did not produce a KEM key", desc.name);
        };
        let (ss, ct) = KemKeyPair::encapsulate(id, &key.public_key_bytes()).unwrap();
        assert_eq!(key.decapsulate(&ct).unwrap(), ss, "{}", desc.name);
    }
}

#[test]
fn signature_from_other_algorithm_rejected() {
    let d2 = AlgorithmCatalog::resolve_signature("P256_Dilithium2").unwrap().id;
    let f512 = AlgorithmCatalog::resolve_signature("P256_Falcon512").unwrap().id;
    let key = generate_key(d2);
    let sig = key.sign(b"msg").unwrap();

    assert!(verify_signature(f512, &key.public_key_bytes(), b"msg", &sig).is_err());
}

#[test]
fn hybrid_parts_reassemble_exactly() {
    let id = match AlgorithmCatalog::resolve_signature("P521_Dilithium5").unwrap().id {
        AlgorithmId::HybridSignature(id) => id,
        other => panic!("unexpected identifier {:?}", other),
    };
    let original = HybridKeyPair::generate(id);

    let der = original.classical().to_sec1_der().unwrap();
    let classical = EcKeyPair::from_sec1_der(id.curve, &der).unwrap();
    let rebuilt = HybridKeyPair::from_parts(
        id,
        classical,
        original.pq_secret().to_vec(),
        original.pq_public().to_vec(),
    )
    .unwrap();

    assert_eq!(rebuilt, original);
    assert_eq!(rebuilt.public_key_bytes(), original.public_key_bytes());
}

#[test]
fn truncated_composite_public_key_rejected() {
    let id = AlgorithmCatalog::resolve_signature("P256_Dilithium2").unwrap().id;
    let key = generate_key(id);
    let sig = key.sign(b"msg").unwrap();
    let pk = key.public_key_bytes();

    let result = verify_signature(id, &pk[..40], b"msg", &sig);
    assert!(matches!(result, Err(CryptoError::InvalidKey(_)) | Err(CryptoError::InvalidPublicKey)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn ecdsa_signatures_bind_message(
        message in prop::collection::vec(any::<u8>(), 0..256),
        flip in any::<usize>(),
    ) {
        let id = AlgorithmCatalog::resolve_classical("P256").unwrap().id;
        let key = generate_key(id);
        let sig = key.sign(&message).unwrap();
        prop_assert!(verify_signature(id, &key.public_key_bytes(), &message, &sig).is_ok());

        if !message.is_empty() {
            let mut tampered = message.clone();
            let idx = flip % tampered.len();
            tampered[idx] ^= 0x01;
            prop_assert!(verify_signature(id, &key.public_key_bytes(), &tampered, &sig).is_err());
        }
    }
}
