//! Object identifiers for certificate algorithms
//!
//! Classical keys use the standard `id-ecPublicKey` / `ecdsa-with-SHA*`
//! identifiers. Hybrid signature and KEM keys have no registered OIDs, so
//! they live under two private arcs with the catalog wire code as the final
//! component.

use crate::error::{PkiError, Result};
use const_oid::ObjectIdentifier;
use der::asn1::Any;
use der::Encode;
use pqbench_core::{AlgorithmCatalog, AlgorithmId, ClassicalCurve};
use x509_cert::spki::AlgorithmIdentifierOwned;

pub const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
pub const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
pub const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
pub const ECDSA_WITH_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");

pub const ID_KP_SERVER_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.1");
pub const ID_KP_CLIENT_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.2");

const HYBRID_SIGNATURE_ARC: &str = "1.3.9999.99";
const KEY_EXCHANGE_ARC: &str = "1.3.9999.98";

/// Named-curve OID
pub fn curve_oid(curve: ClassicalCurve) -> ObjectIdentifier {
    match curve {
        ClassicalCurve::P256 => ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7"),
        ClassicalCurve::P384 => ObjectIdentifier::new_unwrap("1.3.132.0.34"),
        ClassicalCurve::P521 => ObjectIdentifier::new_unwrap("1.3.132.0.35"),
    }
}

/// DER (tag, length, value) encoding of the named-curve OID
pub fn curve_oid_der(curve: ClassicalCurve) -> Result<Vec<u8>> {
    Ok(curve_oid(curve).to_der()?)
}

fn private_arc(arc: &str, code: u16) -> Result<ObjectIdentifier> {
    ObjectIdentifier::new(&format!("{}.{}", arc, code))
        .map_err(|e| PkiError::UnsupportedAlgorithm(format!("{}.{}: {}", arc, code, e)))
}

fn wire_code(id: AlgorithmId) -> Result<u16> {
    let name = id.name();
    let desc = match id {
        AlgorithmId::KeyExchange(_) => AlgorithmCatalog::resolve_key_exchange(&name)?,
        AlgorithmId::HybridSignature(_) => AlgorithmCatalog::resolve_signature(&name)?,
        AlgorithmId::Classical(_) => AlgorithmCatalog::resolve_classical(&name)?,
    };
    Ok(desc.code)
}

/// Subject public key algorithm identifier for a key of type `id`
pub fn public_key_algorithm(id: AlgorithmId) -> Result<AlgorithmIdentifierOwned> {
    let (oid, parameters) = match id {
        AlgorithmId::Classical(curve) => {
            (ID_EC_PUBLIC_KEY, Some(Any::encode_from(&curve_oid(curve))?))
        }
        AlgorithmId::HybridSignature(_) => {
            (private_arc(HYBRID_SIGNATURE_ARC, wire_code(id)?)?, None)
        }
        AlgorithmId::KeyExchange(_) => (private_arc(KEY_EXCHANGE_ARC, wire_code(id)?)?, None),
    };
    Ok(AlgorithmIdentifierOwned { oid, parameters })
}

/// Signature algorithm identifier for signatures made by a key of type `id`
pub fn signature_algorithm(id: AlgorithmId) -> Result<AlgorithmIdentifierOwned> {
    let oid = match id {
        AlgorithmId::Classical(ClassicalCurve::P256) => ECDSA_WITH_SHA256,
        AlgorithmId::Classical(ClassicalCurve::P384) => ECDSA_WITH_SHA384,
        AlgorithmId::Classical(ClassicalCurve::P521) => ECDSA_WITH_SHA512,
        AlgorithmId::HybridSignature(_) => private_arc(HYBRID_SIGNATURE_ARC, wire_code(id)?)?,
        AlgorithmId::KeyExchange(kex) => return Err(PkiError::KeyCannotSign(kex.name())),
    };
    Ok(AlgorithmIdentifierOwned {
        oid,
        parameters: None,
    })
}

/// Recover the key algorithm from a subject public key algorithm identifier
pub fn algorithm_from_spki(alg: &AlgorithmIdentifierOwned) -> Result<AlgorithmId> {
    if alg.oid == ID_EC_PUBLIC_KEY {
        let params = alg
            .parameters
            .as_ref()
            .ok_or_else(|| PkiError::Parse("EC public key without curve parameters".into()))?
            .to_der()?;
        for curve in ClassicalCurve::ALL {
            if curve_oid_der(curve)? == params {
                return Ok(AlgorithmId::Classical(curve));
            }
        }
        return Err(PkiError::UnsupportedAlgorithm(format!(
            "EC curve parameters {}",
            hex::encode(params)
        )));
    }

    let dotted = alg.oid.to_string();
    let code_of = |arc: &str| -> Option<u16> {
        dotted
            .strip_prefix(arc)
            .and_then(|rest| rest.strip_prefix('.'))
            .and_then(|code| code.parse().ok())
    };

    if let Some(code) = code_of(HYBRID_SIGNATURE_ARC) {
        return Ok(AlgorithmCatalog::signature_by_code(code)?.id);
    }
    if let Some(code) = code_of(KEY_EXCHANGE_ARC) {
        return Ok(AlgorithmCatalog::key_exchange_by_code(code)?.id);
    }
    Err(PkiError::UnsupportedAlgorithm(dotted))
}
