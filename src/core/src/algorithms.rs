//! Algorithm catalog
//!
//! Static tables mapping the human-readable names used on the command line
//! and in result files to typed algorithm identifiers, plus the NIST
//! security-level classifier that drives KEX/Auth pairing.
//!
//! ## Identifiers
//!
//! Every credential the harness issues is keyed by an [`AlgorithmId`]:
//!
//! - [`AlgorithmId::KeyExchange`]: a KEM key (pure post-quantum, hybrid, or
//!   ECDH used as a KEM). Used for KEMTLS leaves.
//! - [`AlgorithmId::HybridSignature`]: a classical ECDSA key paired with a
//!   post-quantum signature key. Used for CAs and PQTLS leaves.
//! - [`AlgorithmId::Classical`]: a plain ECDSA key for classical-only runs.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// NIST post-quantum security category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SecurityLevel {
    L1,
    L3,
    L5,
}

impl SecurityLevel {
    pub const ALL: [SecurityLevel; 3] = [SecurityLevel::L1, SecurityLevel::L3, SecurityLevel::L5];

    pub fn as_u8(self) -> u8 {
        match self {
            SecurityLevel::L1 => 1,
            SecurityLevel::L3 => 3,
            SecurityLevel::L5 => 5,
        }
    }

    pub fn from_u8(level: u8) -> Result<Self> {
        match level {
            1 => Ok(SecurityLevel::L1),
            3 => Ok(SecurityLevel::L3),
            5 => Ok(SecurityLevel::L5),
            other => Err(CoreError::InvalidSecurityLevel(other)),
        }
    }

    /// The classical curve conventionally paired with this level
    pub fn curve(self) -> ClassicalCurve {
        match self {
            SecurityLevel::L1 => ClassicalCurve::P256,
            SecurityLevel::L3 => ClassicalCurve::P384,
            SecurityLevel::L5 => ClassicalCurve::P521,
        }
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = CoreError;

    fn try_from(level: u8) -> Result<Self> {
        SecurityLevel::from_u8(level)
    }
}

impl From<SecurityLevel> for u8 {
    fn from(level: SecurityLevel) -> u8 {
        level.as_u8()
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// NIST prime curves used as the classical half of every hybrid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassicalCurve {
    P256,
    P384,
    P521,
}

impl ClassicalCurve {
    pub const ALL: [ClassicalCurve; 3] = [
        ClassicalCurve::P256,
        ClassicalCurve::P384,
        ClassicalCurve::P521,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClassicalCurve::P256 => "P256",
            ClassicalCurve::P384 => "P384",
            ClassicalCurve::P521 => "P521",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn security_level(self) -> SecurityLevel {
        match self {
            ClassicalCurve::P256 => SecurityLevel::L1,
            ClassicalCurve::P384 => SecurityLevel::L3,
            ClassicalCurve::P521 => SecurityLevel::L5,
        }
    }

    /// Dotted form of the named-curve OID (secp256r1, secp384r1, secp521r1)
    pub fn oid(self) -> &'static str {
        match self {
            ClassicalCurve::P256 => "1.2.840.10045.3.1.7",
            ClassicalCurve::P384 => "1.3.132.0.34",
            ClassicalCurve::P521 => "1.3.132.0.35",
        }
    }
}

impl fmt::Display for ClassicalCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Post-quantum key encapsulation mechanisms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KemScheme {
    Kyber512,
    Kyber768,
    Kyber1024,
    LightSaber,
    Saber,
    FireSaber,
    NtruHps2048509,
    NtruHps2048677,
    NtruHps4096821,
    NtruHps40961229,
    NtruHrss701,
    NtruHrss1373,
}

impl KemScheme {
    pub fn name(self) -> &'static str {
        match self {
            KemScheme::Kyber512 => "Kyber512",
            KemScheme::Kyber768 => "Kyber768",
            KemScheme::Kyber1024 => "Kyber1024",
            KemScheme::LightSaber => "LightSaber_KEM",
            KemScheme::Saber => "Saber_KEM",
            KemScheme::FireSaber => "FireSaber_KEM",
            KemScheme::NtruHps2048509 => "NTRU_HPS_2048_509",
            KemScheme::NtruHps2048677 => "NTRU_HPS_2048_677",
            KemScheme::NtruHps4096821 => "NTRU_HPS_4096_821",
            KemScheme::NtruHps40961229 => "NTRU_HPS_4096_1229",
            KemScheme::NtruHrss701 => "NTRU_HRSS_701",
            KemScheme::NtruHrss1373 => "NTRU_HRSS_1373",
        }
    }
}

/// Post-quantum signature schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PqSignatureScheme {
    Dilithium2,
    Dilithium3,
    Dilithium5,
    Falcon512,
    Falcon1024,
}

impl PqSignatureScheme {
    pub fn name(self) -> &'static str {
        match self {
            PqSignatureScheme::Dilithium2 => "Dilithium2",
            PqSignatureScheme::Dilithium3 => "Dilithium3",
            PqSignatureScheme::Dilithium5 => "Dilithium5",
            PqSignatureScheme::Falcon512 => "Falcon512",
            PqSignatureScheme::Falcon1024 => "Falcon1024",
        }
    }
}

/// Key-exchange identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyExchangeId {
    /// ECDH on a NIST curve, used as a KEM
    Ecdh(ClassicalCurve),
    /// Pure post-quantum KEM
    Kem(KemScheme),
    /// ECDH and a post-quantum KEM, secrets concatenated
    Hybrid(ClassicalCurve, KemScheme),
}

impl KeyExchangeId {
    pub fn curve(self) -> Option<ClassicalCurve> {
        match self {
            KeyExchangeId::Ecdh(curve) | KeyExchangeId::Hybrid(curve, _) => Some(curve),
            KeyExchangeId::Kem(_) => None,
        }
    }

    pub fn kem(self) -> Option<KemScheme> {
        match self {
            KeyExchangeId::Kem(kem) | KeyExchangeId::Hybrid(_, kem) => Some(kem),
            KeyExchangeId::Ecdh(_) => None,
        }
    }

    pub fn name(self) -> String {
        match self {
            KeyExchangeId::Ecdh(curve) => curve.name().to_string(),
            KeyExchangeId::Kem(kem) => kem.name().to_string(),
            KeyExchangeId::Hybrid(curve, kem) => format!("{}_{}", curve.name(), kem.name()),
        }
    }
}

impl fmt::Display for KeyExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Classical curve plus post-quantum signature scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HybridSignatureId {
    pub curve: ClassicalCurve,
    pub scheme: PqSignatureScheme,
}

impl HybridSignatureId {
    pub const fn new(curve: ClassicalCurve, scheme: PqSignatureScheme) -> Self {
        Self { curve, scheme }
    }

    pub fn name(self) -> String {
        format!("{}_{}", self.curve.name(), self.scheme.name())
    }
}

impl fmt::Display for HybridSignatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// The algorithm a credential is issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmId {
    KeyExchange(KeyExchangeId),
    HybridSignature(HybridSignatureId),
    Classical(ClassicalCurve),
}

impl AlgorithmId {
    pub fn name(self) -> String {
        match self {
            AlgorithmId::KeyExchange(id) => id.name(),
            AlgorithmId::HybridSignature(id) => id.name(),
            AlgorithmId::Classical(curve) => curve.name().to_string(),
        }
    }

    /// KEM keys cannot sign certificates
    pub fn can_sign(self) -> bool {
        !matches!(self, AlgorithmId::KeyExchange(_))
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmKind {
    KeyExchange,
    Signature,
}

/// Immutable catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmDescriptor {
    pub name: &'static str,
    pub kind: AlgorithmKind,
    pub security_level: SecurityLevel,
    pub is_hybrid: bool,
    /// Stable wire code; the first field of a persisted root record
    pub code: u16,
    pub id: AlgorithmId,
}

use ClassicalCurve::{P256, P384, P521};
use KemScheme::*;
use PqSignatureScheme::*;
use SecurityLevel::{L1, L3, L5};

const fn kex(
    name: &'static str,
    code: u16,
    level: SecurityLevel,
    id: KeyExchangeId,
) -> AlgorithmDescriptor {
    AlgorithmDescriptor {
        name,
        kind: AlgorithmKind::KeyExchange,
        security_level: level,
        is_hybrid: matches!(id, KeyExchangeId::Hybrid(..)),
        code,
        id: AlgorithmId::KeyExchange(id),
    }
}

const fn hybrid_sig(
    name: &'static str,
    code: u16,
    curve: ClassicalCurve,
    scheme: PqSignatureScheme,
) -> AlgorithmDescriptor {
    let level = match curve {
        P256 => L1,
        P384 => L3,
        P521 => L5,
    };
    AlgorithmDescriptor {
        name,
        kind: AlgorithmKind::Signature,
        security_level: level,
        is_hybrid: true,
        code,
        id: AlgorithmId::HybridSignature(HybridSignatureId::new(curve, scheme)),
    }
}

const fn ecdsa(
    name: &'static str,
    code: u16,
    curve: ClassicalCurve,
    level: SecurityLevel,
) -> AlgorithmDescriptor {
    AlgorithmDescriptor {
        name,
        kind: AlgorithmKind::Signature,
        security_level: level,
        is_hybrid: false,
        code,
        id: AlgorithmId::Classical(curve),
    }
}

const KEY_EXCHANGES: &[AlgorithmDescriptor] = &[
    kex("P256", 0x0017, L1, KeyExchangeId::Ecdh(P256)),
    kex("P384", 0x0018, L3, KeyExchangeId::Ecdh(P384)),
    kex("P521", 0x0019, L5, KeyExchangeId::Ecdh(P521)),
    kex("Kyber512", 0x023a, L1, KeyExchangeId::Kem(Kyber512)),
    kex("P256_Kyber512", 0x2f3a, L1, KeyExchangeId::Hybrid(P256, Kyber512)),
    kex("Kyber768", 0x023c, L3, KeyExchangeId::Kem(Kyber768)),
    kex("P384_Kyber768", 0x2f3c, L3, KeyExchangeId::Hybrid(P384, Kyber768)),
    kex("Kyber1024", 0x023d, L5, KeyExchangeId::Kem(Kyber1024)),
    kex("P521_Kyber1024", 0x2f3d, L5, KeyExchangeId::Hybrid(P521, Kyber1024)),
    kex("LightSaber_KEM", 0x0241, L1, KeyExchangeId::Kem(LightSaber)),
    kex("P256_LightSaber_KEM", 0x2f41, L1, KeyExchangeId::Hybrid(P256, LightSaber)),
    kex("Saber_KEM", 0x0242, L3, KeyExchangeId::Kem(Saber)),
    kex("P384_Saber_KEM", 0x2f42, L3, KeyExchangeId::Hybrid(P384, Saber)),
    kex("FireSaber_KEM", 0x0243, L5, KeyExchangeId::Kem(FireSaber)),
    kex("P521_FireSaber_KEM", 0x2f43, L5, KeyExchangeId::Hybrid(P521, FireSaber)),
    kex("NTRU_HPS_2048_509", 0x0250, L1, KeyExchangeId::Kem(NtruHps2048509)),
    kex("P256_NTRU_HPS_2048_509", 0x2f50, L1, KeyExchangeId::Hybrid(P256, NtruHps2048509)),
    kex("NTRU_HPS_2048_677", 0x0251, L3, KeyExchangeId::Kem(NtruHps2048677)),
    kex("P384_NTRU_HPS_2048_677", 0x2f51, L3, KeyExchangeId::Hybrid(P384, NtruHps2048677)),
    kex("NTRU_HPS_4096_821", 0x0252, L5, KeyExchangeId::Kem(NtruHps4096821)),
    kex("P521_NTRU_HPS_4096_821", 0x2f52, L5, KeyExchangeId::Hybrid(P521, NtruHps4096821)),
    kex("NTRU_HPS_4096_1229", 0x0253, L5, KeyExchangeId::Kem(NtruHps40961229)),
    kex("P521_NTRU_HPS_4096_1229", 0x2f53, L5, KeyExchangeId::Hybrid(P521, NtruHps40961229)),
    kex("NTRU_HRSS_701", 0x0254, L3, KeyExchangeId::Kem(NtruHrss701)),
    kex("P384_NTRU_HRSS_701", 0x2f54, L3, KeyExchangeId::Hybrid(P384, NtruHrss701)),
    kex("NTRU_HRSS_1373", 0x0255, L5, KeyExchangeId::Kem(NtruHrss1373)),
    kex("P521_NTRU_HRSS_1373", 0x2f55, L5, KeyExchangeId::Hybrid(P521, NtruHrss1373)),
];

const HYBRID_SIGNATURES: &[AlgorithmDescriptor] = &[
    hybrid_sig("P256_Dilithium2", 0xfe01, P256, Dilithium2),
    hybrid_sig("P256_Falcon512", 0xfe02, P256, Falcon512),
    hybrid_sig("P384_Dilithium3", 0xfe03, P384, Dilithium3),
    hybrid_sig("P521_Dilithium5", 0xfe04, P521, Dilithium5),
    hybrid_sig("P521_Falcon1024", 0xfe05, P521, Falcon1024),
];

const CLASSICAL_SIGNATURES: &[AlgorithmDescriptor] = &[
    ecdsa("P256", 0x0403, P256, L1),
    ecdsa("P384", 0x0503, P384, L3),
    ecdsa("P521", 0x0603, P521, L5),
];

/// Post-quantum names without a curve prefix, bucketed by level
const PQ_LEVELS: &[(&str, SecurityLevel)] = &[
    ("Kyber512", L1),
    ("LightSaber_KEM", L1),
    ("NTRU_HPS_2048_509", L1),
    ("Kyber768", L3),
    ("Saber_KEM", L3),
    ("NTRU_HPS_2048_677", L3),
    ("NTRU_HRSS_701", L3),
    ("Kyber1024", L5),
    ("FireSaber_KEM", L5),
    ("NTRU_HPS_4096_821", L5),
    ("NTRU_HPS_4096_1229", L5),
    ("NTRU_HRSS_1373", L5),
];

/// Static name lookups over the algorithm tables
pub struct AlgorithmCatalog;

impl AlgorithmCatalog {
    /// Resolve a key-exchange name (classical, pure PQ, or hybrid)
    pub fn resolve_key_exchange(name: &str) -> Result<AlgorithmDescriptor> {
        KEY_EXCHANGES
            .iter()
            .find(|d| d.name == name)
            .copied()
            .ok_or_else(|| CoreError::UnknownKeyExchange(name.to_string()))
    }

    /// Resolve a hybrid signature name
    pub fn resolve_signature(name: &str) -> Result<AlgorithmDescriptor> {
        HYBRID_SIGNATURES
            .iter()
            .find(|d| d.name == name)
            .copied()
            .ok_or_else(|| CoreError::UnknownSignature(name.to_string()))
    }

    /// Resolve a plain ECDSA authentication name (`P256`, `P384`, `P521`)
    pub fn resolve_classical(name: &str) -> Result<AlgorithmDescriptor> {
        CLASSICAL_SIGNATURES
            .iter()
            .find(|d| d.name == name)
            .copied()
            .ok_or_else(|| CoreError::UnknownSignature(name.to_string()))
    }

    /// Reverse lookup of a hybrid signature wire code
    pub fn signature_by_code(code: u16) -> Result<AlgorithmDescriptor> {
        HYBRID_SIGNATURES
            .iter()
            .find(|d| d.code == code)
            .copied()
            .ok_or_else(|| CoreError::UnknownSignature(format!("0x{:04x}", code)))
    }

    /// Reverse lookup of a key-exchange wire code
    pub fn key_exchange_by_code(code: u16) -> Result<AlgorithmDescriptor> {
        KEY_EXCHANGES
            .iter()
            .find(|d| d.code == code)
            .copied()
            .ok_or_else(|| CoreError::UnknownKeyExchange(format!("0x{:04x}", code)))
    }

    /// Classify a name into a NIST level.
    ///
    /// Curve substrings win (`P256` -> 1, `P384` -> 3, `P521` -> 5); names
    /// without one must be a known pure post-quantum name.
    pub fn security_level_of(name: &str) -> Result<SecurityLevel> {
        for curve in ClassicalCurve::ALL {
            if name.contains(curve.name()) {
                return Ok(curve.security_level());
            }
        }
        PQ_LEVELS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, level)| *level)
            .ok_or_else(|| CoreError::UnknownSecurityLevel(name.to_string()))
    }

    pub fn key_exchanges() -> &'static [AlgorithmDescriptor] {
        KEY_EXCHANGES
    }

    pub fn hybrid_signatures() -> &'static [AlgorithmDescriptor] {
        HYBRID_SIGNATURES
    }

    pub fn classical_signatures() -> &'static [AlgorithmDescriptor] {
        CLASSICAL_SIGNATURES
    }

    /// KEX names benchmarked by default in post-quantum modes
    pub fn default_pq_kex_names() -> Vec<&'static str> {
        KEY_EXCHANGES
            .iter()
            .filter(|d| !matches!(d.id, AlgorithmId::KeyExchange(KeyExchangeId::Ecdh(_))))
            .map(|d| d.name)
            .collect()
    }

    /// Authentication names benchmarked by default in post-quantum modes
    pub fn default_pq_auth_names() -> Vec<&'static str> {
        HYBRID_SIGNATURES.iter().map(|d| d.name).collect()
    }

    /// Names used for both KEX and Auth in classical mode
    pub fn default_classical_names() -> Vec<&'static str> {
        CLASSICAL_SIGNATURES.iter().map(|d| d.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_key_exchange() {
        let desc = AlgorithmCatalog::resolve_key_exchange("P384_Kyber768").unwrap();
        assert_eq!(desc.kind, AlgorithmKind::KeyExchange);
        assert_eq!(desc.security_level, SecurityLevel::L3);
        assert!(desc.is_hybrid);
        assert_eq!(
            desc.id,
            AlgorithmId::KeyExchange(KeyExchangeId::Hybrid(
                ClassicalCurve::P384,
                KemScheme::Kyber768
            ))
        );

        let pure = AlgorithmCatalog::resolve_key_exchange("Kyber512").unwrap();
        assert!(!pure.is_hybrid);
    }

    #[test]
    fn test_resolve_unknown() {
        assert_eq!(
            AlgorithmCatalog::resolve_key_exchange("X25519"),
            Err(CoreError::UnknownKeyExchange("X25519".to_string()))
        );
        assert!(AlgorithmCatalog::resolve_signature("P256_Kyber512").is_err());
    }

    #[test]
    fn test_security_level_curve_substring_wins() {
        let level = |name| AlgorithmCatalog::security_level_of(name).unwrap();
        assert_eq!(level("P256_Falcon512"), SecurityLevel::L1);
        assert_eq!(level("P521_NTRU_HRSS_1373"), SecurityLevel::L5);
        // Unknown post-quantum half is irrelevant once a curve matches
        assert_eq!(level("P384_Anything"), SecurityLevel::L3);
    }

    #[test]
    fn test_security_level_pq_fallback() {
        let level = |name| AlgorithmCatalog::security_level_of(name).unwrap();
        assert_eq!(level("LightSaber_KEM"), SecurityLevel::L1);
        assert_eq!(level("NTRU_HRSS_701"), SecurityLevel::L3);
        assert_eq!(level("Kyber1024"), SecurityLevel::L5);
    }

    #[test]
    fn test_security_level_unknown_is_error() {
        assert_eq!(
            AlgorithmCatalog::security_level_of("Dilithium2"),
            Err(CoreError::UnknownSecurityLevel("Dilithium2".to_string()))
        );
    }

    #[test]
    fn test_catalog_levels_match_classifier() {
        let all = AlgorithmCatalog::key_exchanges()
            .iter()
            .chain(AlgorithmCatalog::hybrid_signatures())
            .chain(AlgorithmCatalog::classical_signatures());
        for desc in all {
            assert_eq!(
                AlgorithmCatalog::security_level_of(desc.name).unwrap(),
                desc.security_level,
                "{}",
                desc.name
            );
            assert_eq!(desc.id.name(), desc.name);
        }
    }

    #[test]
    fn test_signature_codes_unique() {
        for desc in AlgorithmCatalog::hybrid_signatures() {
            let back = AlgorithmCatalog::signature_by_code(desc.code).unwrap();
            assert_eq!(back.name, desc.name);
        }
    }

    #[test]
    fn test_default_lists() {
        let kex = AlgorithmCatalog::default_pq_kex_names();
        assert_eq!(kex.len(), 24);
        assert!(!kex.contains(&"P256"));
        assert_eq!(AlgorithmCatalog::default_pq_auth_names().len(), 5);
        assert_eq!(AlgorithmCatalog::default_classical_names(), vec!["P256", "P384", "P521"]);
    }

    #[test]
    fn test_security_level_serde() {
        let json = serde_json::to_string(&SecurityLevel::L3).unwrap();
        assert_eq!(json, "3");
        let back: SecurityLevel = serde_json::from_str("5").unwrap();
        assert_eq!(back, SecurityLevel::L5);
        assert!(serde_json::from_str::<SecurityLevel>("2").is_err());
    }
}
