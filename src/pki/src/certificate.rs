//! Parsed X.509 certificates
//!
//! A [`Certificate`] is an immutable value: the DER bytes plus the fields the
//! harness inspects. Extensions and validity are read with `x509-parser`;
//! algorithm identifiers are decoded with `x509-cert` so they can be compared
//! with the identifiers used at issuance.

use crate::error::{PkiError, Result};
use crate::oids;
use chrono::{DateTime, Utc};
use const_oid::ObjectIdentifier;
use der::flagset::FlagSet;
use der::Decode;
use pqbench_core::AlgorithmId;
use pqbench_crypto::verify_signature;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_cert::ext::pkix::KeyUsages;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

/// Extended key usage purposes issued by this harness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtKeyUsage {
    ServerAuth,
    ClientAuth,
}

impl ExtKeyUsage {
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            ExtKeyUsage::ServerAuth => oids::ID_KP_SERVER_AUTH,
            ExtKeyUsage::ClientAuth => oids::ID_KP_CLIENT_AUTH,
        }
    }
}

/// DER certificate with its parsed fields
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    serial: Vec<u8>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    common_name: String,
    key_usage: FlagSet<KeyUsages>,
    ext_key_usage: Vec<ExtKeyUsage>,
    dns_names: Vec<String>,
    ip_addresses: Vec<IpAddr>,
    is_ca: bool,
    public_key_algorithm: AlgorithmId,
    public_key: Vec<u8>,
    signature_algorithm: ObjectIdentifier,
    signature: Vec<u8>,
    tbs: Vec<u8>,
    subject_raw: Vec<u8>,
    issuer_raw: Vec<u8>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("common_name", &self.common_name)
            .field("serial", &self.serial_hex())
            .field("algorithm", &self.public_key_algorithm)
            .field("is_ca", &self.is_ca)
            .field("der_len", &self.der.len())
            .finish()
    }
}

fn timestamp(time: &ASN1Time) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| PkiError::Parse(format!("validity time out of range: {}", time)))
}

fn ip_from_bytes(bytes: &[u8]) -> Result<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into()
                .map_err(|_| PkiError::Parse("bad IPv4 SAN".into()))?;
            Ok(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into()
                .map_err(|_| PkiError::Parse("bad IPv6 SAN".into()))?;
            Ok(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        n => Err(PkiError::Parse(format!("IP SAN of {} bytes", n))),
    }
}

impl Certificate {
    /// Parse a DER certificate
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, x509) = parse_x509_certificate(der).map_err(|e| PkiError::Parse(e.to_string()))?;
        let typed = x509_cert::Certificate::from_der(der)?;

        let parse_err = |e: X509Error| PkiError::Parse(e.to_string());

        let common_name = x509
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or_default()
            .to_string();

        let is_ca = x509
            .basic_constraints()
            .map_err(parse_err)?
            .map(|bc| bc.value.ca)
            .unwrap_or(false);

        let mut key_usage = FlagSet::<KeyUsages>::default();
        if let Some(ku) = x509.key_usage().map_err(parse_err)? {
            if ku.value.digital_signature() {
                key_usage |= KeyUsages::DigitalSignature;
            }
            if ku.value.key_encipherment() {
                key_usage |= KeyUsages::KeyEncipherment;
            }
            if ku.value.key_agreement() {
                key_usage |= KeyUsages::KeyAgreement;
            }
            if ku.value.key_cert_sign() {
                key_usage |= KeyUsages::KeyCertSign;
            }
        }

        let mut ext_key_usage = Vec::new();
        if let Some(eku) = x509.extended_key_usage().map_err(parse_err)? {
            if eku.value.server_auth {
                ext_key_usage.push(ExtKeyUsage::ServerAuth);
            }
            if eku.value.client_auth {
                ext_key_usage.push(ExtKeyUsage::ClientAuth);
            }
        }

        let mut dns_names = Vec::new();
        let mut ip_addresses = Vec::new();
        if let Some(san) = x509.subject_alternative_name().map_err(parse_err)? {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                    GeneralName::IPAddress(bytes) => ip_addresses.push(ip_from_bytes(bytes)?),
                    _ => {}
                }
            }
        }

        let spki = &typed.tbs_certificate.subject_public_key_info;
        let public_key_algorithm = oids::algorithm_from_spki(&spki.algorithm)?;
        let public_key = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| PkiError::Parse("public key bit string is not octet aligned".into()))?
            .to_vec();
        let signature = typed
            .signature
            .as_bytes()
            .ok_or_else(|| PkiError::Parse("signature bit string is not octet aligned".into()))?
            .to_vec();

        Ok(Self {
            der: der.to_vec(),
            serial: x509.tbs_certificate.raw_serial().to_vec(),
            not_before: timestamp(&x509.validity().not_before)?,
            not_after: timestamp(&x509.validity().not_after)?,
            common_name,
            key_usage,
            ext_key_usage,
            dns_names,
            ip_addresses,
            is_ca,
            public_key_algorithm,
            public_key,
            signature_algorithm: typed.signature_algorithm.oid,
            signature,
            tbs: x509.tbs_certificate.as_ref().to_vec(),
            subject_raw: x509.subject().as_raw().to_vec(),
            issuer_raw: x509.issuer().as_raw().to_vec(),
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Serial number content octets (big-endian, may carry a leading zero)
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    pub fn serial_hex(&self) -> String {
        let trimmed: Vec<u8> = self.serial.iter().copied().skip_while(|b| *b == 0).collect();
        hex::encode(trimmed)
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    pub fn key_usage(&self) -> FlagSet<KeyUsages> {
        self.key_usage
    }

    pub fn ext_key_usage(&self) -> &[ExtKeyUsage] {
        &self.ext_key_usage
    }

    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    pub fn ip_addresses(&self) -> &[IpAddr] {
        &self.ip_addresses
    }

    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    pub fn public_key_algorithm(&self) -> AlgorithmId {
        self.public_key_algorithm
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// Check that `issuer` signed this certificate.
    ///
    /// Requires the issuer's subject to equal this certificate's issuer name
    /// and the signature algorithm to match the issuer's key type.
    pub fn verify_issued_by(&self, issuer: &Certificate) -> Result<()> {
        if self.issuer_raw != issuer.subject_raw {
            return Err(PkiError::verification(format!(
                "issuer of '{}' is not '{}'",
                self.common_name, issuer.common_name
            )));
        }

        let expected = oids::signature_algorithm(issuer.public_key_algorithm)?;
        if expected.oid != self.signature_algorithm {
            return Err(PkiError::verification(format!(
                "'{}' signed with {}, issuer key is {}",
                self.common_name, self.signature_algorithm, issuer.public_key_algorithm
            )));
        }

        verify_signature(
            issuer.public_key_algorithm,
            &issuer.public_key,
            &self.tbs,
            &self.signature,
        )
        .map_err(|e| PkiError::verification(format!("'{}': {}", self.common_name, e)))
    }
}
