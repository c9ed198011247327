//! Credential factory
//!
//! Issues one certificate at a time (CA or leaf, self-signed or signed by a
//! parent) for any [`AlgorithmId`]. Key generation dispatches on the
//! identifier variant; signing uses whichever key the [`Issuer`] names.

use crate::certificate::{Certificate, ExtKeyUsage};
use crate::error::{PkiError, Result};
use crate::oids;
use const_oid::AssociatedOid;
use der::asn1::{BitString, Ia5String, OctetString, UtcTime};
use der::flagset::FlagSet;
use der::{DateTime, Decode, Encode};
use pqbench_core::AlgorithmId;
use pqbench_crypto::{generate_key, PrivateKey};
use rand::RngCore;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use tracing::debug;
use x509_cert::certificate::{TbsCertificate, Version};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages, SubjectAltName};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::{Time, Validity};

const CA_VALIDITY: Duration = Duration::from_secs(365 * 24 * 60 * 60);
const LEAF_VALIDITY: Duration = Duration::from_secs(10 * 24 * 60 * 60);

pub const ROOT_CA_NAME: &str = "Root CA";
pub const INTERMEDIATE_CA_NAME: &str = "Intermediate CA";

/// Who signs the certificate being issued
#[derive(Clone, Copy)]
pub enum Issuer<'a> {
    /// Signed by the subject's own freshly generated key
    SelfSigned,
    /// Signed by a parent CA
    Signed {
        certificate: &'a Certificate,
        key: &'a PrivateKey,
    },
}

/// Parameters for one certificate
#[derive(Clone)]
pub struct IssueRequest<'a> {
    pub algorithm: AlgorithmId,
    pub issuer: Issuer<'a>,
    pub is_ca: bool,
    /// Subject common name for leaf certificates (e.g. "server")
    pub role: &'a str,
    pub key_usage: FlagSet<KeyUsages>,
    pub ext_key_usage: &'a [ExtKeyUsage],
    /// Comma-separated IP literals and DNS names
    pub hosts: &'a str,
}

/// Certificate plus the subject's private key
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub certificate: Certificate,
    pub private_key: PrivateKey,
}

/// Stateless certificate issuer
pub struct CredentialFactory;

impl CredentialFactory {
    /// Generate a key for `request.algorithm` and issue its certificate
    pub fn issue(request: &IssueRequest<'_>) -> Result<IssuedCredential> {
        let private_key = generate_key(request.algorithm);

        let (signer, issuer_name) = match request.issuer {
            Issuer::SelfSigned => {
                if !private_key.algorithm().can_sign() {
                    return Err(PkiError::KeyCannotSign(request.algorithm.name()));
                }
                (&private_key, None)
            }
            Issuer::Signed { certificate, key } => {
                if !certificate.is_ca() {
                    return Err(PkiError::verification(format!(
                        "'{}' is not a CA and cannot issue certificates",
                        certificate.common_name()
                    )));
                }
                let parent = x509_cert::Certificate::from_der(certificate.der())?;
                (key, Some(parent.tbs_certificate.subject))
            }
        };

        let common_name = match (request.is_ca, request.issuer) {
            (true, Issuer::SelfSigned) => ROOT_CA_NAME,
            (true, Issuer::Signed { .. }) => INTERMEDIATE_CA_NAME,
            (false, _) => request.role,
        };
        let subject = Name::from_str(&format!("CN={}", common_name))?;
        let issuer = issuer_name.unwrap_or_else(|| subject.clone());

        let mut key_usage = request.key_usage;
        if request.is_ca {
            key_usage |= KeyUsages::KeyCertSign;
        }

        let now = SystemTime::now();
        let lifetime = if request.is_ca { CA_VALIDITY } else { LEAF_VALIDITY };
        let validity = Validity {
            not_before: asn1_time(now)?,
            not_after: asn1_time(now + lifetime)?,
        };

        let signature_algorithm = oids::signature_algorithm(signer.algorithm())?;
        let tbs = TbsCertificate {
            version: Version::V3,
            serial_number: random_serial()?,
            signature: signature_algorithm.clone(),
            issuer,
            validity,
            subject: subject.clone(),
            subject_public_key_info: SubjectPublicKeyInfoOwned {
                algorithm: oids::public_key_algorithm(request.algorithm)?,
                subject_public_key: BitString::from_bytes(&private_key.public_key_bytes())?,
            },
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions(request, key_usage)?),
        };

        let tbs_der = tbs.to_der()?;
        let signature = signer.sign(&tbs_der)?;
        let certificate = x509_cert::Certificate {
            tbs_certificate: tbs,
            signature_algorithm,
            signature: BitString::from_bytes(&signature)?,
        };

        let certificate = Certificate::from_der(&certificate.to_der()?)?;
        debug!(
            cn = common_name,
            algorithm = %request.algorithm,
            serial = %certificate.serial_hex(),
            der_len = certificate.der().len(),
            "Issued certificate"
        );

        Ok(IssuedCredential {
            certificate,
            private_key,
        })
    }
}

fn asn1_time(at: SystemTime) -> Result<Time> {
    Ok(Time::UtcTime(UtcTime::from_date_time(DateTime::from_system_time(at)?)?))
}

/// Uniformly random 128-bit non-negative serial number
fn random_serial() -> Result<SerialNumber> {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    Ok(SerialNumber::new(&bytes)?)
}

/// Split a comma-separated host list into IP and DNS SAN entries
pub fn subject_alt_names(hosts: &str) -> Result<Vec<GeneralName>> {
    let mut names = Vec::new();
    for host in hosts.split(',').map(str::trim).filter(|h| !h.is_empty()) {
        let name = match host.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => GeneralName::IpAddress(OctetString::new(ip.octets().to_vec())?),
            Ok(IpAddr::V6(ip)) => GeneralName::IpAddress(OctetString::new(ip.octets().to_vec())?),
            Err(_) => GeneralName::DnsName(Ia5String::new(host)?),
        };
        names.push(name);
    }
    Ok(names)
}

fn extension<T: AssociatedOid + Encode>(value: &T, critical: bool) -> Result<Extension> {
    Ok(Extension {
        extn_id: T::OID,
        critical,
        extn_value: OctetString::new(value.to_der()?)?,
    })
}

fn extensions(request: &IssueRequest<'_>, key_usage: FlagSet<KeyUsages>) -> Result<Vec<Extension>> {
    let basic_constraints = BasicConstraints {
        ca: request.is_ca,
        path_len_constraint: None,
    };
    let mut exts = vec![
        extension(&basic_constraints, true)?,
        extension(&KeyUsage(key_usage), true)?,
    ];

    if !request.ext_key_usage.is_empty() {
        let eku = ExtendedKeyUsage(request.ext_key_usage.iter().map(|u| u.oid()).collect());
        exts.push(extension(&eku, false)?);
    }

    let sans = subject_alt_names(request.hosts)?;
    if !sans.is_empty() {
        exts.push(extension(&SubjectAltName(sans), false)?);
    }

    Ok(exts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pqbench_core::AlgorithmCatalog;
    use std::net::Ipv4Addr;

    fn self_signed_root(name: &str) -> IssuedCredential {
        let algorithm = AlgorithmCatalog::resolve_signature(name).unwrap().id;
        CredentialFactory::issue(&IssueRequest {
            algorithm,
            issuer: Issuer::SelfSigned,
            is_ca: true,
            role: "ignored",
            key_usage: KeyUsages::DigitalSignature.into(),
            ext_key_usage: &[],
            hosts: "127.0.0.1",
        })
        .unwrap()
    }

    #[test]
    fn test_self_signed_root() {
        let root = self_signed_root("P256_Dilithium2");
        let cert = &root.certificate;

        assert!(cert.is_ca());
        assert!(cert.is_self_issued());
        assert_eq!(cert.common_name(), ROOT_CA_NAME);
        // CA flag forces cert-sign on top of the requested usage
        assert!(cert.key_usage().contains(KeyUsages::KeyCertSign));
        assert!(cert.key_usage().contains(KeyUsages::DigitalSignature));
        assert_eq!(cert.public_key(), root.private_key.public_key_bytes().as_slice());
        cert.verify_issued_by(cert).unwrap();
    }

    #[test]
    fn test_validity_windows() {
        let root = self_signed_root("P256_Falcon512");
        let ca_days = (root.certificate.not_after() - root.certificate.not_before()).num_days();
        assert_eq!(ca_days, 365);

        let leaf = CredentialFactory::issue(&IssueRequest {
            algorithm: AlgorithmCatalog::resolve_key_exchange("Kyber512").unwrap().id,
            issuer: Issuer::Signed {
                certificate: &root.certificate,
                key: &root.private_key,
            },
            is_ca: false,
            role: "server",
            key_usage: KeyUsages::KeyAgreement.into(),
            ext_key_usage: &[ExtKeyUsage::ServerAuth],
            hosts: "127.0.0.1,localhost",
        })
        .unwrap();

        let cert = &leaf.certificate;
        assert_eq!((cert.not_after() - cert.not_before()).num_days(), 10);
        assert!(!cert.is_ca());
        assert_eq!(cert.common_name(), "server");
        assert_eq!(cert.key_usage(), FlagSet::from(KeyUsages::KeyAgreement));
        assert_eq!(cert.ext_key_usage(), &[ExtKeyUsage::ServerAuth]);
        assert_eq!(cert.ip_addresses(), &[IpAddr::V4(Ipv4Addr::LOCALHOST)]);
        assert_eq!(cert.dns_names(), &["localhost".to_string()]);
        cert.verify_issued_by(&root.certificate).unwrap();
    }

    #[test]
    fn test_serials_are_random_and_bounded() {
        let a = self_signed_root("P256_Dilithium2").certificate;
        let b = self_signed_root("P256_Dilithium2").certificate;
        assert_ne!(a.serial(), b.serial());
        // 16 random octets, plus a zero octet when the top bit is set
        assert!(a.serial().len() <= 17);
        assert!(a.serial_hex().len() <= 32);
    }

    #[test]
    fn test_kem_key_cannot_self_sign() {
        let result = CredentialFactory::issue(&IssueRequest {
            algorithm: AlgorithmCatalog::resolve_key_exchange("P256_Kyber512").unwrap().id,
            issuer: Issuer::SelfSigned,
            is_ca: true,
            role: "root",
            key_usage: FlagSet::default(),
            ext_key_usage: &[],
            hosts: "",
        });
        assert!(matches!(result, Err(PkiError::KeyCannotSign(_))));
    }

    #[test]
    fn test_leaf_cannot_issue() {
        let root = self_signed_root("P256_Dilithium2");
        let leaf = CredentialFactory::issue(&IssueRequest {
            algorithm: AlgorithmCatalog::resolve_signature("P256_Dilithium2").unwrap().id,
            issuer: Issuer::Signed {
                certificate: &root.certificate,
                key: &root.private_key,
            },
            is_ca: false,
            role: "server",
            key_usage: KeyUsages::DigitalSignature.into(),
            ext_key_usage: &[],
            hosts: "127.0.0.1",
        })
        .unwrap();

        let result = CredentialFactory::issue(&IssueRequest {
            algorithm: AlgorithmCatalog::resolve_signature("P256_Dilithium2").unwrap().id,
            issuer: Issuer::Signed {
                certificate: &leaf.certificate,
                key: &leaf.private_key,
            },
            is_ca: false,
            role: "server",
            key_usage: KeyUsages::DigitalSignature.into(),
            ext_key_usage: &[],
            hosts: "127.0.0.1",
        });
        assert!(matches!(result, Err(PkiError::Verification(_))));
    }

    #[test]
    fn test_subject_alt_name_split() {
        let names = subject_alt_names("10.0.0.1, example.org,,::1").unwrap();
        assert_eq!(names.len(), 3);
        assert!(matches!(names[0], GeneralName::IpAddress(_)));
        assert!(matches!(names[1], GeneralName::DnsName(_)));
        assert!(matches!(names[2], GeneralName::IpAddress(_)));
    }
}
