//! Persisted hybrid root CAs
//!
//! A root record is eight newline-separated fields, positional and unnamed:
//!
//! ```text
//! 1  signature algorithm code (hex, no padding)
//! 2  classical curve name (plain text)
//! 3  DER-encoded named-curve OID (hex)
//! 4  SEC1 ECPrivateKey DER (hex)
//! 5  post-quantum private key (hex)
//! 6  uncompressed classical public point (hex)
//! 7  post-quantum public key (hex)
//! 8  certificate DER (hex)
//! ```
//!
//! Records are written once by the generation step and only read during a
//! benchmark. Lines are read into a growable buffer with an explicit upper
//! bound, so oversized records fail with [`PkiError::RecordTooLarge`].

use crate::certificate::Certificate;
use crate::error::{PkiError, Result};
use crate::factory::{CredentialFactory, IssueRequest, Issuer};
use crate::oids;
use der::flagset::FlagSet;
use pqbench_core::{
    AlgorithmCatalog, AlgorithmId, ClassicalCurve, CoreError, RootFamily, SecurityLevel,
};
use pqbench_crypto::{EcKeyPair, HybridKeyPair};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use x509_cert::ext::pkix::KeyUsages;

/// Number of lines in a root record
pub const FIELD_COUNT: usize = 8;

/// Default cap on a single record line
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Host placed in generated roots' SANs
pub const ROOT_HOSTS: &str = "127.0.0.1";

/// In-memory form of one root record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRecord {
    pub signature_code: u16,
    pub curve: ClassicalCurve,
    pub curve_oid: Vec<u8>,
    pub classical_private: Vec<u8>,
    pub pq_private: Vec<u8>,
    pub classical_public: Vec<u8>,
    pub pq_public: Vec<u8>,
    pub certificate: Vec<u8>,
}

impl RootRecord {
    /// Capture a root certificate and its hybrid key
    pub fn from_credential(certificate: &Certificate, key: &HybridKeyPair) -> Result<Self> {
        let id = key.id();
        if certificate.public_key_algorithm() != AlgorithmId::HybridSignature(id) {
            return Err(PkiError::MalformedRecord(format!(
                "certificate key is {}, private key is {}",
                certificate.public_key_algorithm(),
                id
            )));
        }
        let descriptor = AlgorithmCatalog::resolve_signature(&id.name())?;

        Ok(Self {
            signature_code: descriptor.code,
            curve: id.curve,
            curve_oid: oids::curve_oid_der(id.curve)?,
            classical_private: key.classical().to_sec1_der()?,
            pq_private: key.pq_secret().to_vec(),
            classical_public: key.classical().public_point(),
            pq_public: key.pq_public().to_vec(),
            certificate: certificate.der().to_vec(),
        })
    }

    /// Rebuild the certificate and key, checking that every field agrees
    pub fn into_credential(self) -> Result<(Certificate, HybridKeyPair)> {
        let id = match AlgorithmCatalog::signature_by_code(self.signature_code)?.id {
            AlgorithmId::HybridSignature(id) => id,
            other => {
                return Err(PkiError::MalformedRecord(format!(
                    "{} is not a hybrid signature",
                    other
                )))
            }
        };
        if id.curve != self.curve {
            return Err(PkiError::MalformedRecord(format!(
                "{} stored with curve {}",
                id, self.curve
            )));
        }
        if self.curve_oid != oids::curve_oid_der(self.curve)? {
            return Err(PkiError::MalformedRecord(format!(
                "curve OID {} does not name {}",
                hex::encode(&self.curve_oid),
                self.curve
            )));
        }

        let classical = EcKeyPair::from_sec1_der(self.curve, &self.classical_private)?;
        if classical.public_point() != self.classical_public {
            return Err(PkiError::MalformedRecord(
                "classical public point does not match the private key".into(),
            ));
        }
        let key = HybridKeyPair::from_parts(id, classical, self.pq_private, self.pq_public)?;

        let certificate = Certificate::from_der(&self.certificate)?;
        if certificate.public_key() != key.public_key_bytes().as_slice() {
            return Err(PkiError::MalformedRecord(
                "certificate public key does not match the stored key".into(),
            ));
        }

        Ok((certificate, key))
    }

    /// Write the record, one field per line
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{:x}", self.signature_code)?;
        writeln!(writer, "{}", self.curve.name())?;
        for field in [
            &self.curve_oid,
            &self.classical_private,
            &self.pq_private,
            &self.classical_public,
            &self.pq_public,
            &self.certificate,
        ] {
            writeln!(writer, "{}", hex::encode(field))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a record, rejecting any line longer than `max_line_bytes`
    pub fn read_from<R: BufRead>(mut reader: R, max_line_bytes: usize) -> Result<Self> {
        let mut lines: Vec<Vec<u8>> = Vec::with_capacity(FIELD_COUNT);
        loop {
            // Room for the content, a CRLF terminator and nothing more
            let mut line = Vec::new();
            let read = (&mut reader)
                .take(max_line_bytes as u64 + 2)
                .read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            if line.last() == Some(&b'\n') {
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
            }
            if line.len() > max_line_bytes {
                return Err(PkiError::RecordTooLarge {
                    line: lines.len() + 1,
                    limit: max_line_bytes,
                });
            }
            lines.push(line);
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        if lines.len() != FIELD_COUNT {
            return Err(PkiError::FieldCount {
                expected: FIELD_COUNT,
                found: lines.len(),
            });
        }

        let text = |index: usize| -> Result<&str> {
            std::str::from_utf8(&lines[index])
                .map(str::trim)
                .map_err(|_| PkiError::MalformedRecord(format!("line {} is not UTF-8", index + 1)))
        };
        let bytes = |index: usize| -> Result<Vec<u8>> {
            hex::decode(text(index)?).map_err(|source| PkiError::InvalidHex {
                line: index + 1,
                source,
            })
        };

        let code = text(0)?;
        let signature_code = u16::from_str_radix(code, 16)
            .map_err(|e| PkiError::MalformedRecord(format!("signature code '{}': {}", code, e)))?;
        let curve_name = text(1)?;
        let curve = ClassicalCurve::from_name(curve_name)
            .ok_or_else(|| PkiError::MalformedRecord(format!("unknown curve '{}'", curve_name)))?;

        Ok(Self {
            signature_code,
            curve,
            curve_oid: bytes(2)?,
            classical_private: bytes(3)?,
            pq_private: bytes(4)?,
            classical_public: bytes(5)?,
            pq_public: bytes(6)?,
            certificate: bytes(7)?,
        })
    }
}

/// Directory of root records addressed by algorithm name
#[derive(Debug, Clone)]
pub struct RootStore {
    dir: PathBuf,
    max_line_bytes: usize,
}

impl RootStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/hybrid_root_ca_<name>.txt`
    pub fn path_for(&self, algorithm_name: &str) -> PathBuf {
        self.dir.join(format!("hybrid_root_ca_{}.txt", algorithm_name))
    }

    pub fn path_for_level(&self, family: RootFamily, level: SecurityLevel) -> Result<PathBuf> {
        Ok(self.path_for(family.representative(level)?))
    }

    /// Persist a root under the family's file for `level`, replacing any
    /// existing record
    pub fn save(
        &self,
        certificate: &Certificate,
        key: &HybridKeyPair,
        family: RootFamily,
        level: SecurityLevel,
    ) -> Result<PathBuf> {
        let expected = family.representative(level)?;
        if key.id().name() != expected {
            return Err(CoreError::configuration(format!(
                "{} root at level {} must be {}, got {}",
                family,
                level,
                expected,
                key.id()
            ))
            .into());
        }
        self.save_named(certificate, key)
    }

    /// Persist a root under its own algorithm name
    pub fn save_named(&self, certificate: &Certificate, key: &HybridKeyPair) -> Result<PathBuf> {
        let record = RootRecord::from_credential(certificate, key)?;
        let path = self.path_for(&key.id().name());

        fs::create_dir_all(&self.dir)?;
        let file = File::create(&path)?;
        record.write_to(BufWriter::new(file))?;

        info!(
            path = %path.display(),
            algorithm = %key.id(),
            serial = %certificate.serial_hex(),
            "Saved root CA record"
        );
        Ok(path)
    }

    /// Load the family's root for `level`
    pub fn load(
        &self,
        family: RootFamily,
        level: SecurityLevel,
    ) -> Result<(Certificate, HybridKeyPair)> {
        let path = self.path_for_level(family, level)?;
        self.load_path(&path)
    }

    pub fn load_named(&self, algorithm_name: &str) -> Result<(Certificate, HybridKeyPair)> {
        self.load_path(&self.path_for(algorithm_name))
    }

    fn load_path(&self, path: &Path) -> Result<(Certificate, HybridKeyPair)> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PkiError::RootNotFound {
                path: path.to_path_buf(),
            },
            _ => PkiError::Io(e),
        })?;

        let record = RootRecord::read_from(BufReader::new(file), self.max_line_bytes)?;
        let (certificate, key) = record.into_credential()?;

        info!(
            path = %path.display(),
            algorithm = %key.id(),
            serial = %certificate.serial_hex(),
            "Loaded root CA record"
        );
        Ok((certificate, key))
    }

    /// Issue a fresh self-signed root for a hybrid signature algorithm and
    /// persist it under that algorithm's name
    pub fn generate(&self, algorithm_name: &str) -> Result<(PathBuf, Certificate, HybridKeyPair)> {
        let algorithm = AlgorithmCatalog::resolve_signature(algorithm_name)?.id;
        let issued = CredentialFactory::issue(&IssueRequest {
            algorithm,
            issuer: Issuer::SelfSigned,
            is_ca: true,
            role: "root",
            key_usage: FlagSet::from(KeyUsages::KeyCertSign),
            ext_key_usage: &[],
            hosts: ROOT_HOSTS,
        })?;

        let key = issued
            .private_key
            .as_hybrid()
            .cloned()
            .ok_or_else(|| {
                PkiError::UnsupportedAlgorithm(format!("{} is not a hybrid signature", algorithm))
            })?;
        debug!(algorithm = algorithm_name, "Generated root CA key");

        let path = self.save_named(&issued.certificate, &key)?;
        Ok((path, issued.certificate, key))
    }
}
