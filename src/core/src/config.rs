//! Benchmark configuration
//!
//! A single immutable [`BenchmarkConfig`] is built once at startup and
//! passed by reference (or `Arc`) to every component. Nothing reads mode
//! toggles from ambient state.

use crate::algorithms::{AlgorithmCatalog, SecurityLevel};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Handshake flavour under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeMode {
    /// KEM-authenticated TLS
    Kemtls,
    /// Signature-authenticated TLS with hybrid post-quantum signatures
    Pqtls,
    /// Plain ECDHE/ECDSA TLS
    Classic,
}

impl HandshakeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HandshakeMode::Kemtls => "kemtls",
            HandshakeMode::Pqtls => "pqtls",
            HandshakeMode::Classic => "classic",
        }
    }
}

impl fmt::Display for HandshakeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandshakeMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "kemtls" => Ok(HandshakeMode::Kemtls),
            "pqtls" => Ok(HandshakeMode::Pqtls),
            "classic" | "classical" => Ok(HandshakeMode::Classic),
            other => Err(CoreError::configuration(format!("unknown handshake mode '{}'", other))),
        }
    }
}

/// Algorithm family of a pre-generated hybrid root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootFamily {
    Dilithium,
    Falcon,
}

impl RootFamily {
    /// Representative algorithm per level, indexed by `level - 1`.
    /// Levels 2 and 4 are unused.
    fn table(self) -> [Option<&'static str>; 5] {
        match self {
            RootFamily::Dilithium => [
                Some("P256_Dilithium2"),
                None,
                Some("P384_Dilithium3"),
                None,
                Some("P521_Dilithium5"),
            ],
            RootFamily::Falcon => [
                Some("P256_Falcon512"),
                None,
                Some("P256_Falcon512"),
                None,
                Some("P521_Falcon1024"),
            ],
        }
    }

    /// Hybrid signature name that represents this family at `level`
    pub fn representative(self, level: SecurityLevel) -> Result<&'static str> {
        self.table()[(level.as_u8() - 1) as usize].ok_or_else(|| CoreError::NoRootForLevel {
            family: self.to_string(),
            level: level.as_u8(),
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RootFamily::Dilithium => "dilithium",
            RootFamily::Falcon => "falcon",
        }
    }
}

impl fmt::Display for RootFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RootFamily {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dilithium" => Ok(RootFamily::Dilithium),
            "falcon" => Ok(RootFamily::Falcon),
            other => Err(CoreError::UnknownRootFamily(other.to_string())),
        }
    }
}

/// Where the chain's root CA comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RootSource {
    /// Fresh self-signed root for every chain
    Synthesized,
    /// Hybrid root record generated offline, looked up by family and level
    Persisted { family: RootFamily, dir: PathBuf },
    /// Classical ECDSA root from PEM files
    Pem { cert: PathBuf, key: PathBuf },
}

impl Default for RootSource {
    fn default() -> Self {
        RootSource::Synthesized
    }
}

/// Immutable settings for one benchmark run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default = "default_mode")]
    pub mode: HandshakeMode,

    /// Successful handshakes collected per algorithm pair
    #[serde(default = "default_handshakes")]
    pub handshakes: usize,

    #[serde(default)]
    pub client_auth: bool,

    /// Reuse a harvested server certificate message after one priming connection
    #[serde(default)]
    pub cached_certificate: bool,

    /// Comma-separated hosts for the server leaf's SANs and the dial target
    #[serde(default = "default_host")]
    pub server_host: String,

    /// Comma-separated hosts for the client leaf's SANs
    #[serde(default = "default_host")]
    pub client_host: String,

    /// Address the server fleet listens on
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,

    /// First port of the per-pair port range; 0 lets the OS choose
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    #[serde(default)]
    pub root: RootSource,

    /// Attempt budget per pair is `handshakes * max_attempts_factor`; 0 means unbounded
    #[serde(default = "default_max_attempts_factor")]
    pub max_attempts_factor: u32,

    /// Longest line accepted when reading a persisted root record
    #[serde(default = "default_max_record_line_bytes")]
    pub max_record_line_bytes: usize,

    /// Overrides the mode's default KEX list
    #[serde(default)]
    pub kex_algorithms: Option<Vec<String>>,

    /// Overrides the mode's default authentication list
    #[serde(default)]
    pub auth_algorithms: Option<Vec<String>>,

    #[serde(default = "default_request")]
    pub request_message: String,

    #[serde(default = "default_response")]
    pub response_message: String,
}

fn default_mode() -> HandshakeMode {
    HandshakeMode::Kemtls
}

fn default_handshakes() -> usize {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_base_port() -> u16 {
    4433
}

fn default_max_attempts_factor() -> u32 {
    3
}

fn default_max_record_line_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_request() -> String {
    "hello, server".to_string()
}

fn default_response() -> String {
    "hello, client".to_string()
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            handshakes: default_handshakes(),
            client_auth: false,
            cached_certificate: false,
            server_host: default_host(),
            client_host: default_host(),
            bind_ip: default_bind_ip(),
            base_port: default_base_port(),
            root: RootSource::default(),
            max_attempts_factor: default_max_attempts_factor(),
            max_record_line_bytes: default_max_record_line_bytes(),
            kex_algorithms: None,
            auth_algorithms: None,
            request_message: default_request(),
            response_message: default_response(),
        }
    }
}

impl BenchmarkConfig {
    /// Reject settings the run cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.handshakes == 0 {
            return Err(CoreError::configuration("handshakes must be greater than 0"));
        }
        if self.request_message.is_empty() || self.response_message.is_empty() {
            return Err(CoreError::configuration("application messages must not be empty"));
        }
        if self.server_host.trim().is_empty() {
            return Err(CoreError::configuration("server_host must not be empty"));
        }
        if self.max_record_line_bytes == 0 {
            return Err(CoreError::configuration("max_record_line_bytes must be greater than 0"));
        }
        for name in self.kex_names() {
            AlgorithmCatalog::resolve_key_exchange(&name)?;
            AlgorithmCatalog::security_level_of(&name)?;
        }
        for name in self.auth_names() {
            match self.mode {
                HandshakeMode::Kemtls => AlgorithmCatalog::resolve_key_exchange(&name)?,
                HandshakeMode::Pqtls => AlgorithmCatalog::resolve_signature(&name)?,
                HandshakeMode::Classic => AlgorithmCatalog::resolve_classical(&name)?,
            };
        }
        Ok(())
    }

    /// Key-exchange names in iteration order
    pub fn kex_names(&self) -> Vec<String> {
        if let Some(names) = &self.kex_algorithms {
            return names.clone();
        }
        let defaults = match self.mode {
            HandshakeMode::Classic => AlgorithmCatalog::default_classical_names(),
            _ => AlgorithmCatalog::default_pq_kex_names(),
        };
        defaults.into_iter().map(String::from).collect()
    }

    /// Authentication names in iteration order.
    ///
    /// KEMTLS authenticates with the KEX algorithm itself, so the list is the
    /// KEX list.
    pub fn auth_names(&self) -> Vec<String> {
        if self.mode == HandshakeMode::Kemtls {
            return self.kex_names();
        }
        if let Some(names) = &self.auth_algorithms {
            return names.clone();
        }
        let defaults = match self.mode {
            HandshakeMode::Classic => AlgorithmCatalog::default_classical_names(),
            _ => AlgorithmCatalog::default_pq_auth_names(),
        };
        defaults.into_iter().map(String::from).collect()
    }

    /// Attempt budget for one pair, `None` when unbounded
    pub fn max_attempts(&self) -> Option<usize> {
        match self.max_attempts_factor {
            0 => None,
            factor => Some(self.handshakes.saturating_mul(factor as usize)),
        }
    }

    /// First host of `server_host`, used as the dial target
    pub fn dial_host(&self) -> &str {
        self.server_host.split(',').next().unwrap_or("").trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BenchmarkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_attempts(), Some(30));
        assert_eq!(config.dial_host(), "127.0.0.1");
    }

    #[test]
    fn test_zero_handshakes_rejected() {
        let config = BenchmarkConfig {
            handshakes: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Configuration(_))));
    }

    #[test]
    fn test_unknown_override_rejected() {
        let config = BenchmarkConfig {
            kex_algorithms: Some(vec!["Kyber512".into(), "Kyber9000".into()]),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(CoreError::UnknownKeyExchange("Kyber9000".to_string()))
        );
    }

    #[test]
    fn test_pqtls_auth_must_be_hybrid_signature() {
        let config = BenchmarkConfig {
            mode: HandshakeMode::Pqtls,
            auth_algorithms: Some(vec!["P256_Kyber512".into()]),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::UnknownSignature(_))));
    }

    #[test]
    fn test_kemtls_auth_follows_kex() {
        let config = BenchmarkConfig {
            kex_algorithms: Some(vec!["Kyber768".into()]),
            auth_algorithms: Some(vec!["P256_Dilithium2".into()]),
            ..Default::default()
        };
        assert_eq!(config.auth_names(), vec!["Kyber768".to_string()]);
    }

    #[test]
    fn test_unbounded_attempts() {
        let config = BenchmarkConfig {
            max_attempts_factor: 0,
            ..Default::default()
        };
        assert_eq!(config.max_attempts(), None);
    }

    #[test]
    fn test_root_family_table() {
        let dilithium = |level| RootFamily::Dilithium.representative(level).unwrap();
        let falcon = |level| RootFamily::Falcon.representative(level).unwrap();
        assert_eq!(dilithium(SecurityLevel::L3), "P384_Dilithium3");
        assert_eq!(falcon(SecurityLevel::L3), "P256_Falcon512");
        assert_eq!(falcon(SecurityLevel::L5), "P521_Falcon1024");
        assert_eq!("Falcon".parse::<RootFamily>().unwrap(), RootFamily::Falcon);
        assert!("sphincs".parse::<RootFamily>().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let config: BenchmarkConfig = toml::from_str(
            r#"
            mode = "pqtls"
            handshakes = 50
            client_auth = true

            [root]
            kind = "persisted"
            family = "falcon"
            dir = "root_ca"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, HandshakeMode::Pqtls);
        assert_eq!(config.handshakes, 50);
        assert!(config.client_auth);
        assert_eq!(config.base_port, 4433);
        assert_eq!(
            config.root,
            RootSource::Persisted {
                family: RootFamily::Falcon,
                dir: PathBuf::from("root_ca"),
            }
        );
        assert!(config.validate().is_ok());
    }
}
