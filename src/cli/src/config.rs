//! Configuration loading and flag overrides

use anyhow::{bail, Context, Result};
use clap::Args;
use pqbench_core::{BenchmarkConfig, HandshakeMode, RootFamily, RootSource};
use std::path::{Path, PathBuf};

const DEFAULT_ROOT_DIR: &str = "root_ca";

/// Load a TOML configuration, or the defaults when no file is given
pub fn load(path: Option<&Path>) -> Result<BenchmarkConfig> {
    let Some(path) = path else {
        return Ok(BenchmarkConfig::default());
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    let config: BenchmarkConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;

    Ok(config)
}

/// Flags that override the file configuration
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Handshake mode: kemtls, pqtls or classic
    #[arg(long, global = true, env = "PQBENCH_MODE")]
    pub mode: Option<HandshakeMode>,

    /// Successful handshakes per algorithm pair
    #[arg(long, global = true)]
    pub handshakes: Option<usize>,

    /// Require mutual authentication
    #[arg(long, global = true)]
    pub client_auth: bool,

    /// Prime each pair and resume with a cached server certificate
    #[arg(long, global = true)]
    pub cached_cert: bool,

    /// Comma-separated server hosts; the first is dialled
    #[arg(long, global = true, env = "PQBENCH_SERVER_HOST")]
    pub server_host: Option<String>,

    #[arg(long, global = true, env = "PQBENCH_CLIENT_HOST")]
    pub client_host: Option<String>,

    /// Use persisted hybrid roots of this family (dilithium or falcon)
    #[arg(long, global = true)]
    pub hybrid_root: Option<RootFamily>,

    /// Directory holding root records
    #[arg(long, global = true)]
    pub root_dir: Option<PathBuf>,

    /// PEM root certificate
    #[arg(long, global = true, requires = "root_key")]
    pub root_cert: Option<PathBuf>,

    /// PEM root private key
    #[arg(long, global = true, requires = "root_cert")]
    pub root_key: Option<PathBuf>,

    /// First listening port; 0 lets the OS choose
    #[arg(long, global = true)]
    pub base_port: Option<u16>,
}

impl Overrides {
    /// Apply the flags and validate the result
    pub fn apply(&self, mut config: BenchmarkConfig) -> Result<BenchmarkConfig> {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(handshakes) = self.handshakes {
            config.handshakes = handshakes;
        }
        config.client_auth |= self.client_auth;
        config.cached_certificate |= self.cached_cert;
        if let Some(host) = &self.server_host {
            config.server_host = host.clone();
        }
        if let Some(host) = &self.client_host {
            config.client_host = host.clone();
        }
        if let Some(port) = self.base_port {
            config.base_port = port;
        }

        config.root = match (&self.hybrid_root, &self.root_cert, &self.root_key) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                bail!("--hybrid-root cannot be combined with --root-cert/--root-key")
            }
            (Some(family), None, None) => RootSource::Persisted {
                family: *family,
                dir: self.root_dir(&config),
            },
            (None, Some(cert), Some(key)) => RootSource::Pem {
                cert: cert.clone(),
                key: key.clone(),
            },
            (None, Some(_), None) | (None, None, Some(_)) => {
                bail!("--root-cert and --root-key must be given together")
            }
            (None, None, None) => match &config.root {
                RootSource::Persisted { family, .. } if self.root_dir.is_some() => {
                    RootSource::Persisted {
                        family: *family,
                        dir: self.root_dir(&config),
                    }
                }
                root => root.clone(),
            },
        };

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Root record directory: the flag, then the configured one, then `root_ca`
    pub fn root_dir(&self, config: &BenchmarkConfig) -> PathBuf {
        if let Some(dir) = &self.root_dir {
            return dir.clone();
        }
        match &config.root {
            RootSource::Persisted { dir, .. } => dir.clone(),
            _ => PathBuf::from(DEFAULT_ROOT_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_reported() {
        let err = load(Some(Path::new("/nonexistent/pqbench.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read configuration file"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let overrides = Overrides {
            mode: Some(HandshakeMode::Pqtls),
            handshakes: Some(3),
            client_auth: true,
            hybrid_root: Some(RootFamily::Falcon),
            root_dir: Some(PathBuf::from("/tmp/roots")),
            ..Default::default()
        };
        let config = overrides.apply(BenchmarkConfig::default()).unwrap();

        assert_eq!(config.mode, HandshakeMode::Pqtls);
        assert_eq!(config.handshakes, 3);
        assert!(config.client_auth);
        assert!(!config.cached_certificate);
        assert_eq!(
            config.root,
            RootSource::Persisted {
                family: RootFamily::Falcon,
                dir: PathBuf::from("/tmp/roots"),
            }
        );
    }

    #[test]
    fn test_conflicting_root_flags() {
        let overrides = Overrides {
            hybrid_root: Some(RootFamily::Dilithium),
            root_cert: Some(PathBuf::from("root.pem")),
            root_key: Some(PathBuf::from("root.key")),
            ..Default::default()
        };
        assert!(overrides.apply(BenchmarkConfig::default()).is_err());
    }

    #[test]
    fn test_invalid_result_is_rejected() {
        let overrides = Overrides {
            handshakes: Some(0),
            ..Default::default()
        };
        assert!(overrides.apply(BenchmarkConfig::default()).is_err());
    }
}
