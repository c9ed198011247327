//! Client and server TLS configurations for one algorithm pair

use crate::error::Result;
use pqbench_core::{AlgorithmId, BenchmarkConfig, HandshakeMode, KeyExchangeId};
use pqbench_pki::{Certificate, EndpointCredential, FlagSet, KeyUsages, LeafRole, TrustChain};
use tracing::debug;

/// Leaf key usage: KEM leaves agree keys, signature leaves sign
pub fn leaf_key_usage(mode: HandshakeMode) -> FlagSet<KeyUsages> {
    match mode {
        HandshakeMode::Kemtls => KeyUsages::KeyAgreement.into(),
        HandshakeMode::Pqtls | HandshakeMode::Classic => KeyUsages::DigitalSignature.into(),
    }
}

#[derive(Debug, Clone)]
pub struct ClientTlsConfig {
    pub mode: HandshakeMode,
    /// Single key-exchange preference
    pub kex: KeyExchangeId,
    pub auth: AlgorithmId,
    pub server_name: String,
    /// Trust anchor for the server chain
    pub root: Certificate,
    /// Client certificate chain, present when client authentication is on
    pub credential: Option<EndpointCredential>,
    /// Server certificate message harvested by a priming connection
    pub cached_certificate: Option<Vec<u8>>,
}

impl ClientTlsConfig {
    /// Client configuration trusting `chain`'s root; issues a client leaf for
    /// `auth` when client authentication is enabled
    pub fn new(
        config: &BenchmarkConfig,
        chain: &TrustChain,
        kex: KeyExchangeId,
        auth: AlgorithmId,
    ) -> Result<Self> {
        let credential = if config.client_auth {
            Some(chain.issue_leaf(
                auth,
                LeafRole::Client,
                leaf_key_usage(config.mode),
                &config.client_host,
            )?)
        } else {
            None
        };

        Ok(Self {
            mode: config.mode,
            kex,
            auth,
            server_name: config.dial_host().to_string(),
            root: chain.root().clone(),
            credential,
            cached_certificate: None,
        })
    }

    pub fn with_cached_certificate(mut self, message: Vec<u8>) -> Self {
        debug!(kex = %self.kex, bytes = message.len(), "Installed cached server certificate");
        self.cached_certificate = Some(message);
        self
    }

    pub fn has_cached_certificate(&self) -> bool {
        self.cached_certificate.as_ref().is_some_and(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ServerTlsConfig {
    pub mode: HandshakeMode,
    pub kex: KeyExchangeId,
    pub auth: AlgorithmId,
    /// Server leaf and the chain it sends
    pub credential: EndpointCredential,
    /// CA clients must chain to; set when client authentication is required
    pub client_ca: Option<Certificate>,
}

impl ServerTlsConfig {
    /// Server configuration with a fresh leaf for `auth` under `chain`
    pub fn new(
        config: &BenchmarkConfig,
        chain: &TrustChain,
        kex: KeyExchangeId,
        auth: AlgorithmId,
    ) -> Result<Self> {
        let credential = chain.issue_leaf(
            auth,
            LeafRole::Server,
            leaf_key_usage(config.mode),
            &config.server_host,
        )?;

        Ok(Self {
            mode: config.mode,
            kex,
            auth,
            credential,
            client_ca: config.client_auth.then(|| chain.root().clone()),
        })
    }

    pub fn requires_client_auth(&self) -> bool {
        self.client_ca.is_some()
    }
}
