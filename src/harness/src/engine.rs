//! Interface to the TLS engine under test
//!
//! The harness never runs a handshake itself. An embedding program supplies a
//! [`TlsEngine`] that drives KEMTLS, PQTLS or classical TLS 1.3 over a
//! connected TCP stream and reports per-phase durations through an
//! [`EventSink`].

use crate::error::{HarnessError, Result};
use crate::tls_config::{ClientTlsConfig, ServerTlsConfig};
use async_trait::async_trait;
use parking_lot::Mutex;
use pqbench_core::HandshakeMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// Timed handshake phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    FullProtocol,
    WriteClientHello,
    ProcessServerHello,
    WriteKEMCiphertext,
    SendAppData,
    WriteServerHello,
    ReadKEMCiphertext,
    WriteCertificateVerify,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::FullProtocol => "FullProtocol",
            Phase::WriteClientHello => "WriteClientHello",
            Phase::ProcessServerHello => "ProcessServerHello",
            Phase::WriteKEMCiphertext => "WriteKEMCiphertext",
            Phase::SendAppData => "SendAppData",
            Phase::WriteServerHello => "WriteServerHello",
            Phase::ReadKEMCiphertext => "ReadKEMCiphertext",
            Phase::WriteCertificateVerify => "WriteCertificateVerify",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handshake message whose encoded size is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandshakeMessage {
    ClientHello,
    ClientKEMCiphertext,
    ServerHello,
    EncryptedExtensions,
    Certificate,
    CertificateRequest,
    CertificateVerify,
    ServerKEMCiphertext,
    Finished,
}

impl HandshakeMessage {
    pub fn name(self) -> &'static str {
        match self {
            HandshakeMessage::ClientHello => "ClientHello",
            HandshakeMessage::ClientKEMCiphertext => "ClientKEMCiphertext",
            HandshakeMessage::ServerHello => "ServerHello",
            HandshakeMessage::EncryptedExtensions => "EncryptedExtensions",
            HandshakeMessage::Certificate => "Certificate",
            HandshakeMessage::CertificateRequest => "CertificateRequest",
            HandshakeMessage::CertificateVerify => "CertificateVerify",
            HandshakeMessage::ServerKEMCiphertext => "ServerKEMCiphertext",
            HandshakeMessage::Finished => "Finished",
        }
    }
}

impl fmt::Display for HandshakeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One phase measurement reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseEvent {
    pub phase: Phase,
    pub duration: Duration,
}

/// Side channel the engine reports phase timings through.
///
/// Cloned handles share one buffer; the harness creates a fresh sink per
/// connection attempt.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    events: Arc<Mutex<Vec<PhaseEvent>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, phase: Phase, duration: Duration) {
        self.events.lock().push(PhaseEvent { phase, duration });
    }

    pub fn events(&self) -> Vec<PhaseEvent> {
        self.events.lock().clone()
    }

    /// Latest duration per phase
    pub fn phases(&self) -> BTreeMap<Phase, Duration> {
        self.events
            .lock()
            .iter()
            .map(|e| (e.phase, e.duration))
            .collect()
    }
}

/// Result flags and sizes of a finished handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub did_kemtls: bool,
    pub did_pqtls: bool,
    pub did_client_auth: bool,
    /// Server certificate message as received, for cached-certificate mode
    pub certificate_message: Option<Vec<u8>>,
    /// The handshake resumed from a client-cached server certificate
    pub used_cached_certificate: bool,
    /// Sizes of the handshake messages this endpoint wrote
    pub message_sizes: BTreeMap<HandshakeMessage, u32>,
}

impl ConnectionState {
    /// Check the negotiated variant against the mode.
    ///
    /// Classic mode has no variant flag; mutual authentication is checked in
    /// every mode when requested.
    pub fn confirm(&self, mode: HandshakeMode, client_auth: bool) -> Result<()> {
        match mode {
            HandshakeMode::Kemtls if !self.did_kemtls => {
                return Err(HarnessError::ProtocolMismatch(
                    "KEMTLS not negotiated".into(),
                ));
            }
            HandshakeMode::Pqtls if !self.did_pqtls => {
                return Err(HarnessError::ProtocolMismatch(
                    "PQTLS not negotiated".into(),
                ));
            }
            _ => {}
        }
        if client_auth && !self.did_client_auth {
            return Err(HarnessError::ProtocolMismatch(format!(
                "{} completed without client authentication",
                mode
            )));
        }
        Ok(())
    }
}

/// An established TLS connection
#[async_trait]
pub trait TlsConnection: Send {
    /// Read decrypted application data; 0 means the peer closed
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    async fn write_all(&mut self, buf: &[u8]) -> Result<()>;

    fn state(&self) -> ConnectionState;
}

/// TLS engine that performs the handshake over a connected stream
#[async_trait]
pub trait TlsEngine: Send + Sync + 'static {
    async fn connect(
        &self,
        stream: TcpStream,
        config: &ClientTlsConfig,
        events: EventSink,
    ) -> Result<Box<dyn TlsConnection>>;

    async fn accept(
        &self,
        stream: TcpStream,
        config: &ServerTlsConfig,
        events: EventSink,
    ) -> Result<Box<dyn TlsConnection>>;
}

/// Read until `buf` is full or the peer closes; returns bytes read
pub(crate) async fn read_full(conn: &mut dyn TlsConnection, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = conn.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_keeps_latest_per_phase() {
        let sink = EventSink::new();
        let shared = sink.clone();
        shared.record(Phase::FullProtocol, Duration::from_millis(3));
        shared.record(Phase::WriteClientHello, Duration::from_millis(1));
        shared.record(Phase::FullProtocol, Duration::from_millis(5));

        assert_eq!(sink.events().len(), 3);
        let phases = sink.phases();
        assert_eq!(phases[&Phase::FullProtocol], Duration::from_millis(5));
        assert_eq!(phases[&Phase::WriteClientHello], Duration::from_millis(1));
    }

    /// Connection that hands out scripted chunks, then EOF
    struct Chunked(std::collections::VecDeque<Vec<u8>>);

    #[async_trait]
    impl TlsConnection for Chunked {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let Some(chunk) = self.0.pop_front() else {
                return Ok(0);
            };
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }

        async fn write_all(&mut self, _buf: &[u8]) -> Result<()> {
            Ok(())
        }

        fn state(&self) -> ConnectionState {
            ConnectionState::default()
        }
    }

    #[test]
    fn test_read_full_joins_chunks_and_stops_at_eof() {
        let chunks = vec![b"hello".to_vec(), b", ".to_vec(), b"client".to_vec()];
        let mut conn = Chunked(chunks.into());
        let mut buf = [0u8; 13];
        let n = tokio_test::block_on(read_full(&mut conn, &mut buf)).unwrap();
        assert_eq!(&buf[..n], b"hello, client");

        let mut short = Chunked(vec![b"hel".to_vec()].into());
        let mut buf = [0u8; 13];
        let n = tokio_test::block_on(read_full(&mut short, &mut buf)).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_confirm_flags() {
        let kemtls = ConnectionState {
            did_kemtls: true,
            ..Default::default()
        };
        assert!(kemtls.confirm(HandshakeMode::Kemtls, false).is_ok());
        assert!(kemtls.confirm(HandshakeMode::Pqtls, false).is_err());
        assert!(kemtls.confirm(HandshakeMode::Kemtls, true).is_err());

        // Classic only checks client authentication
        let plain = ConnectionState::default();
        assert!(plain.confirm(HandshakeMode::Classic, false).is_ok());
        assert!(plain.confirm(HandshakeMode::Classic, true).is_err());
    }
}
