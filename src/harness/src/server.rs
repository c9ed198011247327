//! Server side of the benchmark
//!
//! One listener per runnable pair, each on its planned port. A listener
//! accepts connections sequentially and reports aggregated statistics every
//! `handshakes` counted connections.
//!
//! The two sides stay in step by counting the same connections. A failed
//! handshake is counted by neither side. In cached-certificate mode only
//! handshakes that resumed from the cached certificate are counted. A full
//! handshake is a priming connection whatever its position, so a priming
//! attempt the client retries never reaches the server's samples.

use crate::engine::{read_full, ConnectionState, EventSink, TlsEngine};
use crate::error::{HarnessError, Result};
use crate::plan::{plan_matrix, PairPlan};
use crate::stats::{AlgorithmResult, BenchmarkSample, Side};
use crate::tls_config::ServerTlsConfig;
use futures::future::try_join_all;
use pqbench_core::BenchmarkConfig;
use pqbench_pki::ChainAssembler;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Statistics for one completed batch of server-side handshakes
#[derive(Debug, Clone)]
pub struct ServerReport {
    pub plan: PairPlan,
    pub result: AlgorithmResult,
}

/// A pair's listener
#[derive(Debug, Clone)]
pub struct ServerEndpoint {
    pub plan: PairPlan,
    pub addr: SocketAddr,
}

/// Listeners for every runnable pair of the matrix
pub struct ServerFleet {
    endpoints: Vec<ServerEndpoint>,
    reports: mpsc::UnboundedReceiver<ServerReport>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerFleet {
    /// Launch with an assembler of its own.
    ///
    /// A synthesized root then exists only inside this fleet, so clients
    /// need a persisted or PEM root, or [`ServerFleet::launch_with`].
    pub async fn launch<E: TlsEngine>(config: &BenchmarkConfig, engine: Arc<E>) -> Result<Self> {
        Self::launch_with(config, engine, ChainAssembler::new(config)).await
    }

    /// Build a chain and server configuration per runnable pair, bind every
    /// listener, then start serving
    pub async fn launch_with<E: TlsEngine>(
        config: &BenchmarkConfig,
        engine: Arc<E>,
        assembler: ChainAssembler,
    ) -> Result<Self> {
        config.validate()?;

        let mut prepared = Vec::new();
        for plan in plan_matrix(config)?.into_iter().filter(|p| p.is_runnable()) {
            let (kex, auth) = plan.algorithms(config.mode)?;
            let chain = assembler.build_chain(plan.kex_level)?;
            let tls = ServerTlsConfig::new(config, &chain, kex, auth)?;
            prepared.push((plan, tls));
        }

        let listeners = try_join_all(prepared.iter().map(|(plan, _)| {
            let port = plan.port.unwrap_or(0);
            TcpListener::bind((config.bind_ip.clone(), port))
        }))
        .await?;

        let (report_tx, reports) = mpsc::unbounded_channel();
        let config = Arc::new(config.clone());
        let mut endpoints = Vec::with_capacity(prepared.len());
        let mut tasks = Vec::with_capacity(prepared.len());

        for ((plan, tls), listener) in prepared.into_iter().zip(listeners) {
            let addr = listener.local_addr()?;
            info!(pair = %plan, %addr, "Listening");
            endpoints.push(ServerEndpoint {
                plan: plan.clone(),
                addr,
            });

            let worker = PairServer {
                plan,
                tls,
                config: config.clone(),
                engine: engine.clone(),
                reports: report_tx.clone(),
            };
            tasks.push(tokio::spawn(worker.run(listener)));
        }

        Ok(Self {
            endpoints,
            reports,
            tasks,
        })
    }

    pub fn endpoints(&self) -> &[ServerEndpoint] {
        &self.endpoints
    }

    pub fn address_of(&self, kex: &str, auth: &str) -> Option<SocketAddr> {
        self.endpoints
            .iter()
            .find(|e| e.plan.kex == kex && e.plan.auth == auth)
            .map(|e| e.addr)
    }

    /// Wait for the next batch report from any listener
    pub async fn next_report(&mut self) -> Option<ServerReport> {
        self.reports.recv().await
    }

    /// Stop every listener
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for ServerFleet {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct PairServer<E: TlsEngine> {
    plan: PairPlan,
    tls: ServerTlsConfig,
    config: Arc<BenchmarkConfig>,
    engine: Arc<E>,
    reports: mpsc::UnboundedSender<ServerReport>,
}

impl<E: TlsEngine> PairServer<E> {
    async fn run(self, listener: TcpListener) {
        let mut samples = Vec::with_capacity(self.config.handshakes);
        let mut last_state = ConnectionState::default();

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(pair = %self.plan, error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            let events = EventSink::new();
            let state = match self.serve(stream, events.clone()).await {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        pair = %self.plan,
                        %peer,
                        error = %e,
                        "Connection failed, not counted"
                    );
                    continue;
                }
            };

            if self.config.cached_certificate && !state.used_cached_certificate {
                debug!(pair = %self.plan, %peer, "Priming connection served, not counted");
                continue;
            }

            samples.push(BenchmarkSample::new(events.phases(), true));
            last_state = state;

            if samples.len() >= self.config.handshakes {
                let result = AlgorithmResult::from_samples(
                    &self.plan.kex,
                    &self.plan.auth,
                    self.config.mode,
                    Side::Server,
                    std::mem::take(&mut samples),
                    &last_state.message_sizes,
                );
                info!(
                    pair = %self.plan,
                    samples = result.sample_count(),
                    "Server batch complete"
                );
                if self
                    .reports
                    .send(ServerReport {
                        plan: self.plan.clone(),
                        result,
                    })
                    .is_err()
                {
                    debug!(pair = %self.plan, "Report receiver gone");
                }
            }
        }
    }

    /// Handshake, echo the response to a matching request, check the flags
    async fn serve(&self, stream: TcpStream, events: EventSink) -> Result<ConnectionState> {
        let mut conn = self.engine.accept(stream, &self.tls, events).await?;

        let expected = self.config.request_message.as_bytes();
        let mut buf = vec![0u8; expected.len()];
        let n = read_full(conn.as_mut(), &mut buf).await?;
        if buf[..n] != *expected {
            return Err(HarnessError::AppData(format!(
                "expected {} request bytes, got {}",
                expected.len(),
                n
            )));
        }
        conn.write_all(self.config.response_message.as_bytes()).await?;

        let state = conn.state();
        state.confirm(self.config.mode, self.tls.requires_client_auth())?;
        Ok(state)
    }
}
