//! Client-side benchmark orchestration
//!
//! Pairs are driven strictly one after another. Each runnable pair builds its
//! own intermediate at the KEX level under the assembler's root for that
//! level, optionally primes a cached server certificate, then collects
//! exactly `handshakes` successful samples.
//! Failed attempts are logged and retried until the attempt budget runs out,
//! at which point the pair ends as [`PairOutcome::Aborted`].

use crate::engine::{read_full, ConnectionState, EventSink, TlsEngine};
use crate::error::{HarnessError, Result};
use crate::plan::{plan_matrix, plan_pair, PairPlan, SkipReason};
use crate::stats::{AlgorithmResult, BenchmarkSample, Side, StatisticsAggregator};
use crate::tls_config::ClientTlsConfig;
use pqbench_core::{BenchmarkConfig, CoreError};
use pqbench_pki::ChainAssembler;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Terminal state of one pair
#[derive(Debug, Clone)]
pub enum PairOutcome {
    Skipped(SkipReason),
    Completed(AlgorithmResult),
    Aborted {
        attempts: usize,
        collected: usize,
        last_error: String,
    },
}

impl PairOutcome {
    pub fn result(&self) -> Option<&AlgorithmResult> {
        match self {
            PairOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PairReport {
    pub plan: PairPlan,
    pub outcome: PairOutcome,
}

/// All pair outcomes plus the aggregated statistics of completed pairs
#[derive(Debug, Clone)]
pub struct MatrixReport {
    pub pairs: Vec<PairReport>,
    pub stats: StatisticsAggregator,
}

/// One successful handshake with its timings
struct Handshake {
    sample: BenchmarkSample,
    state: ConnectionState,
}

/// Attempt counter against an optional cap
struct AttemptBudget {
    used: usize,
    limit: Option<usize>,
}

impl AttemptBudget {
    fn new(limit: Option<usize>) -> Self {
        Self { used: 0, limit }
    }

    /// Consume one attempt; false once the budget is spent
    fn take(&mut self) -> bool {
        if self.limit.is_some_and(|limit| self.used >= limit) {
            return false;
        }
        self.used += 1;
        true
    }
}

pub struct BenchmarkOrchestrator<E: TlsEngine> {
    config: BenchmarkConfig,
    engine: Arc<E>,
    assembler: ChainAssembler,
}

impl<E: TlsEngine> BenchmarkOrchestrator<E> {
    pub fn new(config: BenchmarkConfig, engine: Arc<E>) -> Result<Self> {
        let assembler = ChainAssembler::new(&config);
        Self::with_assembler(config, engine, assembler)
    }

    /// Orchestrator drawing roots from `assembler`. Pass a clone of the
    /// assembler given to [`ServerFleet::launch_with`](crate::ServerFleet::launch_with)
    /// when both sides run in one process.
    pub fn with_assembler(
        config: BenchmarkConfig,
        engine: Arc<E>,
        assembler: ChainAssembler,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            engine,
            assembler,
        })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn assembler(&self) -> &ChainAssembler {
        &self.assembler
    }

    /// Run the whole matrix against `server_host` and the planned ports
    pub async fn run_matrix(&self) -> Result<MatrixReport> {
        let host = self.config.dial_host().to_string();
        let mut targets = Vec::new();
        for plan in plan_matrix(&self.config)? {
            let addr = match plan.port {
                Some(0) => {
                    return Err(CoreError::configuration(
                        "base_port 0 needs explicit targets; use run_matrix_with",
                    )
                    .into())
                }
                Some(port) => tokio::net::lookup_host((host.as_str(), port)).await?.next(),
                None => None,
            };
            targets.push((plan, addr));
        }
        self.run_plans(targets).await
    }

    /// Run the whole matrix, resolving each runnable pair's address with
    /// `resolve`
    pub async fn run_matrix_with<F>(&self, resolve: F) -> Result<MatrixReport>
    where
        F: Fn(&PairPlan) -> Option<SocketAddr>,
    {
        let targets = plan_matrix(&self.config)?
            .into_iter()
            .map(|plan| {
                let addr = resolve(&plan);
                (plan, addr)
            })
            .collect();
        self.run_plans(targets).await
    }

    async fn run_plans(
        &self,
        targets: Vec<(PairPlan, Option<SocketAddr>)>,
    ) -> Result<MatrixReport> {
        let mut stats = StatisticsAggregator::new(self.config.mode, Side::Client);
        let mut pairs = Vec::with_capacity(targets.len());

        for (plan, addr) in targets {
            let outcome = match (&plan.skip, addr) {
                (Some(reason), _) => {
                    debug!(pair = %plan, reason = %reason, "Skipping pair");
                    PairOutcome::Skipped(reason.clone())
                }
                (None, Some(addr)) => self.run_pair(&plan, addr).await?,
                (None, None) => {
                    return Err(HarnessError::NoTarget {
                        kex: plan.kex.clone(),
                        auth: plan.auth.clone(),
                    })
                }
            };
            if let Some(result) = outcome.result() {
                stats.push(result.clone());
            }
            pairs.push(PairReport { plan, outcome });
        }

        Ok(MatrixReport { pairs, stats })
    }

    /// Run a pair named directly; a cross-level request is a configuration
    /// error rather than a skip
    pub async fn run_explicit_pair(
        &self,
        kex: &str,
        auth: &str,
        addr: SocketAddr,
    ) -> Result<PairOutcome> {
        let plan = plan_pair(self.config.mode, kex, auth)?;
        match &plan.skip {
            Some(SkipReason::LevelMismatch {
                kex_level,
                auth_level,
            }) => Err(CoreError::LevelMismatch {
                kex: plan.kex.clone(),
                kex_level: kex_level.as_u8(),
                auth: plan.auth.clone(),
                auth_level: auth_level.as_u8(),
            }
            .into()),
            Some(reason) => Err(CoreError::configuration(format!(
                "cannot benchmark {}: {}",
                plan, reason
            ))
            .into()),
            None => self.run_pair(&plan, addr).await,
        }
    }

    /// Drive one pair to a terminal state.
    ///
    /// Chain or issuance failures are returned as errors; handshake failures
    /// are retried within the attempt budget.
    pub async fn run_pair(&self, plan: &PairPlan, addr: SocketAddr) -> Result<PairOutcome> {
        if let Some(reason) = &plan.skip {
            debug!(pair = %plan, reason = %reason, "Skipping pair");
            return Ok(PairOutcome::Skipped(reason.clone()));
        }

        let mode = self.config.mode;
        let (kex, auth) = plan.algorithms(mode)?;
        let chain = self.assembler.build_chain(plan.kex_level)?;
        let mut client = ClientTlsConfig::new(&self.config, &chain, kex, auth)?;

        info!(pair = %plan, mode = %mode, %addr, "Starting handshakes");

        let mut budget = AttemptBudget::new(self.config.max_attempts());
        let mut last_error = String::new();

        if self.config.cached_certificate {
            loop {
                if !budget.take() {
                    return Ok(self.aborted(plan, budget.used, 0, last_error));
                }
                match self.handshake(&client, addr).await {
                    Ok(Handshake { state, .. }) => match state.certificate_message {
                        Some(message) if !message.is_empty() => {
                            client = client.with_cached_certificate(message);
                            break;
                        }
                        _ => {
                            last_error =
                                "priming connection returned no certificate message".into();
                            warn!(pair = %plan, attempt = budget.used, "{}", last_error);
                        }
                    },
                    Err(e) => {
                        last_error = e.to_string();
                        warn!(
                            pair = %plan,
                            attempt = budget.used,
                            error = %e,
                            "Priming handshake failed"
                        );
                    }
                }
            }
        }

        let mut samples = Vec::with_capacity(self.config.handshakes);
        let mut last_state = ConnectionState::default();
        while samples.len() < self.config.handshakes {
            if !budget.take() {
                return Ok(self.aborted(plan, budget.used, samples.len(), last_error));
            }
            match self.handshake(&client, addr).await {
                Ok(handshake) => {
                    samples.push(handshake.sample);
                    last_state = handshake.state;
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        pair = %plan,
                        attempt = budget.used,
                        error = %e,
                        "Handshake attempt failed, not counted"
                    );
                }
            }
        }

        let result = AlgorithmResult::from_samples(
            &plan.kex,
            &plan.auth,
            mode,
            Side::Client,
            samples,
            &last_state.message_sizes,
        );
        info!(
            pair = %plan,
            samples = result.sample_count(),
            attempts = budget.used,
            full_protocol_ms = result.mean(crate::engine::Phase::FullProtocol).unwrap_or(0.0),
            "Pair completed"
        );
        Ok(PairOutcome::Completed(result))
    }

    fn aborted(
        &self,
        plan: &PairPlan,
        attempts: usize,
        collected: usize,
        last_error: String,
    ) -> PairOutcome {
        warn!(
            pair = %plan,
            attempts,
            collected,
            error = %last_error,
            "Attempt budget exhausted, aborting pair"
        );
        PairOutcome::Aborted {
            attempts,
            collected,
            last_error,
        }
    }

    /// One connection: handshake, request/response, flag check
    async fn handshake(&self, client: &ClientTlsConfig, addr: SocketAddr) -> Result<Handshake> {
        let stream = TcpStream::connect(addr).await?;
        let events = EventSink::new();
        let mut conn = self.engine.connect(stream, client, events.clone()).await?;

        conn.write_all(self.config.request_message.as_bytes()).await?;
        let expected = self.config.response_message.as_bytes();
        let mut buf = vec![0u8; expected.len()];
        let n = read_full(conn.as_mut(), &mut buf).await?;
        if buf[..n] != *expected {
            return Err(HarnessError::AppData(format!(
                "expected {} response bytes, got {}",
                expected.len(),
                n
            )));
        }

        let state = conn.state();
        state.confirm(self.config.mode, self.config.client_auth)?;
        if client.has_cached_certificate() && !state.used_cached_certificate {
            return Err(HarnessError::ProtocolMismatch(
                "server ignored the cached certificate".into(),
            ));
        }

        Ok(Handshake {
            sample: BenchmarkSample::new(events.phases(), true),
            state,
        })
    }
}
