//! # PQBench Harness
//!
//! Drives handshake benchmarks over an algorithm matrix and aggregates the
//! per-phase timings.
//!
//! ## Module Structure
//!
//! ```text
//! harness/
//! ├── engine/        - TLS engine interface, phase events, connection flags
//! ├── tls_config/    - Per-pair client and server configurations
//! ├── plan/          - Matrix iteration, matching rules, port assignment
//! ├── orchestrator/  - Client loop with priming and bounded retry
//! ├── server/        - One listener per pair, batch reports
//! └── stats/         - Means, deviations, hybrid penalties, tables
//! ```

pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod server;
pub mod stats;
pub mod tls_config;

pub use engine::{
    ConnectionState, EventSink, HandshakeMessage, Phase, PhaseEvent, TlsConnection, TlsEngine,
};
pub use error::{HarnessError, Result};
pub use orchestrator::{BenchmarkOrchestrator, MatrixReport, PairOutcome, PairReport};
pub use plan::{plan_matrix, plan_pair, PairPlan, SkipReason};
pub use server::{ServerEndpoint, ServerFleet, ServerReport};
pub use stats::{
    AlgorithmResult, BenchmarkSample, HybridPenalty, PhaseStats, Side, StatisticsAggregator,
};
pub use tls_config::{ClientTlsConfig, ServerTlsConfig};
