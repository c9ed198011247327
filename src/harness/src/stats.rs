//! Benchmark statistics
//!
//! Per-pair mean and population standard deviation of each phase, message
//! size breakdowns, and the hybrid penalty of each hybrid KEX against its
//! post-quantum-only counterpart.

use crate::engine::{HandshakeMessage, Phase};
use pqbench_core::{AlgorithmCatalog, HandshakeMode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::Duration;

/// Which endpoint produced the samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Client,
    Server,
}

/// One handshake attempt's phase durations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkSample {
    pub phases: BTreeMap<Phase, Duration>,
    pub success: bool,
}

impl BenchmarkSample {
    pub fn new(phases: BTreeMap<Phase, Duration>, success: bool) -> Self {
        Self { phases, success }
    }

    /// Phase duration in milliseconds; unreported phases count as zero
    pub fn millis(&self, phase: Phase) -> f64 {
        self.phases
            .get(&phase)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Phases aggregated for `mode` on `side`
pub fn phases_for(mode: HandshakeMode, side: Side) -> &'static [Phase] {
    use Phase::*;
    match (side, mode) {
        (Side::Client, HandshakeMode::Kemtls) => &[
            FullProtocol,
            SendAppData,
            ProcessServerHello,
            WriteClientHello,
            WriteKEMCiphertext,
        ],
        (Side::Client, _) => &[FullProtocol, ProcessServerHello, WriteClientHello],
        (Side::Server, HandshakeMode::Kemtls) => {
            &[FullProtocol, WriteServerHello, ReadKEMCiphertext]
        }
        (Side::Server, _) => &[FullProtocol, WriteServerHello, WriteCertificateVerify],
    }
}

/// Handshake messages whose sizes are reported for `mode` on `side`
pub fn message_sizes_for(mode: HandshakeMode, side: Side) -> &'static [HandshakeMessage] {
    use HandshakeMessage::*;
    match (side, mode) {
        (Side::Client, HandshakeMode::Kemtls) => &[ClientHello, ClientKEMCiphertext, Certificate],
        (Side::Client, _) => &[ClientHello, Certificate, CertificateVerify],
        (Side::Server, HandshakeMode::Kemtls) => &[
            ServerHello,
            EncryptedExtensions,
            Certificate,
            CertificateRequest,
            ServerKEMCiphertext,
            Finished,
        ],
        (Side::Server, _) => &[
            ServerHello,
            EncryptedExtensions,
            Certificate,
            CertificateRequest,
            CertificateVerify,
            Finished,
        ],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseStats {
    pub mean_ms: f64,
    pub stdev_ms: f64,
}

/// Mean and population standard deviation; zero for an empty slice
pub fn mean_stdev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Aggregate for one (KEX, Auth) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmResult {
    pub kex: String,
    pub auth: String,
    pub mode: HandshakeMode,
    pub side: Side,
    pub phases: BTreeMap<Phase, PhaseStats>,
    pub message_sizes: BTreeMap<HandshakeMessage, u32>,
    /// Counted samples in attempt order
    pub samples: Vec<BenchmarkSample>,
}

impl AlgorithmResult {
    /// Aggregate the successful samples; failed ones are dropped
    pub fn from_samples(
        kex: &str,
        auth: &str,
        mode: HandshakeMode,
        side: Side,
        samples: Vec<BenchmarkSample>,
        sizes: &BTreeMap<HandshakeMessage, u32>,
    ) -> Self {
        let samples: Vec<BenchmarkSample> = samples.into_iter().filter(|s| s.success).collect();

        let phases = phases_for(mode, side)
            .iter()
            .map(|&phase| {
                let values: Vec<f64> = samples.iter().map(|s| s.millis(phase)).collect();
                let (mean_ms, stdev_ms) = mean_stdev(&values);
                (phase, PhaseStats { mean_ms, stdev_ms })
            })
            .collect();

        let message_sizes = message_sizes_for(mode, side)
            .iter()
            .map(|&m| (m, sizes.get(&m).copied().unwrap_or(0)))
            .collect();

        Self {
            kex: kex.to_string(),
            auth: auth.to_string(),
            mode,
            side,
            phases,
            message_sizes,
            samples,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn mean(&self, phase: Phase) -> Option<f64> {
        self.phases.get(&phase).map(|s| s.mean_ms)
    }

    /// Label used in tables: the KEX alone in KEMTLS, otherwise both names
    pub fn label(&self) -> String {
        match self.mode {
            HandshakeMode::Kemtls => self.kex.clone(),
            _ => format!("{} / {}", self.kex, self.auth),
        }
    }
}

/// Mean phase deltas of a hybrid KEX against its post-quantum-only baseline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridPenalty {
    pub hybrid: String,
    pub baseline: String,
    pub deltas: BTreeMap<Phase, f64>,
}

fn is_hybrid_kex(name: &str) -> bool {
    AlgorithmCatalog::resolve_key_exchange(name)
        .map(|d| d.is_hybrid)
        .unwrap_or(false)
}

/// `baseline` is the PQ-only counterpart of `hybrid` when the hybrid name
/// contains it. `Saber_KEM` is a substring of the LightSaber and FireSaber
/// names but not their counterpart.
fn is_counterpart(hybrid: &str, baseline: &str) -> bool {
    if hybrid == baseline || !hybrid.contains(baseline) || is_hybrid_kex(baseline) {
        return false;
    }
    !(baseline == "Saber_KEM" && (hybrid.contains("LightSaber") || hybrid.contains("FireSaber")))
}

/// Hybrid penalties over a result set, in result order
pub fn hybrid_penalties(results: &[AlgorithmResult]) -> Vec<HybridPenalty> {
    let mut penalties = Vec::new();
    for hybrid in results.iter().filter(|r| is_hybrid_kex(&r.kex)) {
        let same_auth =
            |r: &&AlgorithmResult| hybrid.mode == HandshakeMode::Kemtls || r.auth == hybrid.auth;
        for baseline in results.iter().filter(same_auth) {
            if baseline.side != hybrid.side || !is_counterpart(&hybrid.kex, &baseline.kex) {
                continue;
            }
            let deltas = hybrid
                .phases
                .iter()
                .filter_map(|(phase, stats)| {
                    baseline
                        .mean(*phase)
                        .map(|base| (*phase, stats.mean_ms - base))
                })
                .collect();
            penalties.push(HybridPenalty {
                hybrid: hybrid.kex.clone(),
                baseline: baseline.kex.clone(),
                deltas,
            });
        }
    }
    penalties
}

/// Collects per-pair results for one mode and side
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    mode: HandshakeMode,
    side: Side,
    results: Vec<AlgorithmResult>,
}

impl StatisticsAggregator {
    pub fn new(mode: HandshakeMode, side: Side) -> Self {
        Self {
            mode,
            side,
            results: Vec::new(),
        }
    }

    /// Aggregate one pair's samples and keep the result
    pub fn record(
        &mut self,
        kex: &str,
        auth: &str,
        samples: Vec<BenchmarkSample>,
        sizes: &BTreeMap<HandshakeMessage, u32>,
    ) -> &AlgorithmResult {
        let result = AlgorithmResult::from_samples(kex, auth, self.mode, self.side, samples, sizes);
        self.push(result)
    }

    pub fn push(&mut self, result: AlgorithmResult) -> &AlgorithmResult {
        self.results.push(result);
        &self.results[self.results.len() - 1]
    }

    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }

    pub fn hybrid_penalties(&self) -> Vec<HybridPenalty> {
        hybrid_penalties(&self.results)
    }

    /// Fixed-width table of means and deviations per phase
    pub fn summary_table(&self) -> String {
        let phases = phases_for(self.mode, self.side);
        let mut out = String::new();

        let _ = write!(out, "{:<40}", "TestName");
        for phase in phases {
            let _ = write!(
                out,
                " | {:>22} | {:>22}",
                format!("Avg{}", phase),
                format!("Stdev{}", phase)
            );
        }
        out.push('\n');

        for result in &self.results {
            let _ = write!(out, "{:<40}", result.label());
            for phase in phases {
                let stats = result.phases.get(phase);
                let _ = write!(
                    out,
                    " | {:>22.6} | {:>22.6}",
                    stats.map_or(0.0, |s| s.mean_ms),
                    stats.map_or(0.0, |s| s.stdev_ms)
                );
            }
            out.push('\n');
        }
        out
    }

    /// Fixed-width table of hybrid penalties, or a note when there are none
    pub fn penalty_table(&self) -> String {
        let penalties = self.hybrid_penalties();
        if penalties.is_empty() {
            return "No hybrid found in this test.\n".to_string();
        }

        let phases = phases_for(self.mode, self.side);
        let mut out = String::new();
        let _ = write!(out, "{:<40}", "TestName");
        for phase in phases {
            let _ = write!(out, " | {:>26}", format!("Avg{} Penalty", phase));
        }
        out.push('\n');

        for penalty in &penalties {
            let _ = write!(out, "{:<40}", penalty.hybrid);
            for phase in phases {
                let delta = penalty.deltas.get(phase).copied().unwrap_or(0.0);
                let _ = write!(out, " | {:>26.6}", delta);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(full_ms: u64) -> BenchmarkSample {
        let mut phases = BTreeMap::new();
        phases.insert(Phase::FullProtocol, Duration::from_millis(full_ms));
        BenchmarkSample::new(phases, true)
    }

    fn kemtls_result(kex: &str, full_ms: &[u64]) -> AlgorithmResult {
        AlgorithmResult::from_samples(
            kex,
            kex,
            HandshakeMode::Kemtls,
            Side::Client,
            full_ms.iter().map(|&ms| sample(ms)).collect(),
            &BTreeMap::new(),
        )
    }

    #[test]
    fn test_population_stdev() {
        let (mean, stdev) = mean_stdev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((stdev - 2.0).abs() < 1e-12);
        assert_eq!(mean_stdev(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_failed_samples_not_counted() {
        let mut failed = sample(100);
        failed.success = false;
        let result = AlgorithmResult::from_samples(
            "Kyber512",
            "Kyber512",
            HandshakeMode::Kemtls,
            Side::Client,
            vec![sample(2), failed, sample(4)],
            &BTreeMap::new(),
        );
        assert_eq!(result.sample_count(), 2);
        assert_eq!(result.mean(Phase::FullProtocol), Some(3.0));
        // Unreported phases are zero, and every phase in the set is present
        assert_eq!(result.mean(Phase::WriteKEMCiphertext), Some(0.0));
        assert_eq!(result.phases.len(), 5);
        assert_eq!(result.message_sizes.len(), 3);
    }

    #[test]
    fn test_phase_and_size_sets() {
        let pqtls_client = phases_for(HandshakeMode::Pqtls, Side::Client);
        assert!(!pqtls_client.contains(&Phase::WriteKEMCiphertext));
        let kemtls_server = phases_for(HandshakeMode::Kemtls, Side::Server);
        assert!(kemtls_server.contains(&Phase::ReadKEMCiphertext));
        let classic_server = phases_for(HandshakeMode::Classic, Side::Server);
        assert!(classic_server.contains(&Phase::WriteCertificateVerify));

        let ciphertext = HandshakeMessage::ServerKEMCiphertext;
        assert!(message_sizes_for(HandshakeMode::Kemtls, Side::Server).contains(&ciphertext));
        assert!(!message_sizes_for(HandshakeMode::Pqtls, Side::Server).contains(&ciphertext));
    }

    #[test]
    fn test_hybrid_penalty_pairs() {
        let results = vec![
            kemtls_result("Kyber512", &[10]),
            kemtls_result("P256_Kyber512", &[13]),
            kemtls_result("LightSaber_KEM", &[8]),
            kemtls_result("Saber_KEM", &[9]),
            kemtls_result("P256_LightSaber_KEM", &[12]),
            kemtls_result("P384_Saber_KEM", &[15]),
        ];
        let penalties = hybrid_penalties(&results);
        let pairs: Vec<(&str, &str)> = penalties
            .iter()
            .map(|p| (p.hybrid.as_str(), p.baseline.as_str()))
            .collect();

        assert_eq!(
            pairs,
            [
                ("P256_Kyber512", "Kyber512"),
                ("P256_LightSaber_KEM", "LightSaber_KEM"),
                ("P384_Saber_KEM", "Saber_KEM"),
            ]
        );
        assert!((penalties[0].deltas[&Phase::FullProtocol] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_tables() {
        let mut stats = StatisticsAggregator::new(HandshakeMode::Kemtls, Side::Client);
        stats.push(kemtls_result("Kyber768", &[5, 7]));
        stats.push(kemtls_result("P384_Kyber768", &[8, 8]));

        let table = stats.summary_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("TestName"));
        assert!(lines[0].contains("AvgFullProtocol"));
        assert!(lines[1].starts_with("Kyber768"));
        assert!(lines[1].contains("6.000000"));

        let json = serde_json::to_value(&stats.results()[1]).unwrap();
        assert_eq!(json["side"], "client");
        assert_eq!(json["phases"]["FullProtocol"]["mean_ms"], 8.0);

        assert!(stats.penalty_table().contains("P384_Kyber768"));
        let empty = StatisticsAggregator::new(HandshakeMode::Kemtls, Side::Client);
        assert_eq!(empty.penalty_table(), "No hybrid found in this test.\n");
    }
}
