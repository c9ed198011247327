//! Property tests for statistics and matrix planning

use pqbench_core::{AlgorithmCatalog, BenchmarkConfig, HandshakeMode};
use pqbench_harness::stats::mean_stdev;
use pqbench_harness::{plan_matrix, AlgorithmResult, BenchmarkSample, Phase, Side};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;

fn sample(micros: u64, success: bool) -> BenchmarkSample {
    let mut phases = BTreeMap::new();
    phases.insert(Phase::FullProtocol, Duration::from_micros(micros));
    BenchmarkSample::new(phases, success)
}

proptest! {
    #[test]
    fn mean_lies_within_range(values in prop::collection::vec(0.0f64..1e6, 1..64)) {
        let (mean, stdev) = mean_stdev(&values);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(mean >= min - 1e-6 && mean <= max + 1e-6);
        prop_assert!(stdev >= 0.0);
        prop_assert!(stdev <= (max - min) + 1e-6);
    }

    #[test]
    fn shift_moves_mean_only(
        values in prop::collection::vec(0.0f64..1e3, 1..32),
        shift in 0.0f64..1e3,
    ) {
        let shifted: Vec<f64> = values.iter().map(|v| v + shift).collect();
        let (m0, s0) = mean_stdev(&values);
        let (m1, s1) = mean_stdev(&shifted);
        prop_assert!((m1 - m0 - shift).abs() < 1e-6);
        prop_assert!((s1 - s0).abs() < 1e-6);
    }

    #[test]
    fn failed_samples_do_not_move_statistics(
        ok in prop::collection::vec(1u64..100_000, 1..20),
        failed in prop::collection::vec(1u64..100_000, 0..20),
    ) {
        let clean = AlgorithmResult::from_samples(
            "Kyber512", "Kyber512", HandshakeMode::Kemtls, Side::Client,
            ok.iter().map(|&us| sample(us, true)).collect(),
            &BTreeMap::new(),
        );
        let mixed_samples: Vec<BenchmarkSample> = ok
            .iter()
            .map(|&us| sample(us, true))
            .chain(failed.iter().map(|&us| sample(us, false)))
            .collect();
        let mixed = AlgorithmResult::from_samples(
            "Kyber512", "Kyber512", HandshakeMode::Kemtls, Side::Client,
            mixed_samples,
            &BTreeMap::new(),
        );
        prop_assert_eq!(mixed.sample_count(), ok.len());
        prop_assert_eq!(mixed.phases, clean.phases);
    }

    #[test]
    fn runnable_pairs_get_consecutive_ports(
        mask in prop::collection::vec(
            any::<bool>(),
            AlgorithmCatalog::default_pq_kex_names().len(),
        ),
        base in 1024u16..60000,
    ) {
        let names: Vec<String> = AlgorithmCatalog::default_pq_kex_names()
            .into_iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(name, _)| name.to_string())
            .collect();
        prop_assume!(!names.is_empty());

        let config = BenchmarkConfig {
            mode: HandshakeMode::Pqtls,
            base_port: base,
            kex_algorithms: Some(names),
            ..Default::default()
        };
        let plans = plan_matrix(&config).unwrap();
        let ports: Vec<u16> = plans.iter().filter_map(|p| p.port).collect();
        let expected: Vec<u16> = (0..ports.len() as u16).map(|i| base + i).collect();
        prop_assert_eq!(ports, expected);
        prop_assert!(plans.iter().all(|p| p.port.is_some() == p.is_runnable()));
    }
}
