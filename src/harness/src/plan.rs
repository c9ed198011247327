//! Algorithm matrix planning
//!
//! Client and server derive the same plan from the same configuration, so a
//! pair's port is a pure function of its position among the runnable pairs.

use crate::error::Result;
use pqbench_core::{
    AlgorithmCatalog, AlgorithmId, BenchmarkConfig, CoreError, HandshakeMode, KeyExchangeId,
    SecurityLevel,
};
use serde::Serialize;
use std::fmt;

/// Why a pair is not benchmarked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    LevelMismatch {
        kex_level: SecurityLevel,
        auth_level: SecurityLevel,
    },
    NotHybrid { name: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::LevelMismatch { kex_level, auth_level } => {
                write!(f, "level {} KEX with level {} authentication", kex_level, auth_level)
            }
            SkipReason::NotHybrid { name } => write!(f, "{} is not a hybrid algorithm", name),
        }
    }
}

/// One (KEX, Auth) cell of the matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairPlan {
    pub kex: String,
    pub auth: String,
    pub kex_level: SecurityLevel,
    pub auth_level: SecurityLevel,
    /// Listening port; `None` for skipped pairs
    pub port: Option<u16>,
    pub skip: Option<SkipReason>,
}

impl PairPlan {
    pub fn is_runnable(&self) -> bool {
        self.skip.is_none()
    }

    /// Typed identifiers for the pair under `mode`
    pub fn algorithms(&self, mode: HandshakeMode) -> Result<(KeyExchangeId, AlgorithmId)> {
        let kex = match AlgorithmCatalog::resolve_key_exchange(&self.kex)?.id {
            AlgorithmId::KeyExchange(id) => id,
            other => return Err(CoreError::UnknownKeyExchange(other.name()).into()),
        };
        Ok((kex, resolve_auth(mode, &self.auth)?))
    }
}

impl fmt::Display for PairPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.kex, self.auth)
    }
}

/// Authentication algorithm identifier for `name` in `mode`
pub fn resolve_auth(mode: HandshakeMode, name: &str) -> Result<AlgorithmId> {
    let desc = match mode {
        HandshakeMode::Kemtls => AlgorithmCatalog::resolve_key_exchange(name)?,
        HandshakeMode::Pqtls => AlgorithmCatalog::resolve_signature(name)?,
        HandshakeMode::Classic => AlgorithmCatalog::resolve_classical(name)?,
    };
    Ok(desc.id)
}

fn has_curve(name: &str) -> bool {
    ["P256", "P384", "P521"].iter().any(|c| name.contains(c))
}

/// Classify one pair without assigning a port
pub fn plan_pair(mode: HandshakeMode, kex: &str, auth: &str) -> Result<PairPlan> {
    let kex_level = AlgorithmCatalog::security_level_of(kex)?;
    let auth_level = AlgorithmCatalog::security_level_of(auth)?;

    let skip = match mode {
        HandshakeMode::Kemtls => None,
        _ if kex_level != auth_level => Some(SkipReason::LevelMismatch {
            kex_level,
            auth_level,
        }),
        HandshakeMode::Pqtls if !has_curve(kex) => Some(SkipReason::NotHybrid {
            name: kex.to_string(),
        }),
        HandshakeMode::Pqtls if !has_curve(auth) => Some(SkipReason::NotHybrid {
            name: auth.to_string(),
        }),
        _ => None,
    };

    Ok(PairPlan {
        kex: kex.to_string(),
        auth: auth.to_string(),
        kex_level,
        auth_level,
        port: None,
        skip,
    })
}

/// Full matrix in iteration order.
///
/// KEMTLS has one pair per KEX name (authenticated by the KEX algorithm);
/// the other modes iterate Auth in the outer loop and KEX in the inner.
/// Runnable pairs get consecutive ports from `base_port`; with `base_port`
/// 0 every runnable pair gets port 0 and the OS picks.
pub fn plan_matrix(config: &BenchmarkConfig) -> Result<Vec<PairPlan>> {
    let kex_names = config.kex_names();
    let mut plans = Vec::new();

    match config.mode {
        HandshakeMode::Kemtls => {
            for kex in &kex_names {
                plans.push(plan_pair(config.mode, kex, kex)?);
            }
        }
        HandshakeMode::Pqtls | HandshakeMode::Classic => {
            for auth in config.auth_names() {
                for kex in &kex_names {
                    plans.push(plan_pair(config.mode, kex, &auth)?);
                }
            }
        }
    }

    let mut next = 0u16;
    for plan in plans.iter_mut().filter(|p| p.is_runnable()) {
        let port = match config.base_port {
            0 => 0,
            base => base.checked_add(next).ok_or_else(|| {
                CoreError::configuration(format!("port range from {} overflows at {}", base, plan))
            })?,
        };
        plan.port = Some(port);
        next += 1;
    }

    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kemtls_pairs_authenticate_with_kex() {
        let config = BenchmarkConfig::default();
        let plans = plan_matrix(&config).unwrap();

        assert_eq!(plans.len(), AlgorithmCatalog::default_pq_kex_names().len());
        assert!(plans.iter().all(|p| p.kex == p.auth && p.is_runnable()));
        assert_eq!(plans[0].port, Some(4433));
        assert_eq!(plans.last().unwrap().port, Some(4433 + plans.len() as u16 - 1));
    }

    #[test]
    fn test_pqtls_filters_levels_and_non_hybrids() {
        let config = BenchmarkConfig {
            mode: HandshakeMode::Pqtls,
            kex_algorithms: Some(vec![
                "Kyber512".into(),
                "P256_Kyber512".into(),
                "P384_Kyber768".into(),
            ]),
            auth_algorithms: Some(vec!["P256_Dilithium2".into(), "P384_Dilithium3".into()]),
            ..Default::default()
        };
        let plans = plan_matrix(&config).unwrap();
        assert_eq!(plans.len(), 6);

        let runnable: Vec<(&str, &str, Option<u16>)> = plans
            .iter()
            .filter(|p| p.is_runnable())
            .map(|p| (p.kex.as_str(), p.auth.as_str(), p.port))
            .collect();
        assert_eq!(
            runnable,
            [
                ("P256_Kyber512", "P256_Dilithium2", Some(4433)),
                ("P384_Kyber768", "P384_Dilithium3", Some(4434)),
            ]
        );

        assert_eq!(
            plans[0].skip,
            Some(SkipReason::NotHybrid {
                name: "Kyber512".into()
            })
        );
        assert!(matches!(plans[2].skip, Some(SkipReason::LevelMismatch { .. })));
    }

    #[test]
    fn test_classic_matrix() {
        let config = BenchmarkConfig {
            mode: HandshakeMode::Classic,
            ..Default::default()
        };
        let plans = plan_matrix(&config).unwrap();
        assert_eq!(plans.len(), 9);
        let runnable: Vec<_> = plans.iter().filter(|p| p.is_runnable()).collect();
        assert_eq!(runnable.len(), 3);
        assert!(runnable.iter().all(|p| p.kex == p.auth));
    }

    #[test]
    fn test_ephemeral_ports() {
        let config = BenchmarkConfig {
            base_port: 0,
            ..Default::default()
        };
        let plans = plan_matrix(&config).unwrap();
        assert!(plans.iter().all(|p| p.port == Some(0)));
    }

    #[test]
    fn test_port_overflow_is_configuration_error() {
        let config = BenchmarkConfig {
            base_port: u16::MAX,
            ..Default::default()
        };
        assert!(plan_matrix(&config).is_err());
    }
}
