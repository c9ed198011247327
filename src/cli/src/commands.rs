//! Subcommand implementations. Each returns the text to print.

use anyhow::{anyhow, Context, Result};
use pqbench_core::{AlgorithmCatalog, BenchmarkConfig, HandshakeMode, RootFamily, SecurityLevel};
use pqbench_harness::plan::resolve_auth;
use pqbench_harness::tls_config::leaf_key_usage;
use pqbench_harness::{plan_matrix, PairPlan};
use pqbench_pki::{Certificate, ChainAssembler, LeafRole, RootStore};
use std::fmt::Write;
use std::path::Path;
use tracing::info;

fn describe(out: &mut String, label: &str, cert: &Certificate) {
    let _ = writeln!(out, "{}:", label);
    let _ = writeln!(out, "  subject:    {}", cert.common_name());
    let _ = writeln!(out, "  algorithm:  {}", cert.public_key_algorithm());
    let _ = writeln!(out, "  serial:     {}", cert.serial_hex());
    let _ = writeln!(out, "  not before: {}", cert.not_before());
    let _ = writeln!(out, "  not after:  {}", cert.not_after());
    let _ = writeln!(out, "  ca:         {}", cert.is_ca());
    let _ = writeln!(out, "  size:       {} bytes", cert.der().len());
}

/// Generate a hybrid root CA and persist it under `dir`
pub fn gen_root(config: &BenchmarkConfig, dir: &Path, algorithm: &str) -> Result<String> {
    let store = RootStore::new(dir).with_max_line_bytes(config.max_record_line_bytes);
    let (path, certificate, _) = store
        .generate(algorithm)
        .with_context(|| format!("Failed to generate root for {}", algorithm))?;
    info!(algorithm, path = %path.display(), "Root CA generated");

    let mut out = String::new();
    let _ = writeln!(out, "wrote {}", path.display());
    describe(&mut out, "root", &certificate);
    Ok(out)
}

/// Load and check the persisted root for `family` at `level`
pub fn show_root(
    config: &BenchmarkConfig,
    dir: &Path,
    family: RootFamily,
    level: SecurityLevel,
) -> Result<String> {
    let store = RootStore::new(dir).with_max_line_bytes(config.max_record_line_bytes);
    let path = store.path_for_level(family, level)?;
    let (certificate, key) = store
        .load(family, level)
        .with_context(|| format!("Failed to load root record {}", path.display()))?;

    let mut out = String::new();
    let _ = writeln!(out, "{}", path.display());
    describe(&mut out, "root", &certificate);
    let _ = writeln!(out, "  curve:      {}", key.classical().curve());
    let _ = writeln!(out, "  pq public:  {} bytes", key.pq_public().len());
    Ok(out)
}

/// Matrix as text, one pair per line, or as JSON
pub fn plan(config: &BenchmarkConfig, json: bool) -> Result<String> {
    let plans = plan_matrix(config)?;
    if json {
        let mut text = serde_json::to_string_pretty(&plans)?;
        text.push('\n');
        return Ok(text);
    }

    let runnable = plans.iter().filter(|p| p.is_runnable()).count();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} mode: {} pairs, {} runnable, {} skipped",
        config.mode,
        plans.len(),
        runnable,
        plans.len() - runnable
    );
    for plan in &plans {
        let _ = writeln!(out, "{}", plan_line(plan));
    }
    Ok(out)
}

fn plan_line(plan: &PairPlan) -> String {
    match (&plan.skip, plan.port) {
        (Some(reason), _) => format!("  -     {:<48} skipped: {}", plan.to_string(), reason),
        (None, Some(port)) => format!("  {:<5} {}", port, plan),
        (None, None) => format!("  ?     {}", plan),
    }
}

/// Authentication algorithm exercised by `check-chain` at `level`
fn default_auth(mode: HandshakeMode, level: SecurityLevel) -> Result<&'static str> {
    let names = match mode {
        HandshakeMode::Kemtls => AlgorithmCatalog::default_pq_kex_names(),
        HandshakeMode::Pqtls => AlgorithmCatalog::default_pq_auth_names(),
        HandshakeMode::Classic => AlgorithmCatalog::default_classical_names(),
    };
    names
        .into_iter()
        .find(|name| AlgorithmCatalog::security_level_of(name).ok() == Some(level))
        .ok_or_else(|| anyhow!("no {} algorithm at level {}", mode, level))
}

/// Build a chain at `level`, issue a server leaf under it and validate the path
pub fn check_chain(config: &BenchmarkConfig, level: SecurityLevel) -> Result<String> {
    let name = default_auth(config.mode, level)?;
    let auth = resolve_auth(config.mode, name)?;

    let chain = ChainAssembler::new(config)
        .build_chain(level)
        .with_context(|| format!("Failed to build level {} chain", level))?;
    let credential = chain.issue_leaf(
        auth,
        LeafRole::Server,
        leaf_key_usage(config.mode),
        &config.server_host,
    )?;
    chain
        .verify_leaf(&credential.leaf)
        .with_context(|| format!("Path validation failed for {}", name))?;

    let mut out = String::new();
    describe(&mut out, "root", chain.root());
    describe(&mut out, "intermediate", chain.intermediate());
    describe(&mut out, "leaf", &credential.leaf);
    let _ = writeln!(out, "chain ok: {} at level {}", name, level);
    Ok(out)
}
