//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Each subcommand resolves
//! the configuration it needs, runs, and writes its result to stdout.

use anyhow::{Context, Result};
use pagehits::{fingerprint_with_seed, CounterConfig, CounterOp, HitCounter};
use std::collections::BTreeMap;
use tracing::info;

use super::Cli;

fn resolve_config(cli: &Cli) -> Result<CounterConfig> {
    CounterConfig::resolve(cli.config.as_deref(), &cli.overrides())
        .context("failed to load counter configuration")
}

fn build_counter(cli: &Cli) -> Result<HitCounter> {
    Ok(HitCounter::new(resolve_config(cli)?)?)
}

// ── Offline ─────────────────────────────────────────────────────

pub fn run_hash(names: &[String], seed: u32) -> Result<()> {
    for name in names {
        println!("{}\t{}", fingerprint_with_seed(name, seed), name);
    }
    Ok(())
}

pub fn run_url(cli: &Cli, name: &str, up: bool) -> Result<()> {
    let counter = build_counter(cli)?;
    let op = if up {
        CounterOp::Increment
    } else {
        CounterOp::Read
    };
    println!("{}", counter.request_url(name, op));
    Ok(())
}

pub fn run_config(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

// ── Network ─────────────────────────────────────────────────────

pub async fn run_hit(cli: &Cli, name: &str) -> Result<()> {
    let counter = build_counter(cli)?;
    let count = counter
        .register_hit(name)
        .await
        .with_context(|| format!("count unavailable for {:?}", name))?;
    info!(page = name, count = count.get(), "Hit registered");
    println!("{}", count);
    Ok(())
}

/// Reads every page concurrently. A page whose count is unavailable prints
/// `unavailable` (JSON: `null`) and the command exits non-zero once all output
/// is written.
pub async fn run_count(cli: &Cli, names: &[String], json: bool) -> Result<()> {
    let counter = build_counter(cli)?;
    let results = counter.hit_counts(names).await;
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();

    if json {
        let map: BTreeMap<&str, Option<u64>> = results
            .iter()
            .map(|(name, r)| (name.as_str(), r.as_ref().ok().map(|c| c.get())))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        for (name, result) in &results {
            match result {
                Ok(count) => println!("{}\t{}", count, name),
                Err(_) => println!("unavailable\t{}", name),
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} counts unavailable", failed, results.len());
    }
    Ok(())
}
