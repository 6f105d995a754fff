//! Synthetic e-commerce funnel dataset generator.
//!
//! Fabricates users and sessions, walks each session through
//! Browse → Add to Cart → Checkout → Purchase with a fixed pass probability
//! per stage, and writes one CSV row per reached stage. A funnel summary is
//! printed as JSON on stdout.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use chrono::{NaiveDateTime, SubsecRound, Utc};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod funnel;
mod generator;
mod model;
mod output;
mod summary;

use config::Config;
use funnel::SessionSimulator;

// ════════════════════════════════════════════════════════════════════════════
// CLI
// ════════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(name = "funnel-gen", version)]
#[command(about = "Generate a synthetic e-commerce clickstream funnel dataset")]
struct Args {
    /// Load config from a JSON file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of users (default: 10000)
    #[arg(long)]
    users: Option<usize>,

    /// RNG seed for a reproducible dataset
    #[arg(long)]
    seed: Option<u64>,

    /// End of the 30-day timestamp window, e.g. "2024-06-01 12:00:00"
    #[arg(long, value_parser = config::parse_anchor)]
    anchor: Option<NaiveDateTime>,

    /// Output CSV path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also write the summary JSON to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Do not print the summary on stdout
    #[arg(long, short)]
    quiet: bool,
}

impl Args {
    fn to_config(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(users) = self.users {
            cfg.users = users;
        }
        if let Some(seed) = self.seed {
            cfg.seed = Some(seed);
        }
        if let Some(anchor) = self.anchor {
            cfg.anchor = Some(anchor);
        }
        if let Some(out) = &self.out {
            cfg.out = out.clone();
        }
        if let Some(summary) = &self.summary {
            cfg.summary = Some(summary.clone());
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Run
// ════════════════════════════════════════════════════════════════════════════

fn run(cfg: &Config, quiet: bool) -> Result<()> {
    let start = Instant::now();

    let seed = cfg.seed.unwrap_or_else(rand::random);
    let anchor = cfg
        .anchor
        .unwrap_or_else(|| Utc::now().naive_utc().trunc_subsecs(0));
    let sim = SessionSimulator::new(anchor);

    info!(
        users = cfg.users,
        seed,
        anchor = %sim.anchor(),
        out = %cfg.out.display(),
        "generating funnel dataset"
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let dataset = generator::generate(cfg.users, &sim, &mut rng);

    output::write_csv(&cfg.out, &dataset.rows)?;
    info!(
        sessions = dataset.sessions,
        purchases = dataset.purchases,
        rows = dataset.rows.len(),
        elapsed_s = start.elapsed().as_secs_f64(),
        path = %cfg.out.display(),
        "Dataset generated successfully"
    );

    let summary = summary::aggregate(&dataset);
    if let Some(path) = &cfg.summary {
        output::write_summary(path, &summary)?;
        info!(path = %path.display(), "summary written");
    }
    if !quiet {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Main
// ════════════════════════════════════════════════════════════════════════════

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("funnel_gen=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let args = Args::parse();
    let cfg = args.to_config()?;
    run(&cfg, args.quiet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_defaults() {
        let args = Args::parse_from([
            "funnel-gen",
            "--users",
            "12",
            "--seed",
            "5",
            "--anchor",
            "2024-06-01 12:00:00",
            "--out",
            "data/out.csv",
        ]);
        let cfg = args.to_config().unwrap();
        assert_eq!(cfg.users, 12);
        assert_eq!(cfg.seed, Some(5));
        assert_eq!(cfg.anchor, config::parse_anchor("2024-06-01T12:00:00").ok());
        assert_eq!(cfg.out, PathBuf::from("data/out.csv"));
        assert!(cfg.summary.is_none());
    }

    #[test]
    fn flags_win_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{ "users": 30, "seed": 1, "summary": "s.json" }"#).unwrap();

        let args = Args::parse_from([
            "funnel-gen",
            "--config",
            path.to_str().unwrap(),
            "--seed",
            "2",
        ]);
        let cfg = args.to_config().unwrap();
        assert_eq!(cfg.users, 30);
        assert_eq!(cfg.seed, Some(2));
        assert_eq!(cfg.summary, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn zero_users_rejected() {
        let args = Args::parse_from(["funnel-gen", "--users", "0"]);
        assert!(args.to_config().is_err());
    }

    #[test]
    fn huge_user_count_rejected_before_generation() {
        let args = Args::parse_from(["funnel-gen", "--users", "18446744073709551615"]);
        let err = args.to_config().unwrap_err();
        assert!(err.to_string().contains("users must be at most"));
    }

    #[test]
    fn bad_anchor_rejected_by_parser() {
        assert!(Args::try_parse_from(["funnel-gen", "--anchor", "soon"]).is_err());
    }

    #[test]
    fn run_writes_csv_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            users: 20,
            seed: Some(3),
            anchor: config::parse_anchor("2024-06-01 12:00:00").ok(),
            out: dir.path().join("funnel.csv"),
            summary: Some(dir.path().join("summary.json")),
        };
        run(&cfg, true).unwrap();
        assert!(cfg.out.exists());
        assert!(dir.path().join("summary.json").exists());
    }
}
