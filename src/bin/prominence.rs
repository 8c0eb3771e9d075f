//! Batch prominence extraction over a directory of recordings and TextGrids

use std::path::PathBuf;

use clap::Parser;
use prominence_core::{run_batch, AutocorrelationPitch, ProminenceConfig, ProminenceError};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "prominence",
    about = "Batch extract word prominence from audio/TextGrid pairs"
)]
struct Args {
    /// Directory searched recursively for .TextGrid files with sibling audio
    #[arg(long)]
    data_dir: PathBuf,
    /// JSON config supplying defaults for the options below
    #[arg(long)]
    config: Option<PathBuf>,
    /// Tier holding the word intervals
    #[arg(long)]
    tier: Option<String>,
    /// Silence (seconds) that splits utterances
    #[arg(long)]
    utt_threshold: Option<f64>,
    /// Weight of mid-band energy
    #[arg(long)]
    lambda: Option<f64>,
    /// Weight of pitch dynamics
    #[arg(long)]
    beta: Option<f64>,
    /// Directory receiving one table per recording
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
}

impl Args {
    /// File config (or defaults), with explicit flags taking precedence
    fn resolve_config(&self) -> Result<ProminenceConfig, ProminenceError> {
        let mut config = match &self.config {
            Some(path) => ProminenceConfig::from_json_file(path)?,
            None => ProminenceConfig::default(),
        };
        if let Some(tier) = &self.tier {
            config.tier_name = tier.clone();
        }
        if let Some(threshold) = self.utt_threshold {
            config.utterance_threshold = threshold;
        }
        if let Some(lambda) = self.lambda {
            config.lambda = lambda;
        }
        if let Some(beta) = self.beta {
            config.beta = beta;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run() {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ProminenceError> {
    let args = Args::parse();
    let config = args.resolve_config()?;
    run_batch(
        &args.data_dir,
        &args.output_dir,
        &config,
        AutocorrelationPitch::default(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "prominence",
            "--data-dir",
            "corpus",
            "--tier",
            "Words",
            "--utt-threshold",
            "0.2",
        ]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.tier_name, "Words");
        assert_eq!(config.utterance_threshold, 0.2);
        assert_eq!(config.lambda, 0.5);
        assert_eq!(args.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let args = Args::parse_from(["prominence", "--data-dir", "corpus", "--beta=-1"]);
        assert!(args.resolve_config().is_err());
    }
}
