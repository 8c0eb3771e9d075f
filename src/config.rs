//! Run configuration: tier name, utterance threshold and formula weights
//!
//! Loaded from JSON with per-field defaults; the CLI layers its flags on top.

use std::path::Path;

use crate::{ProminenceError, Result};

/// Caller-supplied settings of one prominence run
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProminenceConfig {
    /// Name of the word tier (matched case-insensitively)
    #[serde(default = "default_tier_name")]
    pub tier_name: String,
    /// Silences ending more than this many seconds after the last word split utterances
    #[serde(default = "default_utterance_threshold")]
    pub utterance_threshold: f64,
    /// Weight of mid-band energy
    #[serde(default = "default_weight")]
    pub lambda: f64,
    /// Weight of pitch dynamics
    #[serde(default = "default_weight")]
    pub beta: f64,
}

impl ProminenceConfig {
    pub const DEFAULT_TIER_NAME: &'static str = "word";
    pub const DEFAULT_UTTERANCE_THRESHOLD: f64 = 0.3;
    pub const DEFAULT_WEIGHT: f64 = 0.5;

    /// Read a JSON config; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data).map_err(|source| ProminenceError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject empty tier names and negative or non-finite numbers
    pub fn validate(&self) -> Result<()> {
        if self.tier_name.trim().is_empty() {
            return Err(ProminenceError::InvalidParameter(
                "tier name must not be empty".to_string(),
            ));
        }
        for (name, value) in [
            ("utterance threshold", self.utterance_threshold),
            ("lambda", self.lambda),
            ("beta", self.beta),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ProminenceError::InvalidParameter(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ProminenceConfig {
    fn default() -> Self {
        Self {
            tier_name: default_tier_name(),
            utterance_threshold: default_utterance_threshold(),
            lambda: default_weight(),
            beta: default_weight(),
        }
    }
}

fn default_tier_name() -> String {
    ProminenceConfig::DEFAULT_TIER_NAME.to_string()
}
fn default_utterance_threshold() -> f64 {
    ProminenceConfig::DEFAULT_UTTERANCE_THRESHOLD
}
fn default_weight() -> f64 {
    ProminenceConfig::DEFAULT_WEIGHT
}
