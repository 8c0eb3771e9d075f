//! prominence-core: word-level prosodic prominence from speech recordings
//!
//! Given a recording and a time-aligned word transcription (a Praat TextGrid
//! tier), this library scores how acoustically salient each word is, based on
//! mid-band energy, loudness and pitch-event dynamics.
//!
//! # Core Types
//!
//! - [`Sound`] - Audio samples with sample rate
//! - [`Annotation`] / [`Tier`] / [`WordInterval`] - Time-aligned transcription
//! - [`Utterance`] - Speech run bounded by long silences
//! - [`ProminenceCurve`] - Per-frame normalized prominence of one utterance
//! - [`ProminenceScores`] - Raw and normalized score per word
//!
//! # Pipeline
//!
//! ```no_run
//! use prominence_core::{Annotation, AutocorrelationPitch, ProminenceConfig, ProminenceExtractor, Sound};
//!
//! let sound = Sound::from_file("speech.wav")?;
//! let annotation = Annotation::from_textgrid_file("speech.TextGrid")?;
//! let extractor = ProminenceExtractor::new(ProminenceConfig::default(), AutocorrelationPitch::default());
//! let scores = extractor.extract(&sound, &annotation)?;
//! for (key, score) in scores.iter() {
//!     println!("{} @ {:.3}: {:.3}", key.text, key.start, score.normalized);
//! }
//! # Ok::<(), prominence_core::ProminenceError>(())
//! ```

pub mod annotation;
pub mod batch;
pub mod config;
pub mod events;
pub mod features;
pub mod filter;
pub mod interpolation;
pub mod pitch;
pub mod prominence;
pub mod report;
pub mod segment;
pub mod sound;

pub mod utils;

// Re-export main types at crate root
pub use annotation::{Annotation, Tier, WordInterval};
pub use batch::{run_batch, BatchSummary};
pub use config::ProminenceConfig;
pub use events::{compute_event_params, EventParams};
pub use features::{extract_prosodic_features, Extraction, FrameFeatures, ProminenceCurve};
pub use filter::{bandpass_filter, BandPass};
pub use pitch::{AutocorrelationPitch, PitchContour, PitchTracker};
pub use prominence::{ProminenceExtractor, ProminenceScores, WordKey, WordScore};
pub use report::write_prominence_table;
pub use segment::{segment_utterances, Utterance};
pub use sound::Sound;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while extracting prominence
#[derive(Error, Debug)]
pub enum ProminenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV decoding error: {0}")]
    WavDecode(#[from] hound::Error),

    #[error("Audio decoding error: {0}")]
    Decode(String),

    #[error("Failed to read TextGrid '{}': {message}", path.display())]
    TextGrid { path: PathBuf, message: String },

    #[error("No tier named '{tier}' found")]
    TierNotFound { tier: String },

    #[error("Invalid band [{low}, {high}] Hz: bounds must satisfy 0 < low < high < {nyquist} Hz")]
    InvalidBand { low: f64, high: f64, nyquist: f64 },

    #[error("Pitch analysis failed: {0}")]
    PitchAnalysis(String),

    #[error("Feature arrays are empty (segment shorter than one frame)")]
    EmptyFeatures,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid config file '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ProminenceError>;

/// Min-max normalization floor, keeps constant signals finite
pub const NORMALIZATION_EPSILON: f64 = 1e-8;

/// Min-max normalize values into [0, 1] using `(x - min) / (max - min + ε)`
///
/// Returns an empty vector for empty input. A constant input maps to all zeros.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let denominator = max - min + NORMALIZATION_EPSILON;
    values.iter().map(|&v| (v - min) / denominator).collect()
}
