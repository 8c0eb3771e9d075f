//! Word-level prominence scoring
//!
//! [`ProminenceExtractor`] segments a word tier into utterances, computes a
//! prominence curve per utterance and sums it over the frames each word
//! overlaps. Raw sums are min-max normalized within their utterance, so
//! normalized scores are only comparable between words of the same
//! utterance.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use tracing::{debug, warn};

use crate::annotation::{Annotation, Tier};
use crate::config::ProminenceConfig;
use crate::features::{extract_prosodic_features, Extraction};
use crate::interpolation::linspace;
use crate::pitch::PitchTracker;
use crate::segment::{segment_utterances, Utterance};
use crate::{min_max_normalize, Result, Sound};

/// Identifies a scored word by its start time and trimmed label
#[derive(Debug, Clone)]
pub struct WordKey {
    pub start: f64,
    pub text: String,
}

impl WordKey {
    pub fn new(start: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            text: text.into(),
        }
    }
}

impl PartialEq for WordKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for WordKey {}

impl PartialOrd for WordKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WordKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .total_cmp(&other.start)
            .then_with(|| self.text.cmp(&other.text))
    }
}

impl Hash for WordKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start.to_bits().hash(state);
        self.text.hash(state);
    }
}

/// Prominence of one word
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordScore {
    /// Sum of the prominence curve over the word's frames
    pub raw: f64,
    /// Raw score min-max normalized within the utterance
    pub normalized: f64,
}

/// Scores of all words of a tier, ordered by start time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProminenceScores {
    scores: BTreeMap<WordKey, WordScore>,
}

impl ProminenceScores {
    /// Score of the word starting at `start` with label `text` (trimmed)
    pub fn get(&self, start: f64, text: &str) -> Option<&WordScore> {
        self.scores.get(&WordKey::new(start, text.trim()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WordKey, &WordScore)> {
        self.scores.iter()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn merge(&mut self, utterance_scores: BTreeMap<WordKey, WordScore>) {
        self.scores.extend(utterance_scores);
    }
}

impl<'a> IntoIterator for &'a ProminenceScores {
    type Item = (&'a WordKey, &'a WordScore);
    type IntoIter = std::collections::btree_map::Iter<'a, WordKey, WordScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.scores.iter()
    }
}

/// Computes per-word prominence for a sound and its word tier
#[derive(Debug, Clone)]
pub struct ProminenceExtractor<T> {
    config: ProminenceConfig,
    tracker: T,
}

impl<T: PitchTracker> ProminenceExtractor<T> {
    pub fn new(config: ProminenceConfig, tracker: T) -> Self {
        Self { config, tracker }
    }

    pub fn config(&self) -> &ProminenceConfig {
        &self.config
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Score the words of the configured tier
    ///
    /// Fails with [`crate::ProminenceError::TierNotFound`] if the annotation
    /// has no such tier. Utterances that are too short or whose pitch analysis
    /// fails are logged and contribute no words.
    pub fn extract(&self, sound: &Sound, annotation: &Annotation) -> Result<ProminenceScores> {
        let tier = annotation.tier(&self.config.tier_name)?;
        self.extract_tier(sound, tier)
    }

    /// Score the words of an already selected tier
    pub fn extract_tier(&self, sound: &Sound, tier: &Tier) -> Result<ProminenceScores> {
        let utterances = segment_utterances(&tier.intervals, self.config.utterance_threshold);
        debug!(
            "Tier '{}': {} utterance(s) at threshold {} s",
            tier.name,
            utterances.len(),
            self.config.utterance_threshold
        );

        let mut scores = ProminenceScores::default();
        for utterance in &utterances {
            scores.merge(self.score_utterance(sound, tier, utterance)?);
        }
        Ok(scores)
    }

    fn score_utterance(
        &self,
        sound: &Sound,
        tier: &Tier,
        utterance: &Utterance,
    ) -> Result<BTreeMap<WordKey, WordScore>> {
        let samples = sound.span(utterance.start, utterance.end);
        let extraction = extract_prosodic_features(
            samples,
            sound.sample_rate(),
            self.config.lambda,
            self.config.beta,
            &self.tracker,
        )?;

        let curve = match extraction {
            Extraction::Curve(curve) => curve,
            Extraction::Empty => {
                warn!(
                    "Skipping utterance {:.2}s-{:.2}s: shorter than one analysis frame",
                    utterance.start, utterance.end
                );
                return Ok(BTreeMap::new());
            }
            Extraction::AnalysisFailed(reason) => {
                warn!(
                    "Skipping utterance {:.2}s-{:.2}s: {reason}",
                    utterance.start, utterance.end
                );
                return Ok(BTreeMap::new());
            }
        };
        debug!(
            "Utterance {:.2}s-{:.2}s: {} frame(s)",
            utterance.start,
            utterance.end,
            curve.num_frames()
        );

        let mut keys = Vec::new();
        let mut raw = Vec::new();
        for word in tier.words().filter(|word| utterance.contains(word.start)) {
            match overlapping_frame_sum(&curve.values, utterance, word.start, word.end) {
                Some(score) => {
                    keys.push(WordKey::new(word.start, word.label()));
                    raw.push(score);
                }
                None => debug!("Skipping word '{}' (no overlapping frames)", word.label()),
            }
        }

        let normalized = min_max_normalize(&raw);
        Ok(keys
            .into_iter()
            .zip(raw)
            .zip(normalized)
            .map(|((key, raw), normalized)| (key, WordScore { raw, normalized }))
            .collect())
    }
}

/// Sum `values` over the frames overlapping `[word_start, word_end)`
///
/// The frames evenly tile `utterance`. A frame overlaps the word when
/// `frame_start < word_end && frame_end > word_start`. Returns `None` when no
/// frame overlaps.
pub fn overlapping_frame_sum(
    values: &[f64],
    utterance: &Utterance,
    word_start: f64,
    word_end: f64,
) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let width = utterance.duration() / values.len() as f64;
    let starts = linspace(utterance.start, utterance.end, values.len(), false);

    let mut overlapping = starts
        .iter()
        .zip(values)
        .filter(|(&start, _)| start < word_end && start + width > word_start)
        .map(|(_, &value)| value)
        .peekable();

    overlapping.peek()?;
    Some(overlapping.sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::WordInterval;
    use crate::pitch::{AutocorrelationPitch, PitchContour};
    use crate::ProminenceError;
    use approx::assert_relative_eq;

    struct FailingTracker;

    impl PitchTracker for FailingTracker {
        fn track(&self, _: &Sound, _: f64, _: f64, _: f64) -> Result<PitchContour> {
            Err(ProminenceError::PitchAnalysis("tracker offline".to_string()))
        }
    }

    fn word_tier(spans: &[(f64, f64, &str)]) -> Annotation {
        let intervals = spans
            .iter()
            .map(|&(start, end, text)| WordInterval::new(start, end, text))
            .collect();
        Annotation::from_tiers(vec![Tier::new("word", intervals)])
    }

    #[test]
    fn test_overlap_sum_exact_frames() {
        // 12 frames of 0.125 s over [1.75, 3.25); the word covers frames 2..=5
        let values: Vec<f64> = (0..12).map(|i| (1u32 << i) as f64).collect();
        let utterance = Utterance { start: 1.75, end: 3.25 };
        let sum = overlapping_frame_sum(&values, &utterance, 2.0, 2.5).unwrap();
        assert_eq!(sum, 4.0 + 8.0 + 16.0 + 32.0);
    }

    #[test]
    fn test_overlap_law() {
        let values: Vec<f64> = (0..12).map(|i| i as f64 + 1.0).collect();
        let utterance = Utterance { start: 1.8, end: 3.0 };
        let width = utterance.duration() / 12.0;

        let expected: f64 = linspace(1.8, 3.0, 12, false)
            .into_iter()
            .zip(values.iter().copied())
            .filter(|&(start, _)| start < 2.5 && start + width > 2.0)
            .map(|(_, value)| value)
            .sum();

        let sum = overlapping_frame_sum(&values, &utterance, 2.0, 2.5).unwrap();
        assert_relative_eq!(sum, expected, epsilon = 1e-12);
        assert!(sum >= 3.0 + 4.0 + 5.0 + 6.0 + 7.0);
    }

    #[test]
    fn test_no_overlap() {
        let utterance = Utterance { start: 0.0, end: 1.0 };
        assert!(overlapping_frame_sum(&[1.0; 10], &utterance, 1.5, 2.0).is_none());
        assert!(overlapping_frame_sum(&[], &utterance, 0.0, 1.0).is_none());
    }

    #[test]
    fn test_word_key_identity() {
        let mut scores = BTreeMap::new();
        scores.insert(WordKey::new(0.5, "b"), WordScore { raw: 1.0, normalized: 1.0 });
        scores.insert(WordKey::new(0.0, "a"), WordScore { raw: 0.5, normalized: 0.0 });
        let mut merged = ProminenceScores::default();
        merged.merge(scores);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get(0.5, " b ").unwrap().raw, 1.0);
        let order: Vec<&str> = merged.iter().map(|(key, _)| key.text.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_tier() {
        let sound = Sound::create_silence(1.0, 16000.0);
        let annotation = word_tier(&[(0.0, 1.0, "a")]);
        let config = ProminenceConfig {
            tier_name: "phones".to_string(),
            ..ProminenceConfig::default()
        };
        let extractor = ProminenceExtractor::new(config, AutocorrelationPitch::default());

        let result = extractor.extract(&sound, &annotation);
        assert!(matches!(result, Err(ProminenceError::TierNotFound { .. })));
    }

    #[test]
    fn test_utterance_shorter_than_a_frame() {
        let sound = Sound::create_tone(200.0, 1.0, 16000.0, 0.5, 0.0);
        let annotation = word_tier(&[(0.0, 0.01, "a"), (0.01, 1.0, "")]);
        let extractor =
            ProminenceExtractor::new(ProminenceConfig::default(), AutocorrelationPitch::default());

        let scores = extractor.extract(&sound, &annotation).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn test_failed_pitch_skips_utterance() {
        let sound = Sound::create_tone(200.0, 1.0, 16000.0, 0.5, 0.0);
        let annotation = word_tier(&[(0.0, 0.4, "a"), (0.4, 0.5, ""), (0.5, 0.9, "b")]);
        let extractor = ProminenceExtractor::new(ProminenceConfig::default(), FailingTracker);

        let scores = extractor.extract(&sound, &annotation).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn test_single_word_normalizes_to_zero() {
        let sound = Sound::create_tone(200.0, 1.0, 16000.0, 0.5, 0.0);
        let annotation = word_tier(&[(0.0, 0.5, "only"), (0.5, 1.0, "")]);
        let extractor =
            ProminenceExtractor::new(ProminenceConfig::default(), AutocorrelationPitch::default());

        let scores = extractor.extract(&sound, &annotation).unwrap();
        assert_eq!(scores.len(), 1);
        let score = scores.get(0.0, "only").unwrap();
        assert!(score.raw > 0.0);
        assert_eq!(score.normalized, 0.0);
    }
}
