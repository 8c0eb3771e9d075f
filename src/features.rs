//! Frame-level prosodic features and the prominence curve of one utterance
//!
//! Audio is cut into non-overlapping 20 ms frames. Each frame gets its
//! wideband RMS energy, the RMS of a 300-2200 Hz band-limited copy and a
//! pitch value carried over from the pitch contour. Pitch movement is turned
//! into rise/fall events, and the per-frame prominence is
//!
//! ```text
//! prominence = λ·mid_energy + β·(rms_energy · pitch_amplitude · pitch_duration)
//! ```
//!
//! min-max normalized over the utterance.

use crate::events::{compute_event_params, EventParams};
use crate::filter::bandpass_filter;
use crate::interpolation::{block_means, interp_linear, linspace};
use crate::pitch::PitchTracker;
use crate::sound::rms;
use crate::{min_max_normalize, ProminenceError, Result, Sound};

/// Analysis frame length in seconds
pub const FRAME_DURATION: f64 = 0.02;

/// Pitch contour time step in seconds
pub const PITCH_TIME_STEP: f64 = 0.01;

/// Lowest pitch floor in Hz; raised to `1 / duration` for very short utterances
pub const PITCH_FLOOR: f64 = 75.0;

/// Pitch ceiling in Hz
pub const PITCH_CEILING: f64 = 500.0;

/// Lower edge of the mid-frequency band in Hz
pub const MID_BAND_LOW: f64 = 300.0;

/// Upper edge of the mid-frequency band in Hz
pub const MID_BAND_HIGH: f64 = 2200.0;

/// Per-frame feature arrays of one utterance, all of equal length
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFeatures {
    /// RMS of the mid-band filtered signal
    pub mid_energy: Vec<f64>,
    /// Wideband RMS
    pub rms_energy: Vec<f64>,
    /// Pitch carried onto the frame grid (0 where unvoiced)
    pub pitch_per_frame: Vec<f64>,
    pub pitch_events: EventParams,
    /// Computed for inspection; not part of the prominence formula
    pub mid_events: EventParams,
}

impl FrameFeatures {
    /// Compute the aligned feature arrays for a mono buffer
    ///
    /// Fails with [`ProminenceError::EmptyFeatures`] when no complete frame
    /// fits, [`ProminenceError::PitchAnalysis`] when the pitch tracker rejects
    /// the buffer, and [`ProminenceError::InvalidBand`] when the sample rate is
    /// too low for the mid band.
    pub fn compute<T: PitchTracker + ?Sized>(
        samples: &[f64],
        sample_rate: f64,
        tracker: &T,
    ) -> Result<Self> {
        let frame_len = (FRAME_DURATION * sample_rate).floor() as usize;
        if frame_len == 0 || samples.len() < frame_len {
            return Err(ProminenceError::EmptyFeatures);
        }
        let duration = samples.len() as f64 / sample_rate;

        let rms_energy = frame_rms(samples, frame_len);
        let mid_band = bandpass_filter(samples, sample_rate, MID_BAND_LOW, MID_BAND_HIGH)?;
        let mid_energy = frame_rms(&mid_band, frame_len);

        let sound = Sound::from_samples(samples, sample_rate);
        let pitch_floor = PITCH_FLOOR.max(1.0 / duration);
        let contour = tracker.track(&sound, PITCH_TIME_STEP, pitch_floor, PITCH_CEILING)?;
        let pitch = contour.frequencies_or_zero();

        // Pitch samples are spread evenly over the utterance, then moved onto
        // as many points as there are energy frames
        let pitch_times = linspace(0.0, duration, pitch.len(), true);
        let frame_times = linspace(0.0, duration, mid_energy.len(), true);
        let resampled = interp_linear(&frame_times, &pitch_times, &pitch).ok_or_else(|| {
            ProminenceError::PitchAnalysis("pitch tracker returned an empty contour".to_string())
        })?;

        let pitch_per_frame = if resampled.len() < frame_len {
            vec![0.0; mid_energy.len()]
        } else {
            block_means(&resampled, frame_len)
        };

        let pitch_events = compute_event_params(&pitch_per_frame, FRAME_DURATION);
        let mid_events = compute_event_params(&mid_energy, FRAME_DURATION);

        let mut features = Self {
            mid_energy,
            rms_energy,
            pitch_per_frame,
            pitch_events,
            mid_events,
        };
        features.truncate_to_common_length();
        Ok(features)
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.mid_energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mid_energy.is_empty()
    }

    /// Un-normalized prominence per frame
    pub fn raw_prominence(&self, lambda: f64, beta: f64) -> Vec<f64> {
        (0..self.len())
            .map(|i| {
                let dynamics = self.rms_energy[i]
                    * self.pitch_events.amplitude[i]
                    * self.pitch_events.duration[i];
                lambda * self.mid_energy[i] + beta * dynamics
            })
            .collect()
    }

    fn truncate_to_common_length(&mut self) {
        let len = [
            self.mid_energy.len(),
            self.rms_energy.len(),
            self.pitch_per_frame.len(),
            self.pitch_events.len(),
            self.mid_events.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0);

        self.mid_energy.truncate(len);
        self.rms_energy.truncate(len);
        self.pitch_per_frame.truncate(len);
        for events in [&mut self.pitch_events, &mut self.mid_events] {
            events.amplitude.truncate(len);
            events.duration.truncate(len);
        }
    }
}

/// Normalized prominence per frame of one utterance
#[derive(Debug, Clone, PartialEq)]
pub struct ProminenceCurve {
    /// Values in [0, 1]
    pub values: Vec<f64>,
    /// Utterance duration in seconds
    pub duration: f64,
}

impl ProminenceCurve {
    pub fn num_frames(&self) -> usize {
        self.values.len()
    }

    /// Width of one frame when the curve is laid over its utterance
    pub fn frame_width(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.duration / self.values.len() as f64
        }
    }
}

/// Outcome of analysing one utterance
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Curve(ProminenceCurve),
    /// Too short for a single frame
    Empty,
    /// The pitch tracker rejected the audio
    AnalysisFailed(String),
}

impl Extraction {
    /// Convert into a `Result`, mapping recoverable outcomes to their errors
    pub fn into_result(self) -> Result<ProminenceCurve> {
        match self {
            Extraction::Curve(curve) => Ok(curve),
            Extraction::Empty => Err(ProminenceError::EmptyFeatures),
            Extraction::AnalysisFailed(reason) => Err(ProminenceError::PitchAnalysis(reason)),
        }
    }
}

/// Compute the normalized prominence curve of one utterance's audio
///
/// Recoverable outcomes (no complete frame, pitch failure) come back as
/// [`Extraction::Empty`] / [`Extraction::AnalysisFailed`]; only configuration
/// errors such as an unusable band are returned as `Err`.
pub fn extract_prosodic_features<T: PitchTracker + ?Sized>(
    samples: &[f64],
    sample_rate: f64,
    lambda: f64,
    beta: f64,
    tracker: &T,
) -> Result<Extraction> {
    let features = match FrameFeatures::compute(samples, sample_rate, tracker) {
        Ok(features) => features,
        Err(ProminenceError::EmptyFeatures) => return Ok(Extraction::Empty),
        Err(ProminenceError::PitchAnalysis(reason)) => return Ok(Extraction::AnalysisFailed(reason)),
        Err(err) => return Err(err),
    };
    if features.is_empty() {
        return Ok(Extraction::Empty);
    }

    Ok(Extraction::Curve(ProminenceCurve {
        values: min_max_normalize(&features.raw_prominence(lambda, beta)),
        duration: samples.len() as f64 / sample_rate,
    }))
}

/// RMS of consecutive non-overlapping frames; a trailing partial frame is dropped
pub fn frame_rms(samples: &[f64], frame_len: usize) -> Vec<f64> {
    if frame_len == 0 {
        return Vec::new();
    }
    samples.chunks_exact(frame_len).map(rms).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::{AutocorrelationPitch, PitchContour};
    use approx::assert_relative_eq;

    /// Tracker that always fails, to exercise the recovery path
    struct FailingTracker;

    impl PitchTracker for FailingTracker {
        fn track(&self, _: &Sound, _: f64, _: f64, _: f64) -> Result<PitchContour> {
            Err(ProminenceError::PitchAnalysis("no pitch".to_string()))
        }
    }

    /// Tracker returning no frames at all
    struct EmptyTracker;

    impl PitchTracker for EmptyTracker {
        fn track(&self, _: &Sound, time_step: f64, _: f64, _: f64) -> Result<PitchContour> {
            Ok(PitchContour::new(Vec::new(), 0.0, time_step))
        }
    }

    #[test]
    fn test_frame_rms_drops_remainder() {
        let samples = [1.0, -1.0, 2.0, 2.0, 5.0];
        let energy = frame_rms(&samples, 2);
        assert_eq!(energy.len(), 2);
        assert_relative_eq!(energy[0], 1.0);
        assert_relative_eq!(energy[1], 2.0);
    }

    #[test]
    fn test_tone_curve() {
        let sound = Sound::create_tone(200.0, 0.5, 16000.0, 0.5, 0.0);
        let extraction = extract_prosodic_features(
            sound.samples(),
            sound.sample_rate(),
            0.5,
            0.5,
            &AutocorrelationPitch::default(),
        )
        .unwrap();

        let curve = extraction.into_result().unwrap();
        assert_eq!(curve.num_frames(), 25);
        assert_relative_eq!(curve.duration, 0.5);
        assert_relative_eq!(curve.frame_width(), 0.02);
        assert!(curve.values.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(curve.values.iter().any(|&v| v == 0.0));
    }

    #[test]
    fn test_short_pitch_series_gives_zero_pitch() {
        // 25 frames of pitch are fewer than one 320-sample averaging window
        let sound = Sound::create_tone(200.0, 0.5, 16000.0, 0.5, 0.0);
        let features =
            FrameFeatures::compute(sound.samples(), 16000.0, &AutocorrelationPitch::default())
                .unwrap();

        assert_eq!(features.len(), 25);
        assert!(features.pitch_per_frame.iter().all(|&p| p == 0.0));
        assert!(features.pitch_events.amplitude.iter().all(|&a| a == 0.0));
        assert_eq!(features.mid_events.len(), 25);
    }

    /// Contour stepping 120 Hz -> 220 Hz -> 120 Hz at 2 s and 4 s
    struct SteppedTracker;

    impl PitchTracker for SteppedTracker {
        fn track(&self, sound: &Sound, time_step: f64, _: f64, _: f64) -> Result<PitchContour> {
            let duration = sound.duration();
            let n = (duration / time_step).floor() as usize;
            let frequencies = linspace(0.0, duration, n, true)
                .into_iter()
                .map(|t| if (2.0..4.0).contains(&t) { 220.0 } else { 120.0 })
                .collect();
            Ok(PitchContour::new(frequencies, 0.0, time_step))
        }
    }

    #[test]
    fn test_long_pitch_series_is_block_averaged() {
        // 5 kHz: 100-sample frames, 6 s gives 300 frames and 3 pitch blocks
        let sound = Sound::create_tone(150.0, 6.0, 5000.0, 0.5, 0.0);
        let features = FrameFeatures::compute(sound.samples(), 5000.0, &SteppedTracker).unwrap();

        assert_eq!(features.len(), 3);
        assert_eq!(features.rms_energy.len(), 3);
        assert_eq!(features.pitch_per_frame.len(), 3);
        assert_eq!(features.pitch_events.len(), 3);
        assert_eq!(features.mid_events.len(), 3);

        let pitch = &features.pitch_per_frame;
        assert!(pitch.iter().all(|&p| p > 0.0));
        assert_relative_eq!(pitch[0], 120.0, epsilon = 1.0);
        assert_relative_eq!(pitch[1], 220.0, epsilon = 1.0);
        assert_relative_eq!(pitch[2], 120.0, epsilon = 1.0);

        let events = &features.pitch_events;
        assert_relative_eq!(events.amplitude[1], 2.0 * pitch[1] - pitch[0] - pitch[2]);
        assert_relative_eq!(events.duration[1], 2.0 * FRAME_DURATION);

        // The pitch term only enters through β
        let without_pitch = features.raw_prominence(0.5, 0.0);
        let with_pitch = features.raw_prominence(0.5, 1.0);
        assert_eq!(without_pitch[0], with_pitch[0]);
        assert_relative_eq!(
            with_pitch[1] - without_pitch[1],
            features.rms_energy[1] * events.amplitude[1] * events.duration[1],
            epsilon = 1e-12
        );

        let curve = |beta| {
            extract_prosodic_features(sound.samples(), 5000.0, 0.5, beta, &SteppedTracker)
                .unwrap()
                .into_result()
                .unwrap()
        };
        assert_ne!(curve(0.0).values, curve(1.0).values);
    }

    #[test]
    fn test_raw_prominence_formula() {
        let features = FrameFeatures {
            mid_energy: vec![0.2, 0.4, 0.1],
            rms_energy: vec![1.0, 2.0, 1.0],
            pitch_per_frame: vec![100.0, 120.0, 100.0],
            pitch_events: EventParams {
                amplitude: vec![0.0, 40.0, 0.0],
                duration: vec![0.0, 0.04, 0.0],
            },
            mid_events: EventParams {
                amplitude: vec![0.0; 3],
                duration: vec![0.0; 3],
            },
        };

        let raw = features.raw_prominence(0.5, 0.25);
        assert_relative_eq!(raw[0], 0.1);
        assert_relative_eq!(raw[1], 0.5 * 0.4 + 0.25 * 2.0 * 40.0 * 0.04);
        assert_relative_eq!(raw[2], 0.05);
    }

    #[test]
    fn test_empty_input() {
        let extraction =
            extract_prosodic_features(&[], 16000.0, 0.5, 0.5, &AutocorrelationPitch::default())
                .unwrap();
        assert_eq!(extraction, Extraction::Empty);
    }

    #[test]
    fn test_shorter_than_one_frame() {
        let sound = Sound::create_tone(200.0, 0.015, 16000.0, 0.5, 0.0);
        let extraction = extract_prosodic_features(
            sound.samples(),
            16000.0,
            0.5,
            0.5,
            &AutocorrelationPitch::default(),
        )
        .unwrap();
        assert_eq!(extraction, Extraction::Empty);
        assert!(matches!(
            extraction.into_result(),
            Err(ProminenceError::EmptyFeatures)
        ));
    }

    #[test]
    fn test_pitch_failure_is_recoverable() {
        // One frame fits, but 30 ms is shorter than the 40 ms pitch window
        let sound = Sound::create_tone(200.0, 0.03, 16000.0, 0.5, 0.0);
        let extraction = extract_prosodic_features(
            sound.samples(),
            16000.0,
            0.5,
            0.5,
            &AutocorrelationPitch::default(),
        )
        .unwrap();
        assert!(matches!(extraction, Extraction::AnalysisFailed(_)));

        let extraction =
            extract_prosodic_features(sound.samples(), 16000.0, 0.5, 0.5, &FailingTracker).unwrap();
        assert_eq!(extraction, Extraction::AnalysisFailed("no pitch".to_string()));
    }

    #[test]
    fn test_empty_contour_is_analysis_failure() {
        let sound = Sound::create_tone(200.0, 0.2, 16000.0, 0.5, 0.0);
        let extraction =
            extract_prosodic_features(sound.samples(), 16000.0, 0.5, 0.5, &EmptyTracker).unwrap();
        assert!(matches!(extraction, Extraction::AnalysisFailed(_)));
    }

    #[test]
    fn test_low_sample_rate_rejects_band() {
        let sound = Sound::create_tone(200.0, 0.5, 4000.0, 0.5, 0.0);
        let result = extract_prosodic_features(
            sound.samples(),
            4000.0,
            0.5,
            0.5,
            &AutocorrelationPitch::default(),
        );
        assert!(matches!(result, Err(ProminenceError::InvalidBand { .. })));
    }
}
