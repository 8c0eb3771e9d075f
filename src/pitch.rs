//! Pitch (F0) tracking
//!
//! The prominence pipeline only needs a pitch contour sampled at a fixed time
//! step; how that contour is estimated sits behind the [`PitchTracker`] trait.
//! The default implementation, [`AutocorrelationPitch`], follows Boersma's
//! (1993) short-term autocorrelation method as used by Praat: Hanning-windowed
//! frames, autocorrelation normalized by the window's own autocorrelation,
//! peak candidates refined by parabolic interpolation, and a Viterbi pass that
//! trades candidate strength against octave jumps and voicing changes.

use crate::utils::Fft;
use crate::{ProminenceError, Result, Sound};

/// Default maximum number of candidates per frame (including the unvoiced one)
pub const DEFAULT_MAX_CANDIDATES: usize = 15;

/// Fundamental frequency sampled at a fixed time step
///
/// Unvoiced frames hold `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchContour {
    frequencies: Vec<f64>,
    /// Time of the first frame centre
    start_time: f64,
    time_step: f64,
}

impl PitchContour {
    /// Create a contour from per-frame frequencies (0 or NaN for unvoiced)
    pub fn new(frequencies: Vec<f64>, start_time: f64, time_step: f64) -> Self {
        Self {
            frequencies,
            start_time,
            time_step,
        }
    }

    /// Raw per-frame values
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Per-frame frequencies with undefined (NaN) and unvoiced frames as 0
    pub fn frequencies_or_zero(&self) -> Vec<f64> {
        self.frequencies
            .iter()
            .map(|&f| if f.is_finite() && f > 0.0 { f } else { 0.0 })
            .collect()
    }

    /// Number of frames
    pub fn num_frames(&self) -> usize {
        self.frequencies.len()
    }

    /// True when the contour has no frames at all
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Time of the first frame centre
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Time between frames
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Time of a frame centre
    pub fn time_of_frame(&self, frame: usize) -> f64 {
        self.start_time + frame as f64 * self.time_step
    }

    /// Frequency at a frame, `None` if unvoiced or out of range
    pub fn value_at_frame(&self, frame: usize) -> Option<f64> {
        self.frequencies
            .get(frame)
            .copied()
            .filter(|f| f.is_finite() && *f > 0.0)
    }

    /// Count voiced frames
    pub fn count_voiced(&self) -> usize {
        (0..self.num_frames())
            .filter(|&i| self.value_at_frame(i).is_some())
            .count()
    }

    /// Mean frequency over voiced frames
    pub fn mean(&self) -> Option<f64> {
        let voiced: Vec<f64> = (0..self.num_frames())
            .filter_map(|i| self.value_at_frame(i))
            .collect();
        if voiced.is_empty() {
            None
        } else {
            Some(voiced.iter().sum::<f64>() / voiced.len() as f64)
        }
    }
}

/// Source of pitch contours
///
/// Implementations may reject degenerate input (too short, invalid range);
/// such failures are reported as [`ProminenceError::PitchAnalysis`] and the
/// prominence pipeline skips the affected utterance.
pub trait PitchTracker {
    /// Estimate F0 every `time_step` seconds within `[pitch_floor, pitch_ceiling]` Hz
    fn track(
        &self,
        sound: &Sound,
        time_step: f64,
        pitch_floor: f64,
        pitch_ceiling: f64,
    ) -> Result<PitchContour>;
}

impl<T: PitchTracker + ?Sized> PitchTracker for &T {
    fn track(
        &self,
        sound: &Sound,
        time_step: f64,
        pitch_floor: f64,
        pitch_ceiling: f64,
    ) -> Result<PitchContour> {
        (**self).track(sound, time_step, pitch_floor, pitch_ceiling)
    }
}

/// Autocorrelation pitch tracker with Praat's default costs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutocorrelationPitch {
    pub max_candidates: usize,
    pub silence_threshold: f64,
    pub voicing_threshold: f64,
    pub octave_cost: f64,
    pub octave_jump_cost: f64,
    pub voiced_unvoiced_cost: f64,
    pub periods_per_window: f64,
}

impl Default for AutocorrelationPitch {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            silence_threshold: 0.03,
            voicing_threshold: 0.45,
            octave_cost: 0.01,
            octave_jump_cost: 0.35,
            voiced_unvoiced_cost: 0.14,
            periods_per_window: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    /// 0.0 for the unvoiced candidate
    frequency: f64,
    strength: f64,
}

#[derive(Debug, Clone)]
struct Frame {
    /// Index 0 is always the unvoiced candidate
    candidates: Vec<Candidate>,
    /// Local peak relative to the global peak, in [0, 1]
    intensity: f64,
}

impl PitchTracker for AutocorrelationPitch {
    fn track(
        &self,
        sound: &Sound,
        time_step: f64,
        pitch_floor: f64,
        pitch_ceiling: f64,
    ) -> Result<PitchContour> {
        let sample_rate = sound.sample_rate();
        if !(time_step.is_finite() && time_step > 0.0) {
            return Err(ProminenceError::PitchAnalysis(format!(
                "time step must be positive, got {}",
                time_step
            )));
        }
        if !(pitch_floor.is_finite() && pitch_floor > 0.0) {
            return Err(ProminenceError::PitchAnalysis(format!(
                "pitch floor must be positive, got {}",
                pitch_floor
            )));
        }
        let pitch_ceiling = pitch_ceiling.min(0.5 * sample_rate);
        if pitch_ceiling <= pitch_floor {
            return Err(ProminenceError::PitchAnalysis(format!(
                "pitch ceiling ({:.1} Hz) must exceed pitch floor ({:.1} Hz)",
                pitch_ceiling, pitch_floor
            )));
        }

        let duration = sound.duration();
        let window_duration = self.periods_per_window / pitch_floor;
        if duration < window_duration {
            return Err(ProminenceError::PitchAnalysis(format!(
                "sound of {:.3} s is shorter than the {:.3} s analysis window",
                duration, window_duration
            )));
        }

        let half_window = ((window_duration * sample_rate).floor() as usize / 2).saturating_sub(1);
        if half_window < 2 {
            return Err(ProminenceError::PitchAnalysis(
                "analysis window spans too few samples".to_string(),
            ));
        }

        // Frames are centred on the sound (Praat's short-term analysis layout)
        let num_frames = ((duration - window_duration) / time_step).floor() as usize + 1;
        let first_time = 0.5 * duration - 0.5 * num_frames as f64 * time_step + 0.5 * time_step;

        let samples = sound.samples();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let global_peak = samples
            .iter()
            .map(|&s| (s - mean).abs())
            .fold(0.0, f64::max);
        if global_peak == 0.0 {
            return Ok(PitchContour::new(vec![0.0; num_frames], first_time, time_step));
        }

        let mut fft = Fft::new();
        let analysis = FrameAnalysis::new(
            self,
            sample_rate,
            pitch_floor,
            pitch_ceiling,
            half_window,
            global_peak,
            &mut fft,
        );

        let frames: Vec<Frame> = (0..num_frames)
            .map(|i| analysis.analyze(samples, first_time + i as f64 * time_step, &mut fft))
            .collect();

        let path = self.find_path(&frames, pitch_ceiling, time_step);
        let frequencies = frames
            .iter()
            .zip(path)
            .map(|(frame, winner)| frame.candidates[winner].frequency)
            .collect();

        Ok(PitchContour::new(frequencies, first_time, time_step))
    }
}

impl AutocorrelationPitch {
    /// Viterbi search for the cheapest candidate path; returns one index per frame
    fn find_path(&self, frames: &[Frame], pitch_ceiling: f64, time_step: f64) -> Vec<usize> {
        if frames.is_empty() {
            return Vec::new();
        }

        // Costs are specified per 10 ms step
        let correction = 0.01 / time_step;
        let octave_jump_cost = self.octave_jump_cost * correction;
        let voiced_unvoiced_cost = self.voiced_unvoiced_cost * correction;
        let is_voiceless = |f: f64| f <= 0.0 || f >= pitch_ceiling;

        let local_score = |frame: &Frame, candidate: &Candidate| -> f64 {
            if is_voiceless(candidate.frequency) {
                let silence_term = if self.silence_threshold <= 0.0 {
                    0.0
                } else {
                    let scaled = frame.intensity
                        / (self.silence_threshold / (1.0 + self.voicing_threshold));
                    (2.0 - scaled).max(0.0)
                };
                self.voicing_threshold + silence_term
            } else {
                candidate.strength - self.octave_cost * (pitch_ceiling / candidate.frequency).log2()
            }
        };

        let transition = |f1: f64, f2: f64| -> f64 {
            match (is_voiceless(f1), is_voiceless(f2)) {
                (true, true) => 0.0,
                (true, false) | (false, true) => voiced_unvoiced_cost,
                (false, false) => octave_jump_cost * (f1 / f2).log2().abs(),
            }
        };

        let mut delta: Vec<Vec<f64>> = Vec::with_capacity(frames.len());
        let mut psi: Vec<Vec<usize>> = Vec::with_capacity(frames.len());

        delta.push(
            frames[0]
                .candidates
                .iter()
                .map(|c| local_score(&frames[0], c))
                .collect(),
        );
        psi.push(vec![0; frames[0].candidates.len()]);

        for t in 1..frames.len() {
            let previous = &frames[t - 1];
            let current = &frames[t];
            let mut scores = Vec::with_capacity(current.candidates.len());
            let mut back = Vec::with_capacity(current.candidates.len());

            for candidate in &current.candidates {
                let (best_index, best_value) = previous
                    .candidates
                    .iter()
                    .enumerate()
                    .map(|(i, prev)| {
                        (i, delta[t - 1][i] - transition(prev.frequency, candidate.frequency))
                    })
                    .fold((0, f64::NEG_INFINITY), |best, item| {
                        if item.1 > best.1 {
                            item
                        } else {
                            best
                        }
                    });
                scores.push(best_value + local_score(current, candidate));
                back.push(best_index);
            }

            delta.push(scores);
            psi.push(back);
        }

        let last = delta.len() - 1;
        let mut place = delta[last]
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0;

        let mut path = vec![0; frames.len()];
        for t in (0..frames.len()).rev() {
            path[t] = place;
            place = psi[t][place];
        }
        path
    }
}

/// Per-sound constants shared by every frame of one analysis
struct FrameAnalysis {
    sample_rate: f64,
    pitch_floor: f64,
    voicing_threshold: f64,
    octave_cost: f64,
    max_candidates: usize,
    global_peak: f64,
    window: Vec<f64>,
    /// Autocorrelation of the window, normalized to 1 at lag 0
    window_r: Vec<f64>,
    half_window: usize,
    period_len: usize,
    half_period: usize,
    min_lag: usize,
    max_lag: usize,
}

impl FrameAnalysis {
    fn new(
        params: &AutocorrelationPitch,
        sample_rate: f64,
        pitch_floor: f64,
        pitch_ceiling: f64,
        half_window: usize,
        global_peak: f64,
        fft: &mut Fft,
    ) -> Self {
        let window_len = 2 * half_window;
        let window: Vec<f64> = (1..=window_len)
            .map(|i| {
                0.5 - 0.5
                    * (2.0 * std::f64::consts::PI * i as f64 / (window_len + 1) as f64).cos()
            })
            .collect();

        let window_ac = fft.autocorrelation(&window);
        let window_r: Vec<f64> = window_ac.iter().map(|&v| v / window_ac[0]).collect();

        let period_len = (sample_rate / pitch_floor).floor() as usize;
        let min_lag = ((sample_rate / pitch_ceiling).floor() as usize).max(2);
        let max_lag = ((window_len as f64 / params.periods_per_window).floor() as usize + 2)
            .min(window_len.saturating_sub(2));

        Self {
            sample_rate,
            pitch_floor,
            voicing_threshold: params.voicing_threshold,
            octave_cost: params.octave_cost,
            max_candidates: params
                .max_candidates
                .max((pitch_ceiling / pitch_floor).floor() as usize)
                .max(1),
            global_peak,
            window,
            window_r,
            half_window,
            period_len,
            half_period: period_len / 2 + 1,
            min_lag,
            max_lag,
        }
    }

    fn analyze(&self, samples: &[f64], time: f64, fft: &mut Fft) -> Frame {
        let nx = samples.len() as isize;
        let window_len = self.window.len();

        // Sample just left of the frame centre
        let left = (time * self.sample_rate - 0.5).floor() as isize;

        // Local mean over one longest period on both sides
        let mean_from = (left + 1 - self.period_len as isize).clamp(0, nx) as usize;
        let mean_to = (left + self.period_len as isize).clamp(0, nx) as usize;
        let local_mean = if mean_to > mean_from {
            samples[mean_from..mean_to].iter().sum::<f64>() / (mean_to - mean_from) as f64
        } else {
            0.0
        };

        let start = left + 1 - self.half_window as isize;
        let frame_data: Vec<f64> = (0..window_len)
            .map(|j| {
                let idx = start + j as isize;
                if idx >= 0 && idx < nx {
                    (samples[idx as usize] - local_mean) * self.window[j]
                } else {
                    0.0
                }
            })
            .collect();

        // Local peak within half a period of the centre
        let peak_from = self.half_window.saturating_sub(self.half_period);
        let peak_to = (self.half_window + self.half_period).min(window_len);
        let local_peak = frame_data[peak_from..peak_to]
            .iter()
            .map(|v| v.abs())
            .fold(0.0, f64::max);

        let mut frame = Frame {
            candidates: vec![Candidate {
                frequency: 0.0,
                strength: 0.0,
            }],
            intensity: (local_peak / self.global_peak).min(1.0),
        };
        if local_peak == 0.0 {
            return frame;
        }

        let ac = fft.autocorrelation(&frame_data);
        if ac[0] <= 0.0 {
            return frame;
        }
        let r: Vec<f64> = (0..=self.max_lag)
            .map(|lag| ac[lag] / (ac[0] * self.window_r[lag]))
            .collect();

        let mut voiced = Vec::new();
        for lag in self.min_lag..self.max_lag {
            let (prev, cur, next) = (r[lag - 1], r[lag], r[lag + 1]);
            if cur <= 0.5 * self.voicing_threshold || cur <= prev || cur < next {
                continue;
            }

            // Parabolic refinement of the peak position and height
            let dr = 0.5 * (next - prev);
            let d2r = 2.0 * cur - prev - next;
            let refined_lag = lag as f64 + dr / d2r;
            let mut strength = cur + 0.5 * dr * dr / d2r;
            if strength > 1.0 {
                strength = 1.0 / strength;
            }

            voiced.push(Candidate {
                frequency: self.sample_rate / refined_lag,
                strength,
            });
        }

        // Keep the strongest, with a slight preference for higher octaves
        let ranked = |c: &Candidate| c.strength - self.octave_cost * (self.pitch_floor / c.frequency).log2();
        voiced.sort_by(|a, b| ranked(b).total_cmp(&ranked(a)));
        voiced.truncate(self.max_candidates - 1);
        frame.candidates.extend(voiced);

        frame
    }
}

impl Sound {
    /// Compute a pitch contour with the default autocorrelation tracker
    pub fn to_pitch(&self, time_step: f64, pitch_floor: f64, pitch_ceiling: f64) -> Result<PitchContour> {
        AutocorrelationPitch::default().track(self, time_step, pitch_floor, pitch_ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_pure_tone() {
        let freq = 200.0;
        let sound = Sound::create_tone(freq, 0.5, 16000.0, 0.5, 0.0);
        let pitch = sound.to_pitch(0.01, 75.0, 500.0).unwrap();

        assert!(pitch.num_frames() > 0);
        assert!(pitch.count_voiced() > pitch.num_frames() / 2);

        let mean_f0 = pitch.mean().unwrap();
        assert!(
            (mean_f0 - freq).abs() < 5.0,
            "Mean pitch {} Hz should be close to {} Hz",
            mean_f0,
            freq
        );
    }

    #[test]
    fn test_pitch_silence_is_unvoiced() {
        let sound = Sound::create_silence(0.5, 16000.0);
        let pitch = sound.to_pitch(0.01, 75.0, 500.0).unwrap();

        assert!(pitch.num_frames() > 0);
        assert_eq!(pitch.count_voiced(), 0);
        assert!(pitch.frequencies_or_zero().iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_frames_are_centred() {
        let sound = Sound::create_tone(150.0, 0.5, 16000.0, 0.5, 0.0);
        let pitch = sound.to_pitch(0.01, 75.0, 500.0).unwrap();

        let first = pitch.time_of_frame(0);
        let last = pitch.time_of_frame(pitch.num_frames() - 1);
        assert!(first > 0.0);
        assert!(((first - 0.0) - (0.5 - last)).abs() < 1e-9);
    }

    #[test]
    fn test_too_short_sound_fails() {
        // 3 periods of 75 Hz need 40 ms
        let sound = Sound::create_tone(200.0, 0.03, 16000.0, 0.5, 0.0);
        let result = sound.to_pitch(0.01, 75.0, 500.0);
        assert!(matches!(result, Err(ProminenceError::PitchAnalysis(_))));
    }

    #[test]
    fn test_floor_above_ceiling_fails() {
        let sound = Sound::create_tone(200.0, 0.5, 16000.0, 0.5, 0.0);
        let result = sound.to_pitch(0.01, 600.0, 500.0);
        assert!(matches!(result, Err(ProminenceError::PitchAnalysis(_))));
    }

    #[test]
    fn test_contour_zeroes_undefined_values() {
        let contour = PitchContour::new(vec![f64::NAN, 120.0, 0.0, -1.0], 0.0, 0.01);
        assert_eq!(contour.frequencies_or_zero(), vec![0.0, 120.0, 0.0, 0.0]);
        assert_eq!(contour.count_voiced(), 1);
        assert_eq!(contour.value_at_frame(1), Some(120.0));
        assert_eq!(contour.value_at_frame(9), None);
    }
}
