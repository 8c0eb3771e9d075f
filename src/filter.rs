//! Butterworth bandpass filtering
//!
//! The filter is designed the classic way: analog Butterworth prototype,
//! bilinear pre-warping of the band edges, lowpass-to-bandpass transform,
//! bilinear transform to the z-plane. It is run as a cascade of second-order
//! sections in a single causal pass (no zero-phase forward/backward trick),
//! so the output lags the input by the filter's group delay.

use std::f64::consts::PI;

use num_complex::Complex;

use crate::{ProminenceError, Result, Sound};

/// Default Butterworth prototype order
pub const DEFAULT_ORDER: usize = 5;

/// Imaginary parts below this are treated as real poles when pairing sections
const REAL_POLE_TOLERANCE: f64 = 1e-9;

/// One second-order section, `a[0]` is always 1
#[derive(Debug, Clone, Copy)]
struct Section {
    b: [f64; 3],
    a: [f64; 3],
}

impl Section {
    fn from_poles(p1: Complex<f64>, p2: Complex<f64>) -> Self {
        // Every section carries one zero at z = +1 and one at z = -1
        Self {
            b: [1.0, 0.0, -1.0],
            a: [1.0, -(p1 + p2).re, (p1 * p2).re],
        }
    }

    fn response(&self, z_inv: Complex<f64>) -> Complex<f64> {
        let z_inv2 = z_inv * z_inv;
        let num = self.b[0] + z_inv * self.b[1] + z_inv2 * self.b[2];
        let den = self.a[0] + z_inv * self.a[1] + z_inv2 * self.a[2];
        num / den
    }
}

/// Digital Butterworth bandpass filter
#[derive(Debug, Clone)]
pub struct BandPass {
    sections: Vec<Section>,
    gain: f64,
    sample_rate: f64,
}

impl BandPass {
    /// Design a Butterworth bandpass of the given prototype order
    ///
    /// The resulting filter has `2 * order` poles. Both band edges sit exactly
    /// at the -3 dB point.
    ///
    /// # Errors
    /// `InvalidBand` unless `0 < low < high < sample_rate / 2`;
    /// `InvalidParameter` for a zero order or a non-positive sample rate.
    pub fn butterworth(order: usize, low: f64, high: f64, sample_rate: f64) -> Result<Self> {
        if order == 0 {
            return Err(ProminenceError::InvalidParameter(
                "filter order must be at least 1".to_string(),
            ));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ProminenceError::InvalidParameter(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }

        let nyquist = 0.5 * sample_rate;
        let valid = low.is_finite()
            && high.is_finite()
            && low > 0.0
            && high < nyquist
            && low < high;
        if !valid {
            return Err(ProminenceError::InvalidBand { low, high, nyquist });
        }

        // Pre-warped analog edges for a bilinear transform at fs = 2
        let fs = 2.0;
        let warp = |f: f64| 2.0 * fs * (PI * (f / nyquist) / fs).tan();
        let (w_low, w_high) = (warp(low), warp(high));
        let bandwidth = w_high - w_low;
        let centre_sq = w_low * w_high;

        // Analog lowpass prototype: poles on the left half of the unit circle
        let n = order as f64;
        let analog_poles: Vec<Complex<f64>> = (0..order)
            .flat_map(|k| {
                let m = -n + 1.0 + 2.0 * k as f64;
                let prototype = -Complex::from_polar(1.0, PI * m / (2.0 * n));
                let shifted = prototype * (bandwidth / 2.0);
                let spread = (shifted * shifted - centre_sq).sqrt();
                [shifted + spread, shifted - spread]
            })
            .collect();

        // Bilinear transform; the `order` analog zeros at s = 0 land on z = +1
        // and the zeros at infinity on z = -1.
        let fs2 = 2.0 * fs;
        let mut denominator = Complex::new(1.0, 0.0);
        let digital_poles: Vec<Complex<f64>> = analog_poles
            .iter()
            .map(|&p| {
                denominator *= fs2 - p;
                (fs2 + p) / (fs2 - p)
            })
            .collect();
        let gain = (bandwidth.powi(order as i32) * fs2.powi(order as i32) / denominator).re;

        Ok(Self {
            sections: pair_sections(&digital_poles),
            gain,
            sample_rate,
        })
    }

    /// Filter a buffer in one causal pass, starting from rest
    pub fn apply(&self, samples: &[f64]) -> Vec<f64> {
        let mut output: Vec<f64> = samples.iter().map(|&x| x * self.gain).collect();

        for section in &self.sections {
            let (mut z1, mut z2) = (0.0, 0.0);
            for value in output.iter_mut() {
                let x = *value;
                let y = section.b[0] * x + z1;
                z1 = section.b[1] * x - section.a[1] * y + z2;
                z2 = section.b[2] * x - section.a[2] * y;
                *value = y;
            }
        }

        output
    }

    /// Magnitude of the frequency response at `frequency` Hz
    pub fn gain_at(&self, frequency: f64) -> f64 {
        let omega = 2.0 * PI * frequency / self.sample_rate;
        let z_inv = Complex::from_polar(1.0, -omega);
        let response = self
            .sections
            .iter()
            .fold(Complex::new(self.gain, 0.0), |acc, s| acc * s.response(z_inv));
        response.norm()
    }

    /// Number of second-order sections in the cascade
    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }
}

/// Group poles into conjugate (or real) pairs, one pair per section
fn pair_sections(poles: &[Complex<f64>]) -> Vec<Section> {
    let mut sections = Vec::with_capacity(poles.len() / 2);
    let mut reals = Vec::new();

    for &p in poles {
        if p.im > REAL_POLE_TOLERANCE {
            sections.push(Section::from_poles(p, p.conj()));
        } else if p.im.abs() <= REAL_POLE_TOLERANCE {
            reals.push(p.re);
        }
    }

    reals.sort_by(|a, b| a.total_cmp(b));
    for pair in reals.chunks(2) {
        let p1 = Complex::new(pair[0], 0.0);
        let p2 = pair.get(1).map_or(Complex::new(0.0, 0.0), |&r| Complex::new(r, 0.0));
        sections.push(Section::from_poles(p1, p2));
    }

    sections
}

/// Band-limit `samples` with a Butterworth bandpass of [`DEFAULT_ORDER`]
pub fn bandpass_filter(samples: &[f64], sample_rate: f64, low: f64, high: f64) -> Result<Vec<f64>> {
    let filter = BandPass::butterworth(DEFAULT_ORDER, low, high, sample_rate)?;
    Ok(filter.apply(samples))
}

impl Sound {
    /// Band-limit this sound with a Butterworth bandpass of [`DEFAULT_ORDER`]
    pub fn bandpass(&self, low: f64, high: f64) -> Result<Sound> {
        let filtered = bandpass_filter(self.samples(), self.sample_rate(), low, high)?;
        Ok(Sound::from_samples_owned(filtered, self.sample_rate()))
    }
}
