//! FFT-based autocorrelation for the pitch tracker
//!
//! Thin wrapper around rustfft that caches plans across the frames of one
//! analysis.

use num_complex::Complex;
use rustfft::FftPlanner;

/// FFT processor with cached plans
pub struct Fft {
    planner: FftPlanner<f64>,
}

impl Fft {
    /// Create a new FFT processor
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Forward FFT of real input, zero-padded to `size` points
    pub fn real_fft(&mut self, input: &[f64], size: usize) -> Vec<Complex<f64>> {
        let size = size.max(input.len());
        let mut buffer: Vec<Complex<f64>> = Vec::with_capacity(size);
        buffer.extend(input.iter().map(|&x| Complex::new(x, 0.0)));
        buffer.resize(size, Complex::new(0.0, 0.0));

        self.planner.plan_fft_forward(size).process(&mut buffer);
        buffer
    }

    /// Inverse FFT, scaled by `1 / n`
    pub fn inverse_fft(&mut self, input: &[Complex<f64>]) -> Vec<Complex<f64>> {
        let mut buffer = input.to_vec();
        if buffer.is_empty() {
            return buffer;
        }
        self.planner.plan_fft_inverse(buffer.len()).process(&mut buffer);

        let scale = 1.0 / buffer.len() as f64;
        buffer.iter_mut().for_each(|c| *c *= scale);
        buffer
    }

    /// Linear (non-circular) autocorrelation for lags `0..input.len()`
    pub fn autocorrelation(&mut self, input: &[f64]) -> Vec<f64> {
        let n = input.len();
        if n == 0 {
            return Vec::new();
        }

        // Padding to 2n keeps the circular wrap-around out of the lags we return
        let size = (2 * n).next_power_of_two();
        let power: Vec<Complex<f64>> = self
            .real_fft(input, size)
            .iter()
            .map(|c| Complex::new(c.norm_sqr(), 0.0))
            .collect();

        self.inverse_fft(&power)[..n].iter().map(|c| c.re).collect()
    }
}

impl Default for Fft {
    fn default() -> Self {
        Self::new()
    }
}
