//! Resampling helpers for moving contours between frame rates
//!
//! Pitch is sampled every 10 ms while energy is framed every 20 ms; these
//! helpers put evenly spaced time axes on both and carry values across by
//! piecewise-linear interpolation.

/// Linear interpolation between two values
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// `n` evenly spaced points from `start` to `stop`
///
/// With `endpoint` the last point is exactly `stop`; without it the points
/// are the left edges of `n` equal cells covering `[start, stop)`.
pub fn linspace(start: f64, stop: f64, n: usize, endpoint: bool) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let divisions = if endpoint { n - 1 } else { n };
            let step = (stop - start) / divisions as f64;
            let mut points: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            if endpoint {
                points[n - 1] = stop;
            }
            points
        }
    }
}

/// Piecewise-linear interpolation of the curve `(xp, fp)` at each of `x`
///
/// `xp` must be non-decreasing. Queries left of the first knot take `fp[0]`,
/// right of the last knot take the last value. Returns `None` when there are
/// no knots or the knot arrays differ in length.
pub fn interp_linear(x: &[f64], xp: &[f64], fp: &[f64]) -> Option<Vec<f64>> {
    if xp.is_empty() || xp.len() != fp.len() {
        return None;
    }
    let last = xp.len() - 1;

    let values = x
        .iter()
        .map(|&t| {
            if t <= xp[0] {
                return fp[0];
            }
            if t >= xp[last] {
                return fp[last];
            }
            // First knot strictly greater than t; t lies in [xp[j - 1], xp[j])
            let j = xp.partition_point(|&knot| knot <= t);
            let (x0, x1) = (xp[j - 1], xp[j]);
            let span = x1 - x0;
            if span <= 0.0 {
                fp[j]
            } else {
                lerp(fp[j - 1], fp[j], (t - x0) / span)
            }
        })
        .collect();

    Some(values)
}

/// Means of consecutive non-overlapping windows of `width` values
///
/// A trailing partial window is dropped. Returns an empty vector when
/// `width` is zero or larger than the input.
pub fn block_means(values: &[f64], width: usize) -> Vec<f64> {
    if width == 0 {
        return Vec::new();
    }
    values
        .chunks_exact(width)
        .map(|block| block.iter().sum::<f64>() / width as f64)
        .collect()
}
