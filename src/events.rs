//! Rise/fall event parameterization of frame-level contours
//!
//! A frame that stands out from a neighbour contributes an event: its
//! amplitude is how far it rises above the previous frame plus how far it
//! falls to the next one, and its duration is one frame per non-zero side.

/// Event amplitude and duration per frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventParams {
    /// Rise plus fall amplitude, in the unit of the input contour
    pub amplitude: Vec<f64>,
    /// Event duration in seconds (0, one or two frame durations)
    pub duration: Vec<f64>,
}

impl EventParams {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.amplitude.len()
    }

    /// True when there are no frames
    pub fn is_empty(&self) -> bool {
        self.amplitude.is_empty()
    }
}

/// Compute event amplitude and duration for every frame of `values`
///
/// The first and last frames have no neighbour on one side and are always
/// zero.
pub fn compute_event_params(values: &[f64], frame_duration: f64) -> EventParams {
    let n = values.len();
    let mut amplitude = vec![0.0; n];
    let mut duration = vec![0.0; n];

    for i in 1..n.saturating_sub(1) {
        let rise = (values[i] - values[i - 1]).max(0.0);
        let fall = (values[i] - values[i + 1]).max(0.0);
        amplitude[i] = rise.abs() + fall.abs();
        let sides = (rise > 0.0) as u8 + (fall > 0.0) as u8;
        duration[i] = frame_duration * sides as f64;
    }

    EventParams {
        amplitude,
        duration,
    }
}
