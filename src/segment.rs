//! Utterance segmentation from silence gaps in a word tier

use crate::annotation::WordInterval;

/// A run of speech between long silences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utterance {
    pub start: f64,
    pub end: f64,
}

impl Utterance {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True when `time` lies in `[start, end)`
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }
}

/// Group word intervals into utterances
///
/// A labelled interval opens an utterance (if none is open) and moves its end
/// to the interval's end. A silence closes the open utterance only when it
/// ends more than `threshold` seconds after the utterance's current end;
/// shorter pauses stay inside the utterance.
pub fn segment_utterances(intervals: &[WordInterval], threshold: f64) -> Vec<Utterance> {
    let mut utterances = Vec::new();
    let mut open: Option<Utterance> = None;

    for interval in intervals {
        if !interval.is_silence() {
            let utterance = open.get_or_insert(Utterance {
                start: interval.start,
                end: interval.end,
            });
            utterance.end = interval.end;
        } else if let Some(utterance) = open {
            if interval.end - utterance.end > threshold {
                utterances.push(utterance);
                open = None;
            }
        }
    }

    utterances.extend(open);
    utterances
}
