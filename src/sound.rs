//! Sound type for audio data representation
//!
//! The Sound type is the sample buffer every analysis in this crate borrows.
//! It supports loading from various audio formats (WAV, MP3, FLAC, OGG) and
//! slicing out the utterances the prominence pipeline works on.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::{ProminenceError, Result};

/// Mono audio samples with their sample rate
#[derive(Debug, Clone)]
pub struct Sound {
    /// Audio samples (mono, normalized to [-1, 1] range)
    samples: Vec<f64>,
    /// Sample rate in Hz
    sample_rate: f64,
}

impl Sound {
    /// Create a Sound from raw samples
    ///
    /// # Example
    /// ```
    /// use prominence_core::Sound;
    ///
    /// let samples = vec![0.0, 0.5, 1.0, 0.5, 0.0, -0.5, -1.0, -0.5];
    /// let sound = Sound::from_samples(&samples, 16000.0);
    /// assert_eq!(sound.sample_rate(), 16000.0);
    /// ```
    pub fn from_samples(samples: &[f64], sample_rate: f64) -> Self {
        Self {
            samples: samples.to_vec(),
            sample_rate,
        }
    }

    /// Create a Sound from owned samples (avoids cloning)
    pub fn from_samples_owned(samples: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Load a Sound from an audio file (supports WAV, MP3, FLAC, OGG)
    ///
    /// Only the first channel of a multi-channel file is kept. The file
    /// extension is used as a probing hint only, so extensionless audio files
    /// are detected by content. Samples are normalized to [-1, 1].
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or its format is not supported.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        match Self::from_file_symphonia(path) {
            Ok(sound) => Ok(sound),
            Err(symphonia_err) => {
                debug!(
                    path = %path.display(),
                    error = %symphonia_err,
                    "symphonia could not decode file, retrying as plain WAV"
                );
                Self::from_file_wav(path).map_err(|_| symphonia_err)
            }
        }
    }

    fn from_file_symphonia(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ProminenceError::Decode(format!("Failed to probe audio format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| ProminenceError::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| ProminenceError::Decode("Unknown sample rate".to_string()))?
            as f64;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .unwrap_or(1)
            .max(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| ProminenceError::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples: Vec<f64> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(symphonia::core::errors::Error::ResetRequired) => break,
                Err(e) => {
                    return Err(ProminenceError::Decode(format!(
                        "Error reading packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                Err(e) => {
                    return Err(ProminenceError::Decode(format!("Decode error: {}", e)));
                }
            };

            let spec = *decoded.spec();
            let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            // Keep the first channel of each interleaved frame
            samples.extend(
                sample_buf
                    .samples()
                    .chunks(channels)
                    .map(|frame| frame[0] as f64),
            );
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    fn from_file_wav(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let sample_rate = spec.sample_rate as f64;
        let channels = (spec.channels as usize).max(1);

        let samples = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_value = (1_i64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .into_samples::<i32>()
                    .step_by(channels)
                    .map(|s| s.map(|v| v as f64 / max_value))
                    .collect::<std::result::Result<Vec<f64>, hound::Error>>()?
            }
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .step_by(channels)
                .map(|s| s.map(|v| v as f64))
                .collect::<std::result::Result<Vec<f64>, hound::Error>>()?,
        };

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Get the sample rate in Hz
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Get a reference to the audio samples
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Get the number of samples
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Get the total duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate
    }

    /// Borrow the samples in `[start_time, end_time)`
    ///
    /// Sample indices are `floor(sample_rate * t)`, clamped to the buffer, so
    /// a span reaching past the end of the recording is silently shortened
    /// and an empty or inverted span yields an empty slice.
    pub fn span(&self, start_time: f64, end_time: f64) -> &[f64] {
        let n = self.samples.len();
        let to_index = |t: f64| ((self.sample_rate * t).floor().max(0.0) as usize).min(n);
        let first = to_index(start_time);
        let last = to_index(end_time);
        if last <= first {
            return &[];
        }
        &self.samples[first..last]
    }

    /// Copy out the part of the sound in `[start_time, end_time)`
    pub fn extract_span(&self, start_time: f64, end_time: f64) -> Sound {
        Sound::from_samples(self.span(start_time, end_time), self.sample_rate)
    }

    /// Create a pure tone (sine wave)
    ///
    /// # Arguments
    /// * `frequency` - Frequency in Hz
    /// * `duration` - Duration in seconds
    /// * `sample_rate` - Sample rate in Hz
    /// * `amplitude` - Peak amplitude (0.0 to 1.0)
    /// * `phase` - Initial phase in radians
    pub fn create_tone(
        frequency: f64,
        duration: f64,
        sample_rate: f64,
        amplitude: f64,
        phase: f64,
    ) -> Sound {
        let n_samples = (duration * sample_rate).round() as usize;
        let omega = 2.0 * std::f64::consts::PI * frequency / sample_rate;

        let samples: Vec<f64> = (0..n_samples)
            .map(|i| amplitude * (omega * i as f64 + phase).sin())
            .collect();

        Sound {
            samples,
            sample_rate,
        }
    }

    /// Create silence
    pub fn create_silence(duration: f64, sample_rate: f64) -> Sound {
        let n_samples = (duration * sample_rate).round() as usize;
        Sound {
            samples: vec![0.0; n_samples],
            sample_rate,
        }
    }

    /// Get the root-mean-square (RMS) amplitude
    pub fn rms(&self) -> f64 {
        rms(&self.samples)
    }
}

/// Root-mean-square of a sample slice (0.0 when empty)
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| s * s).sum();
    (sum_sq / samples.len() as f64).sqrt()
}
