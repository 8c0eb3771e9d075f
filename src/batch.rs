//! Directory-level batch processing
//!
//! Every `.TextGrid` below the data directory is paired with a same-stem
//! `.wav` (or extensionless) audio file; each pair gets its own prominence
//! table in the output directory. A pair that fails is logged and counted,
//! and the run carries on with the next one.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::annotation::Annotation;
use crate::config::ProminenceConfig;
use crate::pitch::PitchTracker;
use crate::prominence::ProminenceExtractor;
use crate::report::write_prominence_table;
use crate::{Result, Sound};

/// Outcome counts of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Pairs whose table was written
    pub processed: usize,
    /// TextGrids without an audio sibling
    pub skipped: usize,
    /// Pairs that raised an error
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }
}

/// Process every TextGrid/audio pair under `data_dir`
///
/// Fails only if the configuration is invalid or `data_dir` itself cannot
/// be read.
pub fn run_batch<T: PitchTracker>(
    data_dir: &Path,
    output_dir: &Path,
    config: &ProminenceConfig,
    tracker: T,
) -> Result<BatchSummary> {
    config.validate()?;

    let mut textgrids = Vec::new();
    collect_textgrid_files(data_dir, &mut textgrids)?;
    textgrids.sort();
    info!(
        "Found {} TextGrid file(s) under '{}'",
        textgrids.len(),
        data_dir.display()
    );

    let extractor = ProminenceExtractor::new(config.clone(), tracker);
    let mut summary = BatchSummary::default();

    for textgrid_path in &textgrids {
        let Some(audio_path) = find_audio_sibling(textgrid_path) else {
            warn!(
                "Skipping '{}': no audio file found",
                textgrid_path.display()
            );
            summary.skipped += 1;
            continue;
        };

        info!("Processing: {}", audio_path.display());
        match process_pair(&extractor, textgrid_path, &audio_path, output_dir) {
            Ok(_) => summary.processed += 1,
            Err(err) => {
                error!("Error processing '{}': {err}", textgrid_path.display());
                summary.failed += 1;
            }
        }
    }

    info!(
        "Batch complete: {} processed, {} skipped, {} failed. Results saved to: {}",
        summary.processed,
        summary.skipped,
        summary.failed,
        output_dir.display()
    );
    Ok(summary)
}

fn process_pair<T: PitchTracker>(
    extractor: &ProminenceExtractor<T>,
    textgrid_path: &Path,
    audio_path: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    let annotation = Annotation::from_textgrid_file(textgrid_path)?;
    let tier_name = &extractor.config().tier_name;
    let tier = annotation.tier(tier_name)?;
    let sound = Sound::from_file(audio_path)?;
    let scores = extractor.extract_tier(&sound, tier)?;
    write_prominence_table(&scores, tier, tier_name, audio_path, output_dir)
}

/// Recursive TextGrid discovery; symlinked directories are not entered
///
/// Only an unreadable `dir` is an error; unreadable entries and
/// subdirectories below it are logged and skipped.
fn collect_textgrid_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry in '{}': {err}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!("Skipping '{}': {err}", path.display());
                continue;
            }
        };

        if file_type.is_dir() {
            if let Err(err) = collect_textgrid_files(&path, out) {
                warn!("Skipping unreadable directory '{}': {err}", path.display());
            }
            continue;
        }
        if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("TextGrid"))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Same-stem `.wav` next to the TextGrid, else an extensionless file
fn find_audio_sibling(textgrid_path: &Path) -> Option<PathBuf> {
    ["wav", "WAV", ""]
        .iter()
        .map(|ext| textgrid_path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}
