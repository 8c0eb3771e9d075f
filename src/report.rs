//! Tab-separated prominence tables

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::annotation::Tier;
use crate::prominence::ProminenceScores;
use crate::Result;

/// Header row of a prominence table
pub const TABLE_HEADER: &str = "word\tstart_time\tend_time\traw_prominence\tnorm_prominence";

/// Write one row per scored word of `tier`, in tier order
///
/// The file is `{audio stem}_{tier_name}.txt` inside `output_dir`, which is
/// created if needed. `tier_name` is the name the tier was requested by, so
/// the file name does not depend on how the TextGrid capitalizes it. Words
/// without a score are left out. Returns the path written.
pub fn write_prominence_table(
    scores: &ProminenceScores,
    tier: &Tier,
    tier_name: &str,
    audio_path: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;

    let stem = audio_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_path = output_dir.join(format!("{stem}_{tier_name}.txt"));

    let mut writer = BufWriter::new(File::create(&output_path)?);
    write_rows(&mut writer, scores, tier)?;
    writer.flush()?;

    info!("Saved prominence file: {}", output_path.display());
    Ok(output_path)
}

fn write_rows<W: Write>(writer: &mut W, scores: &ProminenceScores, tier: &Tier) -> Result<()> {
    writeln!(writer, "{TABLE_HEADER}")?;
    for word in tier.words() {
        if let Some(score) = scores.get(word.start, word.label()) {
            writeln!(
                writer,
                "{}\t{:.3}\t{:.3}\t{:.3}\t{:.3}",
                word.label(),
                word.start,
                word.end,
                score.raw,
                score.normalized
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::WordInterval;
    use crate::prominence::ProminenceExtractor;
    use crate::{AutocorrelationPitch, ProminenceConfig, Sound};

    #[test]
    fn test_empty_scores_write_header_only() {
        let tier = Tier::new("word", vec![WordInterval::new(0.0, 0.5, "a")]);
        let mut buffer = Vec::new();
        write_rows(&mut buffer, &ProminenceScores::default(), &tier).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), format!("{TABLE_HEADER}\n"));
    }

    #[test]
    fn test_table_file() {
        let tier = Tier::new(
            "word",
            vec![
                WordInterval::new(0.0, 0.5, " only "),
                WordInterval::new(0.5, 1.0, ""),
            ],
        );
        let sound = Sound::create_tone(200.0, 1.0, 16000.0, 0.5, 0.0);
        let extractor =
            ProminenceExtractor::new(ProminenceConfig::default(), AutocorrelationPitch::default());
        let scores = extractor.extract_tier(&sound, &tier).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested").join("output");
        let path = write_prominence_table(
            &scores,
            &tier,
            "word",
            Path::new("/data/spk1/utt01.wav"),
            &out_dir,
        )
        .unwrap();

        assert_eq!(path, out_dir.join("utt01_word.txt"));
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], TABLE_HEADER);

        let fields: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0], "only");
        assert_eq!(fields[1], "0.000");
        assert_eq!(fields[2], "0.500");
        assert_eq!(fields[4], "0.000");
    }

    #[test]
    fn test_file_named_after_requested_tier() {
        let tier = Tier::new("Word", vec![WordInterval::new(0.0, 0.5, "a")]);
        let dir = tempfile::tempdir().unwrap();

        let path = write_prominence_table(
            &ProminenceScores::default(),
            &tier,
            "word",
            Path::new("utt.wav"),
            dir.path(),
        )
        .unwrap();

        assert_eq!(path, dir.path().join("utt_word.txt"));
        assert!(path.is_file());
    }
}
