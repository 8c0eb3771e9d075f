//! Time-aligned word annotations (Praat TextGrid interval tiers)

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use textgrid::{TextGrid, TierType};
use tracing::debug;

use crate::{ProminenceError, Result};

/// One labelled span of a tier; empty text marks silence
#[derive(Debug, Clone, PartialEq)]
pub struct WordInterval {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl WordInterval {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// The label with surrounding whitespace removed
    pub fn label(&self) -> &str {
        self.text.trim()
    }

    /// True when the label is empty after trimming
    pub fn is_silence(&self) -> bool {
        self.label().is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Named, time-ordered sequence of intervals
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub name: String,
    pub intervals: Vec<WordInterval>,
}

impl Tier {
    pub fn new(name: impl Into<String>, intervals: Vec<WordInterval>) -> Self {
        Self {
            name: name.into(),
            intervals,
        }
    }

    /// Intervals carrying a non-empty label
    pub fn words(&self) -> impl Iterator<Item = &WordInterval> {
        self.intervals.iter().filter(|interval| !interval.is_silence())
    }
}

/// A set of tiers looked up by case-insensitive name
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    /// Keyed by lower-cased tier name
    tiers: HashMap<String, Tier>,
}

impl Annotation {
    /// Build an annotation from tiers; the first of several same-named tiers wins
    pub fn from_tiers<I: IntoIterator<Item = Tier>>(tiers: I) -> Self {
        let mut map = HashMap::new();
        for tier in tiers {
            map.entry(tier.name.to_lowercase()).or_insert(tier);
        }
        Self { tiers: map }
    }

    /// Look up a tier by name, ignoring case
    pub fn tier(&self, name: &str) -> Result<&Tier> {
        self.tiers.get(&name.to_lowercase()).ok_or_else(|| {
            debug!("No tier '{name}'; available: {:?}", self.tier_names());
            ProminenceError::TierNotFound {
                tier: name.to_string(),
            }
        })
    }

    /// Tier names in sorted order
    pub fn tier_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tiers.values().map(|tier| tier.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Load the interval tiers of a TextGrid file
    ///
    /// Point tiers are ignored. Files the `textgrid` crate rejects are retried
    /// with a tolerant line parser for the long ("ooTextFile") format.
    pub fn from_textgrid_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let tiers = match read_with_textgrid_crate(path) {
            Ok(tiers) => tiers,
            Err(crate_err) => {
                debug!(
                    "textgrid crate could not read '{}' ({crate_err}), using line parser",
                    path.display()
                );
                let contents = fs::read_to_string(path)?;
                parse_long_textgrid(&contents).map_err(|fallback_err| {
                    ProminenceError::TextGrid {
                        path: path.to_path_buf(),
                        message: format!(
                            "textgrid crate: {crate_err}; line parser: {fallback_err}"
                        ),
                    }
                })?
            }
        };

        Ok(Self::from_tiers(tiers))
    }
}

fn read_with_textgrid_crate(path: &Path) -> std::result::Result<Vec<Tier>, String> {
    let textgrid = TextGrid::from_file(path).map_err(|err| err.to_string())?;

    Ok(textgrid
        .tiers
        .iter()
        .filter(|tier| tier.tier_type == TierType::IntervalTier)
        .map(|tier| {
            let intervals = tier
                .intervals
                .iter()
                .map(|interval| WordInterval::new(interval.xmin, interval.xmax, interval.text.clone()))
                .collect();
            Tier::new(tier.name.clone(), intervals)
        })
        .collect())
}

/// Parse the interval tiers of a long-format TextGrid
fn parse_long_textgrid(contents: &str) -> std::result::Result<Vec<Tier>, String> {
    let mut tiers = Vec::new();
    let mut current: Option<PendingTier> = None;
    let mut xmin: Option<f64> = None;
    let mut xmax: Option<f64> = None;

    for raw_line in contents.lines() {
        let line = raw_line.trim();

        if line.starts_with("item [") {
            if let Some(tier) = current.take().and_then(PendingTier::finish) {
                tiers.push(tier);
            }
            current = Some(PendingTier::default());
            xmin = None;
            xmax = None;
            continue;
        }

        let Some(tier) = current.as_mut() else {
            continue;
        };

        if let Some(value) = parse_assignment_value(line, "class") {
            tier.is_interval_tier = strip_quotes(value) == "IntervalTier";
        } else if let Some(value) = parse_assignment_value(line, "name") {
            tier.name = Some(unescape(strip_quotes(value)));
        } else if let Some(value) = parse_assignment_value(line, "xmin") {
            xmin = Some(parse_number(value, "xmin")?);
        } else if let Some(value) = parse_assignment_value(line, "xmax") {
            xmax = Some(parse_number(value, "xmax")?);
        } else if let Some(value) = parse_assignment_value(line, "text") {
            let start = xmin.ok_or("missing xmin before text")?;
            let end = xmax.ok_or("missing xmax before text")?;
            tier.intervals
                .push(WordInterval::new(start, end, unescape(strip_quotes(value))));
            xmin = None;
            xmax = None;
        }
    }

    if let Some(tier) = current.and_then(PendingTier::finish) {
        tiers.push(tier);
    }

    if tiers.is_empty() {
        return Err("no interval tiers found".to_string());
    }
    Ok(tiers)
}

#[derive(Default)]
struct PendingTier {
    name: Option<String>,
    is_interval_tier: bool,
    intervals: Vec<WordInterval>,
}

impl PendingTier {
    fn finish(self) -> Option<Tier> {
        if !self.is_interval_tier {
            return None;
        }
        Some(Tier::new(self.name.unwrap_or_default(), self.intervals))
    }
}

fn parse_assignment_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (lhs, rhs) = line.split_once('=')?;
    if lhs.trim() == key {
        Some(rhs.trim())
    } else {
        None
    }
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
}

/// Praat doubles embedded quotes
fn unescape(value: &str) -> String {
    value.replace("\"\"", "\"")
}

fn parse_number(value: &str, field: &str) -> std::result::Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("failed to parse {field}='{value}': {err}"))
}
