use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::sample::Sample;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Document has no `points` array")]
    MissingPoints,
}

/// Samples parsed from one dataset document
#[derive(Debug, Clone, Default)]
pub struct ParsedDataset {
    pub version: Option<String>,
    pub samples: Vec<Sample>,
    /// Records under `points` without usable coordinates
    pub skipped: usize,
}

impl ParsedDataset {
    /// Sorted distinct timepoints (absent `t` counts as 0)
    pub fn timepoints(&self) -> Vec<u32> {
        let mut times: Vec<u32> = self.samples.iter().map(Sample::timepoint).collect();
        times.sort_unstable();
        times.dedup();
        times
    }

    pub fn is_time_series(&self) -> bool {
        self.samples.iter().any(|s| s.t.is_some())
    }
}

/// Parse a `{ "points": [...] }` document.
///
/// Records without usable coordinates are skipped and counted; other fields
/// fall back to defaults. Only an unreadable document or a missing `points`
/// array is an error.
pub fn parse_points(json: &str) -> Result<ParsedDataset, DatasetError> {
    let document: Value = serde_json::from_str(json)?;

    let version = document.get("version").and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    let points = document
        .get("points")
        .and_then(Value::as_array)
        .ok_or(DatasetError::MissingPoints)?;

    let mut samples = Vec::with_capacity(points.len());
    let mut skipped = 0;
    for (index, record) in points.iter().enumerate() {
        match Sample::deserialize(record) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                log::warn!("Skipping malformed sample #{}: {}", index, e);
                skipped += 1;
            }
        }
    }

    Ok(ParsedDataset {
        version,
        samples,
        skipped,
    })
}
