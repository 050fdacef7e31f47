use serde::{Deserialize, Serialize};

/// Whether a dataset carries a time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// 2D dataset, no `t` field
    Static,
    /// 4D dataset, samples grouped by `t`
    TimeSeries,
}

/// Information about a dataset available on the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Unique identifier for this dataset (file stem, e.g. "points2d")
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub kind: DatasetKind,
    /// Version declared by the document, if any
    pub version: Option<String>,
    /// Number of samples that parsed
    pub sample_count: usize,
    /// Number of records skipped as malformed
    pub skipped_records: usize,
    /// Sorted distinct timepoints
    pub timepoints: Vec<u32>,
}

/// Response for listing available datasets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetListResponse {
    pub datasets: Vec<DatasetInfo>,
}

/// Response for dataset metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadataResponse {
    pub info: DatasetInfo,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
