use mitospace_shared::{parse_points, DatasetInfo, DatasetKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid dataset: {0}")]
    Parse(#[from] mitospace_shared::DatasetError),
    #[error("Loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A dataset document loaded from disk
pub struct DatasetFile {
    pub info: DatasetInfo,
    pub path: PathBuf,
    /// Raw document body, served as-is
    body: String,
}

impl DatasetFile {
    /// Read and validate a dataset document
    pub async fn open(path: &Path) -> Result<Self, DatasetError> {
        let path_buf = path.to_path_buf();
        let path_clone = path_buf.clone();

        let body = tokio::task::spawn_blocking(move || std::fs::read_to_string(&path_clone))
            .await??;

        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let info = Self::describe(id, &body)?;

        Ok(Self {
            info,
            path: path_buf,
            body,
        })
    }

    /// Build the listing entry for a document body
    pub fn describe(id: String, body: &str) -> Result<DatasetInfo, DatasetError> {
        let parsed = parse_points(body)?;

        let kind = if parsed.is_time_series() {
            DatasetKind::TimeSeries
        } else {
            DatasetKind::Static
        };

        let name = match kind {
            DatasetKind::Static => format!("{} (2D)", id),
            DatasetKind::TimeSeries => format!("{} (4D)", id),
        };

        Ok(DatasetInfo {
            id,
            name,
            kind,
            version: parsed.version.clone(),
            sample_count: parsed.samples.len(),
            skipped_records: parsed.skipped,
            timepoints: parsed.timepoints(),
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}
