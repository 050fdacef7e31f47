use mitospace_shared::{DatasetInfo, DATASET_2D, DATASET_4D};
use std::collections::HashMap;
use std::path::Path;

use crate::dataset_reader::DatasetFile;

/// Application state shared across all request handlers
pub struct AppState {
    /// Map of dataset ID to loaded document
    pub datasets: HashMap<String, DatasetFile>,
}

impl AppState {
    /// Create new app state by loading the known dataset documents from a directory
    pub async fn new(data_dir: &Path) -> Self {
        let mut datasets = HashMap::new();

        if !data_dir.is_dir() {
            log::warn!("Data directory not found: {}", data_dir.display());
            return Self { datasets };
        }

        for id in [DATASET_2D, DATASET_4D] {
            let file_path = data_dir.join(format!("{}.json", id));
            match DatasetFile::open(&file_path).await {
                Ok(dataset) => {
                    log::info!(
                        "Loaded dataset: {} from {} ({} samples, {} skipped, {} timepoints)",
                        dataset.info.name,
                        dataset.path.display(),
                        dataset.info.sample_count,
                        dataset.info.skipped_records,
                        dataset.info.timepoints.len()
                    );
                    datasets.insert(dataset.info.id.clone(), dataset);
                }
                Err(e) => {
                    log::warn!("Failed to load {:?}: {}", file_path, e);
                }
            }
        }

        Self { datasets }
    }

    /// Get dataset info list, sorted by id
    pub fn list_datasets(&self) -> Vec<DatasetInfo> {
        let mut infos: Vec<DatasetInfo> = self.datasets.values().map(|d| d.info.clone()).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Get a specific dataset
    pub fn get_dataset(&self, id: &str) -> Option<&DatasetFile> {
        self.datasets.get(id)
    }
}
