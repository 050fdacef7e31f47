//! Data model and wire types shared by the MitoSpace client and server.

mod dataset;
mod sample;
mod types;

pub use dataset::{parse_points, DatasetError, ParsedDataset};
pub use sample::{Media, MetadataValue, Phenotype, Rgb, Sample, Treatment};
pub use types::{DatasetInfo, DatasetKind, DatasetListResponse, DatasetMetadataResponse, ErrorResponse};

/// Dataset id of the 2D (static) embedding
pub const DATASET_2D: &str = "points2d";
/// Dataset id of the 4D (time series) embedding
pub const DATASET_4D: &str = "points4d";
