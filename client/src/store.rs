use mitospace_shared::{parse_points, Phenotype, Sample};
use std::sync::Arc;

/// Shared, immutable list of samples. Views over it clone the `Arc`s, never the samples.
pub type SampleList = Arc<[Arc<Sample>]>;

/// Both datasets, loaded once at startup
#[derive(Clone)]
pub struct SampleStore {
    samples_2d: SampleList,
    samples_4d: SampleList,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self {
            samples_2d: empty_list(),
            samples_4d: empty_list(),
        }
    }
}

impl SampleStore {
    pub fn from_samples(samples_2d: Vec<Sample>, samples_4d: Vec<Sample>) -> Self {
        Self {
            samples_2d: into_list(samples_2d),
            samples_4d: into_list(samples_4d),
        }
    }

    /// Build the store from raw documents. A missing or unreadable document
    /// degrades to an empty list.
    pub fn from_documents(json_2d: Option<&str>, json_4d: Option<&str>) -> Self {
        Self {
            samples_2d: load_document("2D", json_2d),
            samples_4d: load_document("4D", json_4d),
        }
    }

    pub fn samples_2d(&self) -> &SampleList {
        &self.samples_2d
    }

    pub fn samples_4d(&self) -> &SampleList {
        &self.samples_4d
    }
}

fn empty_list() -> SampleList {
    Arc::from(Vec::new())
}

fn into_list(samples: Vec<Sample>) -> SampleList {
    samples.into_iter().map(Arc::new).collect()
}

fn load_document(label: &str, json: Option<&str>) -> SampleList {
    let Some(json) = json else {
        log::warn!("No {} dataset available, using an empty sample list", label);
        return empty_list();
    };

    match parse_points(json) {
        Ok(parsed) => {
            if parsed.skipped > 0 {
                log::warn!("{} dataset: skipped {} malformed records", label, parsed.skipped);
            }
            log::info!("{} dataset: {} samples", label, parsed.samples.len());
            into_list(parsed.samples)
        }
        Err(e) => {
            log::warn!("{} dataset unreadable ({}), using an empty sample list", label, e);
            empty_list()
        }
    }
}

/// Case-insensitive substring filter over drug name, phenotype label and
/// metadata values. The query is used as typed, surrounding spaces included;
/// only an empty query returns the input list itself.
pub fn filter(samples: &SampleList, query: &str) -> SampleList {
    if query.is_empty() {
        return Arc::clone(samples);
    }

    let query = query.to_lowercase();
    samples
        .iter()
        .filter(|sample| matches_query(sample, &query))
        .cloned()
        .collect()
}

fn matches_query(sample: &Sample, query: &str) -> bool {
    sample.treatment.drug.to_lowercase().contains(query)
        || sample.phenotype.to_lowercase().contains(query)
        || sample
            .metadata
            .values()
            .any(|value| value.to_string().to_lowercase().contains(query))
}

/// Sorted distinct timepoints (absent `t` counts as 0)
pub fn timepoints(samples: &[Arc<Sample>]) -> Vec<u32> {
    let mut times: Vec<u32> = samples.iter().map(|s| s.timepoint()).collect();
    times.sort_unstable();
    times.dedup();
    times
}

/// First sample labelled as a control, the initial selection of the 2D view
pub fn first_control(samples: &SampleList) -> Option<Arc<Sample>> {
    samples
        .iter()
        .find(|s| s.phenotype_class() == Phenotype::Control)
        .cloned()
}
