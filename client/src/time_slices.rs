//! Per-timepoint clouds of a time series dataset.
//!
//! Every timepoint gets its own cloud, built once per rebuild and centered on
//! its own centroid. Changing the active timepoint only flips visibility.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::renderer::{CloudSlot, PointCloudBuilder, Scene};
use crate::state::VisualizerOptions;
use crate::store::SampleList;

/// Split samples by timepoint, keeping their relative order within each group
pub fn group_by_time(samples: &SampleList) -> BTreeMap<u32, SampleList> {
    let mut groups: BTreeMap<u32, Vec<_>> = BTreeMap::new();
    for sample in samples.iter() {
        groups
            .entry(sample.timepoint())
            .or_default()
            .push(Arc::clone(sample));
    }
    groups
        .into_iter()
        .map(|(t, group)| (t, SampleList::from(group)))
        .collect()
}

#[derive(Debug, Default)]
pub struct TimeSliceIndex {
    slices: BTreeMap<u32, CloudSlot>,
    active: u32,
}

impl TimeSliceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every slice with clouds built from `samples`; only the group
    /// at `options.current_timepoint` is visible afterwards
    pub fn rebuild(
        &mut self,
        scene: &mut Scene,
        builder: &PointCloudBuilder,
        samples: &SampleList,
        options: &VisualizerOptions,
    ) {
        self.clear(scene);
        self.active = options.current_timepoint;

        for (t, group) in group_by_time(samples) {
            if let Some(cloud) = builder.build(&group, options) {
                let slot = CloudSlot::place(scene, cloud, t == self.active);
                self.slices.insert(t, slot);
            }
        }
        log::debug!(
            "Built {} time slices, active timepoint {}",
            self.slices.len(),
            self.active
        );
    }

    /// Show the slice at `t` and hide the others. An unknown timepoint hides everything.
    pub fn set_active(&mut self, scene: &mut Scene, t: u32) {
        self.active = t;
        for (&time, slot) in &self.slices {
            scene.set_visible(slot.node, time == t);
        }
    }

    pub fn active_slot(&self) -> Option<&CloudSlot> {
        self.slices.get(&self.active)
    }

    pub fn slot(&self, t: u32) -> Option<&CloudSlot> {
        self.slices.get(&t)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Remove every slice from the scene
    pub fn clear(&mut self, scene: &mut Scene) {
        for (_, slot) in std::mem::take(&mut self.slices) {
            scene.remove(slot.node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use mitospace_shared::Sample;

    fn samples(times: &[Option<u32>]) -> SampleList {
        times
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let mut sample = Sample::at(i.to_string(), i as f32, 0.0, 0.0);
                sample.t = t;
                Arc::new(sample)
            })
            .collect()
    }

    #[test]
    fn grouping_is_stable_and_treats_missing_time_as_zero() {
        let list = samples(&[Some(1), None, Some(0), Some(1)]);
        let groups = group_by_time(&list);
        let ids = |t: u32| groups[&t].iter().map(|s| s.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(0), vec!["1", "2"]);
        assert_eq!(ids(1), vec!["0", "3"]);
    }

    #[test]
    fn switching_only_changes_visibility() {
        let mut scene = Scene::new();
        let builder = PointCloudBuilder::new(&ViewerConfig::default());
        let mut index = TimeSliceIndex::new();
        index.rebuild(
            &mut scene,
            &builder,
            &samples(&[Some(0), Some(0), Some(1)]),
            &VisualizerOptions::default(),
        );

        assert_eq!(index.len(), 2);
        let t0 = index.slot(0).unwrap().clone();
        let t1 = index.slot(1).unwrap().clone();
        assert_eq!(scene.is_visible(t0.node), Some(true));
        assert_eq!(scene.is_visible(t1.node), Some(false));

        index.set_active(&mut scene, 1);
        assert_eq!(scene.is_visible(t0.node), Some(false));
        assert_eq!(scene.is_visible(t1.node), Some(true));
        assert!(Arc::ptr_eq(&index.active_slot().unwrap().cloud, &t1.cloud));

        index.set_active(&mut scene, 7);
        assert!(index.active_slot().is_none());
        assert_eq!(scene.is_visible(t1.node), Some(false));
    }

    #[test]
    fn rebuild_replaces_previous_slices() {
        let mut scene = Scene::new();
        let builder = PointCloudBuilder::new(&ViewerConfig::default());
        let mut index = TimeSliceIndex::new();
        let list = samples(&[Some(0), Some(1), Some(2)]);
        for _ in 0..3 {
            index.rebuild(&mut scene, &builder, &list, &VisualizerOptions::default());
        }
        assert_eq!(scene.cloud_count(), 3);

        index.clear(&mut scene);
        assert!(index.is_empty());
        assert!(scene.is_empty());
    }
}
