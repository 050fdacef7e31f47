use glam::{Vec2, Vec3};
use mitospace_client::config::ViewerConfig;
use mitospace_client::renderer::{Gesture, PickOutcome, PointCloudBuilder, SceneObject, StrategyKind};
use mitospace_client::state::{ColoringMode, RenderingMode, ViewerState, VisualizerOptions};
use mitospace_client::store::SampleList;
use mitospace_client::viewer::{DatasetLayout, Viewer};
use mitospace_shared::{Rgb, Sample};
use std::sync::Arc;

const EPS: f32 = 1e-4;

fn samples(points: &[(f32, f32, f32)]) -> SampleList {
    points
        .iter()
        .enumerate()
        .map(|(i, &(x, y, z))| {
            let mut sample = Sample::at(format!("s{}", i), x, y, z);
            sample.color = Rgb::new(0.9, 0.1 * i as f32, 0.2);
            sample.color_phenotypic = Rgb::new(0.1, 0.8, 0.05 * i as f32);
            Arc::new(sample)
        })
        .collect()
}

fn timed(times: &[u32]) -> SampleList {
    times
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            let mut sample = Sample::at(format!("t{}", i), i as f32, 0.0, 0.0);
            sample.t = Some(t);
            Arc::new(sample)
        })
        .collect()
}

fn viewer(layout: DatasetLayout) -> Viewer {
    let mut viewer = Viewer::new(ViewerConfig::default(), layout);
    assert!(viewer.attach(800.0, 600.0));
    viewer
}

/// Screen position (NDC) of point `index` of the active cloud
fn ndc_of(viewer: &Viewer, index: usize) -> Vec2 {
    let slot = viewer.active_slot().expect("active cloud");
    let aspect = viewer.viewport().expect("attached").aspect_ratio();
    viewer.camera().project(slot.cloud.positions()[index], aspect)
}

fn visible_clouds(viewer: &Viewer) -> usize {
    viewer
        .scene()
        .nodes()
        .iter()
        .filter(|node| node.visible && matches!(node.object, SceneObject::Cloud(_)))
        .count()
}

#[test]
fn scenario_a_centering_and_scaling() {
    let builder = PointCloudBuilder::new(&ViewerConfig::default());
    let list = samples(&[(0.0, 0.0, 0.0), (2.0, 0.0, 0.0), (4.0, 0.0, 0.0)]);
    let cloud = builder.build(&list, &VisualizerOptions::default()).unwrap();

    assert!((cloud.centroid() - Vec3::new(2.0, 0.0, 0.0)).length() < EPS);
    let expected = [Vec3::new(-8.0, 0.0, 0.0), Vec3::ZERO, Vec3::new(8.0, 0.0, 0.0)];
    for (actual, expected) in cloud.positions().iter().zip(expected) {
        assert!((*actual - expected).length() < EPS, "{actual} != {expected}");
    }
}

#[test]
fn scenario_b_time_slices() {
    let mut viewer = viewer(DatasetLayout::TimeSeries);
    let mut state = ViewerState::new();
    let list = timed(&[0, 0, 1]);

    viewer.sync(&state, &list);
    assert_eq!(viewer.scene().cloud_count(), 2);
    assert_eq!(visible_clouds(&viewer), 1);
    assert_eq!(viewer.point_count(), 2);

    state.set_timepoint(1);
    viewer.sync(&state, &list);
    assert_eq!(visible_clouds(&viewer), 1);
    assert_eq!(viewer.point_count(), 1);
    assert_eq!(viewer.active_slot().unwrap().cloud.samples()[0].id, "t2");

    // No slice at this timepoint
    state.set_timepoint(5);
    viewer.sync(&state, &list);
    assert_eq!(visible_clouds(&viewer), 0);
    assert!(matches!(viewer.handle_click(Vec2::ZERO, &mut state), PickOutcome::Miss));
}

#[test]
fn scenario_c_click_during_drag_is_ignored() {
    let mut viewer = viewer(DatasetLayout::Static);
    let mut state = ViewerState::new();
    let list = samples(&[(0.0, 0.0, 0.0), (3.0, 0.0, 0.0)]);
    viewer.sync(&state, &list);
    let target = ndc_of(&viewer, 1);

    viewer.begin_gesture(Gesture::Rotate);
    assert!(matches!(viewer.handle_click(target, &mut state), PickOutcome::Ignored));
    assert!(state.selected().is_none());
    assert_eq!(viewer.scene().highlight_count(), 0);

    viewer.end_gesture();
    assert!(matches!(viewer.handle_click(target, &mut state), PickOutcome::Hit { .. }));
    assert!(Arc::ptr_eq(state.selected().unwrap(), &list[1]));
    assert_eq!(viewer.scene().highlight_count(), 1);
}

#[test]
fn scenario_d_coloring_mode_recolors_in_place() {
    let mut viewer = viewer(DatasetLayout::Static);
    let mut state = ViewerState::new();
    let list = samples(&[(0.0, 0.0, 0.0), (1.0, 2.0, 3.0), (-1.0, 0.5, 2.0)]);

    viewer.sync(&state, &list);
    let before = Arc::clone(&viewer.active_slot().unwrap().cloud);

    assert!(state.set_coloring_mode(ColoringMode::Phenotype));
    viewer.sync(&state, &list);
    let after = Arc::clone(&viewer.active_slot().unwrap().cloud);

    assert_eq!(before.positions(), after.positions());
    for (i, sample) in list.iter().enumerate() {
        assert_eq!(before.colors()[i].to_array(), sample.color.to_array());
        assert_eq!(after.colors()[i].to_array(), sample.color_phenotypic.to_array());
    }
    assert_eq!(viewer.scene().cloud_count(), 1);
}

#[test]
fn picking_inverts_placement_for_both_strategies() {
    let list = samples(&[
        (0.0, 0.0, 0.0),
        (3.0, 0.0, 0.0),
        (0.0, 3.0, 0.0),
        (0.0, 0.0, 3.0),
        (-3.0, 0.0, 0.0),
    ]);

    for (mode, kind) in [
        (RenderingMode::Points, StrategyKind::PointSprites),
        (RenderingMode::Instanced, StrategyKind::InstancedSpheres),
    ] {
        let mut viewer = viewer(DatasetLayout::Static);
        let mut state = ViewerState::new();
        state.set_rendering_mode(mode);
        viewer.sync(&state, &list);
        assert_eq!(viewer.active_slot().unwrap().cloud.kind(), kind);

        for (i, sample) in list.iter().enumerate() {
            let ndc = ndc_of(&viewer, i);
            match viewer.handle_click(ndc, &mut state) {
                PickOutcome::Hit { sample: hit, index, .. } => {
                    assert_eq!(index, i, "{:?}", kind);
                    assert!(Arc::ptr_eq(&hit, sample));
                }
                other => panic!("{:?}: expected a hit on {}, got {:?}", kind, i, other),
            }
            assert!(Arc::ptr_eq(state.selected().unwrap(), sample));
            let marker = viewer.highlight().unwrap();
            assert!((marker.position - viewer.active_slot().unwrap().cloud.positions()[i]).length() < EPS);
        }
        assert_eq!(viewer.scene().highlight_count(), 1);
    }
}

#[test]
fn miss_keeps_selection_and_highlight() {
    let mut viewer = viewer(DatasetLayout::Static);
    let mut state = ViewerState::new();
    let list = samples(&[(0.0, 0.0, 0.0)]);
    viewer.sync(&state, &list);

    let hit = viewer.handle_click(ndc_of(&viewer, 0), &mut state);
    assert!(matches!(hit, PickOutcome::Hit { .. }));
    let revision = state.revisions().selection;

    let miss = viewer.handle_click(Vec2::new(0.95, 0.95), &mut state);
    assert!(matches!(miss, PickOutcome::Miss));
    assert_eq!(state.revisions().selection, revision);
    assert!(state.selected().is_some());
    assert_eq!(viewer.scene().highlight_count(), 1);
}

#[test]
fn repeated_rebuilds_leave_one_cloud() {
    let mut viewer = viewer(DatasetLayout::Static);
    let mut state = ViewerState::new();
    let list = samples(&[(0.0, 0.0, 0.0), (1.0, 1.0, 1.0)]);

    for i in 0..10 {
        state.set_point_size(1.0 + i as f32);
        viewer.sync(&state, &list);
        assert_eq!(viewer.scene().cloud_count(), 1);
    }
}

#[test]
fn timepoint_switches_keep_built_geometry() {
    let mut viewer = viewer(DatasetLayout::TimeSeries);
    let mut state = ViewerState::new();
    let list = timed(&[0, 1, 1, 2]);
    viewer.sync(&state, &list);
    let t0 = Arc::clone(&viewer.active_slot().unwrap().cloud);

    state.set_timepoint(1);
    viewer.sync(&state, &list);
    let t1 = Arc::clone(&viewer.active_slot().unwrap().cloud);
    assert!(!Arc::ptr_eq(&t0, &t1));

    state.set_timepoint(0);
    viewer.sync(&state, &list);
    assert!(Arc::ptr_eq(&viewer.active_slot().unwrap().cloud, &t0));

    state.set_timepoint(1);
    viewer.sync(&state, &list);
    assert!(Arc::ptr_eq(&viewer.active_slot().unwrap().cloud, &t1));
    assert_eq!(viewer.scene().cloud_count(), 3);
}

#[test]
fn highlight_follows_timepoint_changes() {
    let mut viewer = viewer(DatasetLayout::TimeSeries);
    let mut state = ViewerState::new();
    let list = timed(&[0, 1]);
    viewer.sync(&state, &list);

    viewer.handle_click(ndc_of(&viewer, 0), &mut state);
    assert!(viewer.highlight().is_some());

    // The selected sample is not drawn at timepoint 1
    state.set_timepoint(1);
    viewer.sync(&state, &list);
    assert!(viewer.highlight().is_none());
    assert!(Arc::ptr_eq(state.selected().unwrap(), &list[0]));

    state.set_timepoint(0);
    viewer.sync(&state, &list);
    assert!(viewer.highlight().is_some());
}

#[test]
fn filtering_rebuilds_from_the_matching_subset() {
    let mut viewer = viewer(DatasetLayout::Static);
    let mut state = ViewerState::new();
    let mut a = Sample::at("a", 0.0, 0.0, 0.0);
    a.treatment.drug = "Oligomycin".into();
    let mut b = Sample::at("b", 10.0, 0.0, 0.0);
    b.treatment.drug = "DMSO".into();
    let list: SampleList = vec![Arc::new(a), Arc::new(b)].into();

    viewer.sync(&state, &list);
    assert_eq!(viewer.point_count(), 2);

    state.set_query("dmso");
    viewer.sync(&state, &list);
    let cloud = Arc::clone(&viewer.active_slot().unwrap().cloud);
    assert_eq!(cloud.len(), 1);
    assert!(Arc::ptr_eq(&cloud.samples()[0], &list[1]));
    // Centered on the filtered subset
    assert!(cloud.positions()[0].length() < EPS);
}
