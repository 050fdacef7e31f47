//! The point cloud view: scene, camera, controller, and the dataset layout
//! (a single cloud or one cloud per timepoint).
//!
//! The viewer is driven once per frame: [`Viewer::sync`] applies whatever
//! changed in [`ViewerState`] since the last frame, then [`Viewer::tick`]
//! advances the camera and captures a [`FrameSnapshot`] for the renderer.

use glam::{Vec2, Vec3};
use mitospace_shared::Sample;
use std::sync::Arc;

use crate::config::ViewerConfig;
use crate::renderer::{
    pick, Camera, CloudSlot, FrameSnapshot, Gesture, HighlightMarker, NodeId, OrbitController,
    PickOutcome, PointCloudBuilder, Scene, SceneObject,
};
use crate::state::{Revisions, ViewerState, VisualizerOptions};
use crate::store::{self, SampleList};
use crate::time_slices::TimeSliceIndex;

/// Zoom buttons dolly by this many world units
pub const ZOOM_STEP: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetLayout {
    Static,
    TimeSeries,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    fn new(width: f32, height: f32) -> Option<Self> {
        let valid = |v: f32| v.is_finite() && v >= 1.0;
        (valid(width) && valid(height)).then_some(Self { width, height })
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

#[derive(Debug)]
enum Slots {
    Static(Option<CloudSlot>),
    TimeSeries(TimeSliceIndex),
}

/// What the scene was last built from
struct Applied {
    revisions: Revisions,
    source: SampleList,
}

pub struct Viewer {
    config: ViewerConfig,
    builder: PointCloudBuilder,
    scene: Scene,
    camera: Camera,
    controls: OrbitController,
    viewport: Option<Viewport>,
    slots: Slots,
    highlight: Option<NodeId>,
    applied: Option<Applied>,
    torn_down: bool,
}

impl Viewer {
    pub fn new(config: ViewerConfig, layout: DatasetLayout) -> Self {
        let camera = Camera::looking_at(
            config.home_position,
            Vec3::ZERO,
            config.fov_degrees.to_radians(),
            config.near,
            config.far,
        );
        let slots = match layout {
            DatasetLayout::Static => Slots::Static(None),
            DatasetLayout::TimeSeries => Slots::TimeSeries(TimeSliceIndex::new()),
        };
        Self {
            builder: PointCloudBuilder::new(&config),
            controls: OrbitController::new(&config),
            scene: Scene::new(),
            camera,
            viewport: None,
            slots,
            highlight: None,
            applied: None,
            torn_down: false,
            config,
        }
    }

    /// Attach to a viewport. A zero-sized viewport leaves the viewer detached.
    pub fn attach(&mut self, width: f32, height: f32) -> bool {
        if self.torn_down {
            return false;
        }
        match Viewport::new(width, height) {
            Some(viewport) => {
                if self.viewport.is_none() {
                    log::info!("Viewer attached ({}x{})", width, height);
                }
                self.viewport = Some(viewport);
                true
            }
            None => {
                log::warn!("Cannot attach viewer to a {}x{} viewport", width, height);
                false
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.viewport.is_some() && !self.torn_down
    }

    /// Zero-sized viewports are ignored
    pub fn resize(&mut self, width: f32, height: f32) {
        if !self.is_attached() {
            return;
        }
        if let Some(viewport) = Viewport::new(width, height) {
            self.viewport = Some(viewport);
        }
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The cloud picking runs against: the static cloud, or the visible time slice
    pub fn active_slot(&self) -> Option<&CloudSlot> {
        match &self.slots {
            Slots::Static(slot) => slot.as_ref(),
            Slots::TimeSeries(index) => index.active_slot(),
        }
    }

    /// Points rendered by the active cloud
    pub fn point_count(&self) -> usize {
        self.active_slot().map_or(0, |slot| slot.cloud.len())
    }

    pub fn highlight(&self) -> Option<&HighlightMarker> {
        let node = self.scene.get(self.highlight?)?;
        match &node.object {
            SceneObject::Highlight(marker) => Some(marker),
            SceneObject::Cloud(_) => None,
        }
    }

    /// Apply pending option, query, timepoint and selection changes.
    /// `source` is the full dataset; the query filter is applied here.
    pub fn sync(&mut self, state: &ViewerState, source: &SampleList) {
        if self.torn_down {
            return;
        }
        let revisions = state.revisions();
        let (rebuild, timepoint, selection) = match &self.applied {
            None => (true, false, false),
            Some(applied) => (
                applied.revisions.geometry != revisions.geometry || !Arc::ptr_eq(&applied.source, source),
                applied.revisions.timepoint != revisions.timepoint,
                applied.revisions.selection != revisions.selection,
            ),
        };

        if rebuild {
            let visible = store::filter(source, state.query());
            self.rebuild(&visible, state.options());
        } else if timepoint {
            self.set_timepoint(state.options().current_timepoint);
        }
        if rebuild || timepoint || selection {
            self.refresh_highlight(state.selected());
        }

        self.scene.background = state.options().background_color;
        self.applied = Some(Applied {
            revisions,
            source: Arc::clone(source),
        });
    }

    /// Rebuild the dataset's clouds from `samples`. The previous clouds are
    /// removed from the scene first; an empty list leaves nothing to draw.
    pub fn rebuild(&mut self, samples: &SampleList, options: &VisualizerOptions) {
        if self.torn_down {
            return;
        }
        match &mut self.slots {
            Slots::Static(slot) => {
                let cloud = self.builder.build(samples, options);
                CloudSlot::replace(slot, &mut self.scene, cloud, true);
            }
            Slots::TimeSeries(index) => {
                index.rebuild(&mut self.scene, &self.builder, samples, options);
            }
        }
        log::debug!("Rebuilt view with {} samples", samples.len());
    }

    /// Show the slice at `t`; a no-op for static datasets
    pub fn set_timepoint(&mut self, t: u32) {
        if self.torn_down {
            return;
        }
        if let Slots::TimeSeries(index) = &mut self.slots {
            index.set_active(&mut self.scene, t);
        }
    }

    fn remove_highlight(&mut self) {
        if let Some(node) = self.highlight.take() {
            self.scene.remove(node);
        }
    }

    fn place_highlight(&mut self, slot_cloud_index: usize) {
        self.remove_highlight();
        let Some(slot) = self.active_slot() else {
            return;
        };
        let cloud = &slot.cloud;
        let (Some(&position), Some(&color)) = (
            cloud.positions().get(slot_cloud_index),
            cloud.colors().get(slot_cloud_index),
        ) else {
            return;
        };
        let marker = HighlightMarker {
            position,
            color,
            radius: self.config.highlight_radius,
            opacity: self.config.highlight_opacity,
        };
        self.highlight = Some(self.scene.add(SceneObject::Highlight(marker), true));
    }

    /// Move the highlight to `selected` in the active cloud, or remove it when
    /// the sample is not drawn there
    pub fn refresh_highlight(&mut self, selected: Option<&Arc<Sample>>) {
        if self.torn_down {
            return;
        }
        let index = selected.and_then(|sample| {
            self.active_slot()
                .and_then(|slot| slot.cloud.index_of(sample))
        });
        match index {
            Some(index) => self.place_highlight(index),
            None => self.remove_highlight(),
        }
    }

    /// Pick at a pointer position given in normalized device coordinates.
    /// A hit selects the sample and moves the highlight; a miss changes nothing.
    pub fn handle_click(&mut self, ndc: Vec2, state: &mut ViewerState) -> PickOutcome {
        if self.torn_down {
            return PickOutcome::Miss;
        }
        let Some(viewport) = self.viewport else {
            return PickOutcome::Miss;
        };
        let outcome = pick(
            &self.camera,
            viewport.aspect_ratio(),
            self.active_slot().map(|slot| slot.cloud.as_ref()),
            ndc,
            self.controls.is_interacting(),
        );
        if let PickOutcome::Hit { sample, index, .. } = &outcome {
            log::debug!("Picked sample {} at index {}", sample.id, index);
            state.select(Arc::clone(sample));
            self.place_highlight(*index);
        }
        outcome
    }

    pub fn begin_gesture(&mut self, gesture: Gesture) {
        self.controls.begin_gesture(gesture);
    }

    pub fn end_gesture(&mut self) {
        self.controls.end_gesture();
    }

    /// Feed a pointer drag (in points) to the active gesture
    pub fn drag(&mut self, delta: Vec2) {
        let Some(viewport) = self.viewport else {
            return;
        };
        match self.controls.gesture() {
            Some(Gesture::Rotate) => self.controls.rotate(delta, viewport.height),
            Some(Gesture::Pan) => self.controls.pan(delta, viewport.height, &self.camera),
            Some(Gesture::Dolly) => self.controls.dolly_drag(delta, viewport.height),
            None => {}
        }
    }

    pub fn scroll(&mut self, scroll: f32) {
        self.controls.wheel(scroll);
    }

    pub fn pinch(&mut self, factor: f32) {
        self.controls.pinch(factor);
    }

    pub fn zoom_in(&mut self) {
        self.controls.dolly_by(&mut self.camera, ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.controls.dolly_by(&mut self.camera, -ZOOM_STEP);
    }

    pub fn zoom_percentage(&self) -> u32 {
        crate::renderer::zoom_percentage(
            self.camera.distance,
            self.controls.min_distance(),
            self.controls.max_distance(),
        )
    }

    /// Animate back to the home position looking at the origin
    pub fn reset_camera(&mut self) {
        self.controls.reset(
            &self.camera,
            self.config.home_position,
            Vec3::ZERO,
            self.config.reset_duration.as_secs_f32(),
        );
    }

    /// Advance the camera and capture the frame. `None` while detached or after teardown.
    pub fn tick(&mut self, dt: f32) -> Option<FrameSnapshot> {
        if self.torn_down {
            return None;
        }
        let viewport = self.viewport?;
        self.controls.update(&mut self.camera, dt);
        Some(self.scene.snapshot(&self.camera, viewport.width, viewport.height))
    }

    /// Release every scene resource; later calls are no-ops
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        match &mut self.slots {
            Slots::Static(slot) => CloudSlot::replace(slot, &mut self.scene, None, false),
            Slots::TimeSeries(index) => index.clear(&mut self.scene),
        }
        self.highlight = None;
        self.scene.clear();
        self.controls.end_gesture();
        self.viewport = None;
        self.applied = None;
        self.torn_down = true;
        log::info!("Viewer torn down");
    }
}
