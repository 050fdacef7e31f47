//! Option and selection state shared by the viewer, the controls and the detail panel.
//!
//! Every field is private; setters are the only way to change state. A setter
//! bumps the matching revision only when the value actually changes, which is
//! what the viewer watches to decide between a full rebuild, a visibility
//! switch, or a highlight refresh.

use glam::Vec3;
use mitospace_shared::{Rgb, Sample};
use std::sync::Arc;

pub const MIN_POINT_SIZE: f32 = 0.1;
pub const MAX_POINT_SIZE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColoringMode {
    #[default]
    Treatment,
    Phenotype,
}

impl ColoringMode {
    pub fn label(&self) -> &'static str {
        match self {
            ColoringMode::Treatment => "Treatment",
            ColoringMode::Phenotype => "Phenotype",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderingMode {
    /// Pick by sample count
    #[default]
    Auto,
    Points,
    Instanced,
}

impl RenderingMode {
    pub fn label(&self) -> &'static str {
        match self {
            RenderingMode::Auto => "Auto",
            RenderingMode::Points => "Points",
            RenderingMode::Instanced => "Instanced",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerOptions {
    pub coloring_mode: ColoringMode,
    pub point_size: f32,
    pub background_color: Rgb,
    pub rendering_mode: RenderingMode,
    pub current_timepoint: u32,
}

impl Default for VisualizerOptions {
    fn default() -> Self {
        Self {
            coloring_mode: ColoringMode::Treatment,
            point_size: 1.5,
            background_color: Rgb::WHITE,
            rendering_mode: RenderingMode::Auto,
            current_timepoint: 0,
        }
    }
}

/// Display color of a sample under a coloring mode, clamped for rendering
pub fn display_color(sample: &Sample, mode: ColoringMode) -> Rgb {
    match mode {
        ColoringMode::Treatment => sample.color.clamped(),
        ColoringMode::Phenotype => sample.color_phenotypic.clamped(),
    }
}

pub fn rgb_to_vec3(color: Rgb) -> Vec3 {
    Vec3::from_array(color.to_array())
}

/// Monotonic change counters, one per kind of downstream work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Revisions {
    /// Anything that requires rebuilding geometry
    pub geometry: u64,
    pub timepoint: u64,
    pub selection: u64,
}

#[derive(Default)]
pub struct ViewerState {
    options: VisualizerOptions,
    query: String,
    selected: Option<Arc<Sample>>,
    revisions: Revisions,
}

impl ViewerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &VisualizerOptions {
        &self.options
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected(&self) -> Option<&Arc<Sample>> {
        self.selected.as_ref()
    }

    pub fn revisions(&self) -> Revisions {
        self.revisions
    }

    pub fn set_coloring_mode(&mut self, mode: ColoringMode) -> bool {
        if self.options.coloring_mode == mode {
            return false;
        }
        self.options.coloring_mode = mode;
        self.revisions.geometry += 1;
        true
    }

    /// Point size is clamped into [`MIN_POINT_SIZE`, `MAX_POINT_SIZE`]; non-finite input is rejected
    pub fn set_point_size(&mut self, size: f32) -> bool {
        if !size.is_finite() {
            return false;
        }
        let size = size.clamp(MIN_POINT_SIZE, MAX_POINT_SIZE);
        if self.options.point_size == size {
            return false;
        }
        self.options.point_size = size;
        self.revisions.geometry += 1;
        true
    }

    /// Background is read every frame, so no revision is needed
    pub fn set_background_color(&mut self, color: Rgb) -> bool {
        let color = color.clamped();
        if self.options.background_color == color {
            return false;
        }
        self.options.background_color = color;
        true
    }

    pub fn set_rendering_mode(&mut self, mode: RenderingMode) -> bool {
        if self.options.rendering_mode == mode {
            return false;
        }
        self.options.rendering_mode = mode;
        self.revisions.geometry += 1;
        true
    }

    pub fn set_timepoint(&mut self, t: u32) -> bool {
        if self.options.current_timepoint == t {
            return false;
        }
        self.options.current_timepoint = t;
        self.revisions.timepoint += 1;
        true
    }

    pub fn set_query(&mut self, query: &str) -> bool {
        if self.query == query {
            return false;
        }
        self.query = query.to_string();
        self.revisions.geometry += 1;
        true
    }

    /// Select a sample; selecting the current selection again is a no-op
    pub fn select(&mut self, sample: Arc<Sample>) -> bool {
        if self
            .selected
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &sample))
        {
            return false;
        }
        log::debug!("Selected sample {}", sample.id);
        self.selected = Some(sample);
        self.revisions.selection += 1;
        true
    }

    /// Clear the selection; clearing an empty selection is a no-op
    pub fn clear_selection(&mut self) -> bool {
        if self.selected.take().is_none() {
            return false;
        }
        self.revisions.selection += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_bump_revisions_only_on_change() {
        let mut state = ViewerState::new();
        let start = state.revisions();

        assert!(!state.set_coloring_mode(ColoringMode::Treatment));
        assert_eq!(state.revisions(), start);

        assert!(state.set_coloring_mode(ColoringMode::Phenotype));
        assert!(state.set_point_size(3.0));
        assert!(state.set_rendering_mode(RenderingMode::Instanced));
        assert!(state.set_query("dmso"));
        assert_eq!(state.revisions().geometry, start.geometry + 4);

        assert!(state.set_timepoint(2));
        assert_eq!(state.revisions().timepoint, start.timepoint + 1);
        assert_eq!(state.revisions().geometry, start.geometry + 4);
    }

    #[test]
    fn point_size_is_validated() {
        let mut state = ViewerState::new();
        assert!(state.set_point_size(100.0));
        assert_eq!(state.options().point_size, MAX_POINT_SIZE);
        assert!(state.set_point_size(0.0));
        assert_eq!(state.options().point_size, MIN_POINT_SIZE);
        assert!(!state.set_point_size(f32::NAN));
    }

    #[test]
    fn selection_is_idempotent() {
        let mut state = ViewerState::new();
        let sample = Arc::new(Sample::at("s", 0.0, 0.0, 0.0));

        assert!(!state.clear_selection());
        assert!(state.select(Arc::clone(&sample)));
        let rev = state.revisions().selection;
        assert!(!state.select(Arc::clone(&sample)));
        assert_eq!(state.revisions().selection, rev);

        assert!(state.clear_selection());
        assert!(state.selected().is_none());
        assert!(!state.clear_selection());
    }

    #[test]
    fn display_color_follows_mode_and_clamps() {
        let mut sample = Sample::at("s", 0.0, 0.0, 0.0);
        sample.color = Rgb::new(1.5, 0.2, 0.3);
        sample.color_phenotypic = Rgb::new(0.0, -1.0, 0.9);

        assert_eq!(display_color(&sample, ColoringMode::Treatment), Rgb::new(1.0, 0.2, 0.3));
        assert_eq!(display_color(&sample, ColoringMode::Phenotype), Rgb::new(0.0, 0.0, 0.9));
    }
}
