use glam::Vec3;
use std::time::Duration;

/// Tunables of the point cloud view
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Multiplier applied to centered sample coordinates
    pub scale_factor: f32,
    /// Above this many samples `RenderingMode::Auto` switches to instanced spheres
    pub instancing_threshold: usize,
    /// Camera position the view starts at and resets to
    pub home_position: Vec3,
    /// Vertical field of view (degrees)
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Closest the camera may dolly to its target
    pub min_distance: f32,
    /// Farthest the camera may dolly from its target
    pub max_distance: f32,
    /// Fraction of accumulated controller motion applied per frame
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    /// Length of the animated return to the home position
    pub reset_duration: Duration,
    /// Minimum distance from the pick ray within which a point sprite counts as hit
    pub point_pick_threshold: f32,
    /// Instanced sphere radius per unit of point size
    pub instance_radius_scale: f32,
    pub highlight_radius: f32,
    pub highlight_opacity: f32,
    /// Edge length of the generated point sprite texture (pixels)
    pub sprite_texture_size: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            scale_factor: 4.0,
            instancing_threshold: 1000,
            home_position: Vec3::new(25.0, 25.0, 25.0),
            fov_degrees: 50.0,
            near: 0.1,
            far: 1000.0,
            min_distance: 1.0,
            max_distance: 300.0,
            damping_factor: 0.05,
            rotate_speed: 0.8,
            pan_speed: 0.8,
            zoom_speed: 2.0,
            reset_duration: Duration::from_secs(1),
            point_pick_threshold: 1.0,
            instance_radius_scale: 0.2,
            highlight_radius: 1.0,
            highlight_opacity: 0.8,
            sprite_texture_size: 64,
        }
    }
}

/// Base URL of the dataset API
pub fn api_base() -> String {
    if cfg!(target_arch = "wasm32") {
        String::new()
    } else {
        "http://localhost:9000".to_string()
    }
}
