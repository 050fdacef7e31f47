use glam::{Vec2, Vec3};

use super::camera::Camera;
use crate::config::ViewerConfig;

/// Wheel scroll (in points) that counts as one notch
const SCROLL_NOTCH: f32 = 50.0;
/// Per-notch dolly scale at zoom speed 1
const DOLLY_SCALE: f32 = 0.95;
/// Residual motion below this is dropped
const EPSILON: f32 = 1e-6;

/// What a pointer drag does to the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Rotate,
    Pan,
    Dolly,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    from_position: Vec3,
    from_target: Vec3,
    to_position: Vec3,
    to_target: Vec3,
    elapsed: f32,
    duration: f32,
}

/// Quadratic ease-in-out on [0, 1]
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Zoom indicator: 100% at the closest distance, never below 5%
pub fn zoom_percentage(distance: f32, min_distance: f32, max_distance: f32) -> u32 {
    let span = (max_distance - min_distance).max(f32::EPSILON);
    let ratio = ((distance - min_distance) / span).clamp(0.0, 1.0);
    let zoomed_out = ((ratio * 100.0).round() as u32).min(95);
    100 - zoomed_out
}

/// Damped orbit / pan / dolly controller driving a [`Camera`]
///
/// Input accumulates deltas; [`OrbitController::update`] applies a fixed
/// fraction of them each frame and decays the rest, so motion keeps easing out
/// after the pointer is released.
#[derive(Debug, Clone)]
pub struct OrbitController {
    damping: f32,
    rotate_speed: f32,
    pan_speed: f32,
    zoom_speed: f32,
    min_distance: f32,
    max_distance: f32,
    yaw_delta: f32,
    pitch_delta: f32,
    pan_delta: Vec3,
    /// Pending change of ln(distance)
    dolly_delta: f32,
    gesture: Option<Gesture>,
    transition: Option<Transition>,
}

impl OrbitController {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            damping: config.damping_factor.clamp(0.0, 1.0),
            rotate_speed: config.rotate_speed,
            pan_speed: config.pan_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            yaw_delta: 0.0,
            pitch_delta: 0.0,
            pan_delta: Vec3::ZERO,
            dolly_delta: 0.0,
            gesture: None,
            transition: None,
        }
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// A user gesture cancels any running reset
    pub fn begin_gesture(&mut self, gesture: Gesture) {
        self.gesture = Some(gesture);
        self.transition = None;
    }

    pub fn end_gesture(&mut self) {
        self.gesture = None;
    }

    pub fn gesture(&self) -> Option<Gesture> {
        self.gesture
    }

    pub fn is_interacting(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Queue an orbit; dragging across the full viewport height is one turn
    pub fn rotate(&mut self, drag: Vec2, viewport_height: f32) {
        let k = std::f32::consts::TAU * self.rotate_speed / viewport_height.max(1.0);
        self.yaw_delta -= drag.x * k;
        self.pitch_delta += drag.y * k;
    }

    /// Queue a screen-space pan so the scene follows the pointer
    pub fn pan(&mut self, drag: Vec2, viewport_height: f32, camera: &Camera) {
        let world_per_pixel =
            2.0 * camera.distance * (camera.fov / 2.0).tan() / viewport_height.max(1.0);
        let (right, up) = camera.screen_axes();
        self.pan_delta += (-right * drag.x + up * drag.y) * world_per_pixel * self.pan_speed;
    }

    /// Queue a dolly from a vertical drag (down moves away)
    pub fn dolly_drag(&mut self, drag: Vec2, viewport_height: f32) {
        self.dolly_delta += drag.y / viewport_height.max(1.0) * self.zoom_speed;
    }

    /// Queue a dolly from wheel scroll (positive scrolls in)
    pub fn wheel(&mut self, scroll: f32) {
        let notches = scroll / SCROLL_NOTCH;
        self.dolly_delta += notches * self.zoom_speed * DOLLY_SCALE.ln();
    }

    /// Queue a dolly from a pinch zoom factor (> 1 zooms in)
    pub fn pinch(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.dolly_delta -= factor.ln();
        }
    }

    /// Immediate dolly toward (positive) or away from the target, clamped
    pub fn dolly_by(&mut self, camera: &mut Camera, amount: f32) {
        self.transition = None;
        camera.zoom(amount, self.min_distance, self.max_distance);
    }

    /// Start an animated return to `position` looking at `target`
    pub fn reset(&mut self, camera: &Camera, position: Vec3, target: Vec3, duration: f32) {
        self.clear_motion();
        self.transition = Some(Transition {
            from_position: camera.position(),
            from_target: camera.target,
            to_position: position,
            to_target: target,
            elapsed: 0.0,
            duration: duration.max(f32::EPSILON),
        });
    }

    fn clear_motion(&mut self) {
        self.yaw_delta = 0.0;
        self.pitch_delta = 0.0;
        self.pan_delta = Vec3::ZERO;
        self.dolly_delta = 0.0;
    }

    /// Advance one frame; returns whether the camera moved
    pub fn update(&mut self, camera: &mut Camera, dt: f32) -> bool {
        if let Some(transition) = self.transition.as_mut() {
            transition.elapsed += dt.max(0.0);
            let t = transition.elapsed / transition.duration;
            let eased = ease_in_out(t);
            camera.target = transition.from_target.lerp(transition.to_target, eased);
            camera.set_position(transition.from_position.lerp(transition.to_position, eased));
            if t >= 1.0 {
                self.transition = None;
            }
            return true;
        }

        let idle = self.yaw_delta.abs() < EPSILON
            && self.pitch_delta.abs() < EPSILON
            && self.pan_delta.length_squared() < EPSILON * EPSILON
            && self.dolly_delta.abs() < EPSILON;
        if idle {
            self.clear_motion();
            return false;
        }

        let f = self.damping;
        camera.rotate(self.yaw_delta * f, self.pitch_delta * f);
        camera.target += self.pan_delta * f;
        camera.distance =
            (camera.distance * (self.dolly_delta * f).exp()).clamp(self.min_distance, self.max_distance);

        let decay = 1.0 - f;
        self.yaw_delta *= decay;
        self.pitch_delta *= decay;
        self.pan_delta *= decay;
        self.dolly_delta *= decay;
        true
    }
}
