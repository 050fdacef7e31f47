use glam::{Mat4, Vec2, Vec3};

use super::picking::Ray;

/// Pitch stays just short of straight up/down so `look_at` keeps a valid up vector
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Orbital camera that rotates around a target point
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Distance from target
    pub distance: f32,
    /// Horizontal angle (radians)
    pub yaw: f32,
    /// Vertical angle (radians)
    pub pitch: f32,
    /// Point to orbit around
    pub target: Vec3,
    /// Field of view (radians)
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::looking_at(Vec3::new(25.0, 25.0, 25.0), Vec3::ZERO, 50.0_f32.to_radians(), 0.1, 1000.0)
    }
}

impl Camera {
    /// Camera placed at `position`, orbiting `target`
    pub fn looking_at(position: Vec3, target: Vec3, fov: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            distance: 1.0,
            yaw: 0.0,
            pitch: 0.0,
            target,
            fov,
            near,
            far,
        };
        camera.set_position(position);
        camera
    }

    /// Get the camera position in world space
    pub fn position(&self) -> Vec3 {
        self.target + self.offset()
    }

    /// Vector from target to camera
    pub fn offset(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        Vec3::new(x, y, z)
    }

    /// Move the camera to `position`, keeping the current target
    pub fn set_position(&mut self, position: Vec3) {
        let offset = position - self.target;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return;
        }
        self.distance = distance;
        self.pitch = (offset.y / distance).clamp(-1.0, 1.0).asin().clamp(-MAX_PITCH, MAX_PITCH);
        self.yaw = offset.x.atan2(offset.z);
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect_ratio, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        self.projection_matrix(aspect_ratio) * self.view_matrix()
    }

    /// Camera-space right and up axes in world space
    pub fn screen_axes(&self) -> (Vec3, Vec3) {
        let forward = (self.target - self.position()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        (right, up)
    }

    /// Rotate camera by delta angles
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Zoom camera by delta distance
    pub fn zoom(&mut self, delta: f32, min_distance: f32, max_distance: f32) {
        self.distance = (self.distance - delta).clamp(min_distance, max_distance);
    }

    /// Project a world point to normalized device coordinates (x, y in [-1, 1], y up)
    pub fn project(&self, point: Vec3, aspect_ratio: f32) -> Vec2 {
        let clip = self.view_projection_matrix(aspect_ratio) * point.extend(1.0);
        Vec2::new(clip.x / clip.w, clip.y / clip.w)
    }

    /// Ray from the camera through a point given in normalized device coordinates
    pub fn ray_through(&self, ndc: Vec2, aspect_ratio: f32) -> Ray {
        let inverse = self.view_projection_matrix(aspect_ratio).inverse();
        // glam's perspective_rh maps depth to [0, 1]
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(self.position(), far - near)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_round_trips_through_angles() {
        let camera = Camera::looking_at(Vec3::new(25.0, 25.0, 25.0), Vec3::ZERO, 0.8, 0.1, 1000.0);
        assert!(camera.position().distance(Vec3::new(25.0, 25.0, 25.0)) < 1e-3);
        assert!((camera.distance - 25.0 * 3f32.sqrt()).abs() < 1e-3);
    }

    #[test]
    fn center_ray_points_at_target() {
        let camera = Camera::default();
        let ray = camera.ray_through(Vec2::ZERO, 1.5);
        let expected = (camera.target - camera.position()).normalize();
        assert!(ray.direction.dot(expected) > 0.9999);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = Camera::default();
        camera.zoom(1000.0, 1.0, 300.0);
        assert_eq!(camera.distance, 1.0);
        camera.zoom(-1000.0, 1.0, 300.0);
        assert_eq!(camera.distance, 300.0);
    }

    #[test]
    fn pitch_never_reaches_the_pole() {
        let mut camera = Camera::default();
        camera.rotate(0.0, 10.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
        let (right, up) = camera.screen_axes();
        assert!(right.length() > 0.99);
        assert!(up.length() > 0.99);
    }
}
