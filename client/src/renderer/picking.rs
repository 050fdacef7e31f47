//! Pointer picking: rays through the camera, hit tests against the active
//! point cloud, and resolution of hit indices back to samples.

use glam::{Vec2, Vec3};
use mitospace_shared::Sample;
use std::sync::Arc;

use super::camera::Camera;
use super::point_cloud::PointCloud;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the point's projection, and the squared
    /// perpendicular distance from the point to the ray
    pub fn closest_approach(&self, point: Vec3) -> (f32, f32) {
        let t = (point - self.origin).dot(self.direction);
        let closest = self.at(t);
        (t, closest.distance_squared(point))
    }

    /// Nearest non-negative entry distance into a sphere
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let near = -b - root;
        if near >= 0.0 {
            return Some(near);
        }
        // Origin inside the sphere
        let far = -b + root;
        (far >= 0.0).then_some(far)
    }
}

/// A ray hit against one point of a cloud
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Index into the cloud's sample list
    pub index: usize,
    /// Distance along the ray
    pub distance: f32,
    /// Rendered position of the point that was hit
    pub point: Vec3,
}

/// Keep the closer of two hits
pub fn nearest(best: Option<Hit>, candidate: Hit) -> Option<Hit> {
    match best {
        Some(current) if current.distance <= candidate.distance => Some(current),
        _ => Some(candidate),
    }
}

#[derive(Debug, Clone)]
pub enum PickOutcome {
    /// A camera gesture was in progress; nothing changed
    Ignored,
    /// The ray hit nothing (or there was nothing to hit)
    Miss,
    Hit {
        sample: Arc<Sample>,
        index: usize,
        position: Vec3,
    },
}

/// Convert a viewport-local pointer position (pixels, y down) to normalized
/// device coordinates (y up). Returns `None` for an empty viewport.
pub fn pointer_to_ndc(local: Vec2, size: Vec2) -> Option<Vec2> {
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        local.x / size.x * 2.0 - 1.0,
        -(local.y / size.y * 2.0 - 1.0),
    ))
}

/// Resolve a click in normalized device coordinates to a sample of `cloud`
pub fn pick(
    camera: &Camera,
    aspect_ratio: f32,
    cloud: Option<&PointCloud>,
    ndc: Vec2,
    gesture_in_progress: bool,
) -> PickOutcome {
    if gesture_in_progress {
        return PickOutcome::Ignored;
    }
    let Some(cloud) = cloud else {
        return PickOutcome::Miss;
    };
    if cloud.is_empty() || !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
        return PickOutcome::Miss;
    }

    let ray = camera.ray_through(ndc, aspect_ratio);
    let Some(hit) = cloud.intersect(&ray) else {
        return PickOutcome::Miss;
    };

    match cloud.resolve(hit.index) {
        Some(sample) => PickOutcome::Hit {
            sample: Arc::clone(sample),
            index: hit.index,
            position: hit.point,
        },
        None => PickOutcome::Miss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_approach_measures_perpendicular_distance() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0));
        let (t, d2) = ray.closest_approach(Vec3::new(1.0, 0.0, -5.0));
        assert!((t - 5.0).abs() < 1e-6);
        assert!((d2 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sphere_intersection_reports_entry_distance() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        assert_eq!(ray.intersect_sphere(Vec3::ZERO, 1.0), Some(9.0));
        assert_eq!(ray.intersect_sphere(Vec3::new(5.0, 0.0, 0.0), 1.0), None);
        // Behind the origin
        assert_eq!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 20.0), 1.0), None);
        // From inside
        let inside = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(inside.intersect_sphere(Vec3::ZERO, 2.0), Some(2.0));
    }

    #[test]
    fn pointer_maps_to_ndc_with_y_up() {
        let size = Vec2::new(200.0, 100.0);
        assert_eq!(pointer_to_ndc(Vec2::ZERO, size), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(pointer_to_ndc(Vec2::new(100.0, 50.0), size), Some(Vec2::ZERO));
        assert_eq!(pointer_to_ndc(Vec2::new(200.0, 100.0), size), Some(Vec2::new(1.0, -1.0)));
        assert_eq!(pointer_to_ndc(Vec2::ZERO, Vec2::ZERO), None);
    }

    #[test]
    fn nothing_to_pick_is_a_miss() {
        let camera = Camera::default();
        assert!(matches!(pick(&camera, 1.0, None, Vec2::ZERO, false), PickOutcome::Miss));
        assert!(matches!(pick(&camera, 1.0, None, Vec2::ZERO, true), PickOutcome::Ignored));
    }
}
