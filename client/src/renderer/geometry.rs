//! CPU-side mesh and texture generation for the GL renderer.

use glam::Vec3;
use std::f32::consts::{PI, TAU};

/// Indexed unit sphere with per-vertex normals
pub struct SphereMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u16>,
}

/// UV sphere of radius 1 with `segments` around and `rings` from pole to pole
pub fn uv_sphere(segments: u32, rings: u32) -> SphereMesh {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut positions = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    for ring in 0..=rings {
        let phi = PI * ring as f32 / rings as f32;
        for segment in 0..=segments {
            let theta = TAU * segment as f32 / segments as f32;
            positions.push(Vec3::new(
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ));
        }
    }
    let normals = positions.clone();

    let stride = segments + 1;
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
    for ring in 0..rings {
        for segment in 0..segments {
            let a = (ring * stride + segment) as u16;
            let b = a + stride as u16;
            let c = a + 1;
            let d = b + 1;
            indices.extend_from_slice(&[a, b, c, c, b, d]);
        }
    }

    SphereMesh {
        positions,
        normals,
        indices,
    }
}

/// Unit wireframe sphere as a line list: `rings - 1` latitude circles and
/// `segments` meridians
pub fn wire_sphere(segments: u32, rings: u32) -> Vec<Vec3> {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut lines = Vec::new();

    for ring in 1..rings {
        let phi = PI * ring as f32 / rings as f32;
        for segment in 0..segments {
            let t0 = TAU * segment as f32 / segments as f32;
            let t1 = TAU * (segment + 1) as f32 / segments as f32;
            lines.push(Vec3::new(phi.sin() * t0.cos(), phi.cos(), phi.sin() * t0.sin()));
            lines.push(Vec3::new(phi.sin() * t1.cos(), phi.cos(), phi.sin() * t1.sin()));
        }
    }

    for segment in 0..segments {
        let theta = TAU * segment as f32 / segments as f32;
        for ring in 0..rings {
            let p0 = PI * ring as f32 / rings as f32;
            let p1 = PI * (ring + 1) as f32 / rings as f32;
            lines.push(Vec3::new(p0.sin() * theta.cos(), p0.cos(), p0.sin() * theta.sin()));
            lines.push(Vec3::new(p1.sin() * theta.cos(), p1.cos(), p1.sin() * theta.sin()));
        }
    }

    lines
}

/// Alpha stops of the point sprite, from center (0) to rim (1)
const SPRITE_STOPS: [(f32, f32); 4] = [(0.0, 1.0), (0.2, 0.9), (0.5, 0.8), (1.0, 0.0)];

/// Alpha of the radial sprite gradient at normalized radius `r`
pub fn sprite_alpha(r: f32) -> f32 {
    if !(0.0..=1.0).contains(&r) {
        return 0.0;
    }
    SPRITE_STOPS
        .windows(2)
        .find(|pair| r <= pair[1].0)
        .map(|pair| {
            let (r0, a0) = pair[0];
            let (r1, a1) = pair[1];
            a0 + (a1 - a0) * (r - r0) / (r1 - r0)
        })
        .unwrap_or(0.0)
}

/// White RGBA8 texture whose alpha is the radial sprite gradient
pub fn sprite_texture(size: usize) -> Vec<u8> {
    let size = size.max(2);
    let half = size as f32 / 2.0;
    let mut pixels = Vec::with_capacity(size * size * 4);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - half;
            let dy = y as f32 + 0.5 - half;
            let r = (dx * dx + dy * dy).sqrt() / half;
            let alpha = (sprite_alpha(r) * 255.0).round() as u8;
            pixels.extend_from_slice(&[255, 255, 255, alpha]);
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_vertices_lie_on_the_unit_sphere() {
        let mesh = uv_sphere(16, 12);
        assert_eq!(mesh.positions.len(), 17 * 13);
        assert_eq!(mesh.indices.len(), 16 * 12 * 6);
        assert!(mesh.positions.iter().all(|p| (p.length() - 1.0).abs() < 1e-5));
        assert!(mesh
            .indices
            .iter()
            .all(|&i| (i as usize) < mesh.positions.len()));
    }

    #[test]
    fn wire_sphere_is_a_line_list() {
        let lines = wire_sphere(24, 12);
        assert_eq!(lines.len(), 2 * (11 * 24 + 24 * 12));
        assert!(lines.iter().all(|p| (p.length() - 1.0).abs() < 1e-5));
    }

    #[test]
    fn sprite_gradient_matches_its_stops() {
        assert_eq!(sprite_alpha(0.0), 1.0);
        assert!((sprite_alpha(0.2) - 0.9).abs() < 1e-6);
        assert!((sprite_alpha(0.5) - 0.8).abs() < 1e-6);
        assert_eq!(sprite_alpha(1.0), 0.0);
        assert_eq!(sprite_alpha(1.5), 0.0);
        assert!((sprite_alpha(0.75) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn sprite_texture_is_opaque_in_the_middle_and_clear_at_the_corner() {
        let size = 64;
        let pixels = sprite_texture(size);
        assert_eq!(pixels.len(), size * size * 4);
        let alpha = |x: usize, y: usize| pixels[(y * size + x) * 4 + 3];
        assert!(alpha(32, 32) > 240);
        assert_eq!(alpha(0, 0), 0);
    }
}
