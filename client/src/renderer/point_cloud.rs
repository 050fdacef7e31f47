//! Point cloud construction.
//!
//! A [`PointCloud`] is immutable once built: its sample list, rendered
//! positions, colors and strategy-specific geometry are produced together by a
//! [`CloudStrategy`] and replaced together by building a new cloud. Picking
//! resolves hit indices through the cloud's own sample list.

use glam::{DVec3, Mat4, Vec3};
use mitospace_shared::Sample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::picking::{nearest, Hit, Ray};
use crate::config::ViewerConfig;
use crate::state::{display_color, rgb_to_vec3, ColoringMode, RenderingMode, VisualizerOptions};
use crate::store::SampleList;

static NEXT_CLOUD_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    PointSprites,
    InstancedSpheres,
}

impl StrategyKind {
    pub fn strategy(self) -> &'static dyn CloudStrategy {
        match self {
            StrategyKind::PointSprites => &PointSprites,
            StrategyKind::InstancedSpheres => &InstancedSpheres,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::PointSprites => "points",
            StrategyKind::InstancedSpheres => "instanced",
        }
    }
}

/// Inputs shared by every strategy
#[derive(Debug, Clone, Copy)]
pub struct BuildParams {
    pub point_size: f32,
    pub instance_radius_scale: f32,
    pub pick_threshold: f32,
}

/// Centered, scaled positions and display colors of a sample list
#[derive(Debug, Clone)]
pub struct Layout {
    pub centroid: Vec3,
    pub positions: Vec<Vec3>,
    pub colors: Vec<Vec3>,
}

impl Layout {
    /// `None` for an empty list
    pub fn compute(samples: &[Arc<Sample>], scale_factor: f32, mode: ColoringMode) -> Option<Self> {
        let centroid = centroid(samples)?;
        let positions = samples
            .iter()
            .map(|s| (Vec3::from_array(s.position()) - centroid) * scale_factor)
            .collect();
        let colors = samples
            .iter()
            .map(|s| rgb_to_vec3(display_color(s, mode)))
            .collect();
        Some(Self {
            centroid,
            positions,
            colors,
        })
    }
}

/// Mean position, accumulated in f64
pub fn centroid(samples: &[Arc<Sample>]) -> Option<Vec3> {
    if samples.is_empty() {
        return None;
    }
    let sum = samples
        .iter()
        .fold(DVec3::ZERO, |acc, s| acc + Vec3::from_array(s.position()).as_dvec3());
    Some((sum / samples.len() as f64).as_vec3())
}

/// Strategy-specific per-point data
#[derive(Debug, Clone)]
pub enum CloudGeometry {
    Sprites {
        sizes: Vec<f32>,
        pick_threshold: f32,
    },
    Instances {
        transforms: Vec<Mat4>,
        radius: f32,
    },
}

/// How a cloud is turned into renderable geometry and how it is hit-tested
pub trait CloudStrategy: Sync {
    fn kind(&self) -> StrategyKind;

    fn geometry(&self, layout: &Layout, params: &BuildParams) -> CloudGeometry;

    fn intersect(&self, cloud: &PointCloud, ray: &Ray) -> Option<Hit>;

    fn build(&self, samples: &SampleList, layout: Layout, params: &BuildParams) -> PointCloud {
        let geometry = self.geometry(&layout, params);
        PointCloud {
            id: NEXT_CLOUD_ID.fetch_add(1, Ordering::Relaxed),
            kind: self.kind(),
            samples: Arc::clone(samples),
            centroid: layout.centroid,
            positions: layout.positions,
            colors: layout.colors,
            geometry,
        }
    }
}

/// One textured, size-attenuated sprite per sample
pub struct PointSprites;

impl CloudStrategy for PointSprites {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PointSprites
    }

    fn geometry(&self, layout: &Layout, params: &BuildParams) -> CloudGeometry {
        CloudGeometry::Sprites {
            sizes: vec![params.point_size; layout.positions.len()],
            pick_threshold: params.pick_threshold,
        }
    }

    fn intersect(&self, cloud: &PointCloud, ray: &Ray) -> Option<Hit> {
        let CloudGeometry::Sprites { pick_threshold, .. } = cloud.geometry() else {
            return None;
        };
        let threshold_sq = pick_threshold * pick_threshold;
        cloud
            .positions()
            .iter()
            .enumerate()
            .fold(None, |best, (index, &point)| {
                let (distance, perpendicular_sq) = ray.closest_approach(point);
                if distance < 0.0 || perpendicular_sq > threshold_sq {
                    return best;
                }
                nearest(
                    best,
                    Hit {
                        index,
                        distance,
                        point,
                    },
                )
            })
    }
}

/// One lit sphere instance per sample, sharing a single mesh
pub struct InstancedSpheres;

impl CloudStrategy for InstancedSpheres {
    fn kind(&self) -> StrategyKind {
        StrategyKind::InstancedSpheres
    }

    fn geometry(&self, layout: &Layout, params: &BuildParams) -> CloudGeometry {
        let radius = params.point_size * params.instance_radius_scale;
        let transforms = layout
            .positions
            .iter()
            .map(|&p| Mat4::from_translation(p) * Mat4::from_scale(Vec3::splat(radius)))
            .collect();
        CloudGeometry::Instances { transforms, radius }
    }

    fn intersect(&self, cloud: &PointCloud, ray: &Ray) -> Option<Hit> {
        let CloudGeometry::Instances { radius, .. } = cloud.geometry() else {
            return None;
        };
        cloud
            .positions()
            .iter()
            .enumerate()
            .fold(None, |best, (index, &point)| match ray.intersect_sphere(point, *radius) {
                Some(distance) => nearest(
                    best,
                    Hit {
                        index,
                        distance,
                        point,
                    },
                ),
                None => best,
            })
    }
}

/// A built, renderable cloud
#[derive(Debug)]
pub struct PointCloud {
    id: u64,
    kind: StrategyKind,
    samples: SampleList,
    centroid: Vec3,
    positions: Vec<Vec3>,
    colors: Vec<Vec3>,
    geometry: CloudGeometry,
}

impl PointCloud {
    /// Unique for the lifetime of the process
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn samples(&self) -> &SampleList {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn geometry(&self) -> &CloudGeometry {
        &self.geometry
    }

    /// Sample drawn at `index`
    pub fn resolve(&self, index: usize) -> Option<&Arc<Sample>> {
        self.samples.get(index)
    }

    /// Index of `sample` in this cloud, by identity
    pub fn index_of(&self, sample: &Arc<Sample>) -> Option<usize> {
        self.samples.iter().position(|s| Arc::ptr_eq(s, sample))
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        self.kind.strategy().intersect(self, ray)
    }
}

/// Turns sample lists into point clouds
#[derive(Debug, Clone)]
pub struct PointCloudBuilder {
    scale_factor: f32,
    instancing_threshold: usize,
    instance_radius_scale: f32,
    pick_threshold: f32,
    /// World-space sprite radius per unit of point size
    sprite_radius_scale: f32,
}

impl PointCloudBuilder {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            scale_factor: config.scale_factor,
            instancing_threshold: config.instancing_threshold,
            instance_radius_scale: config.instance_radius_scale,
            pick_threshold: config.point_pick_threshold,
            sprite_radius_scale: (config.fov_degrees.to_radians() * 0.5).tan() * 0.5,
        }
    }

    /// Sprites are drawn `point_size * tan(fov / 2)` world units across, so
    /// large sprites widen the pick radius past the configured minimum
    pub fn sprite_pick_threshold(&self, point_size: f32) -> f32 {
        self.pick_threshold.max(point_size * self.sprite_radius_scale)
    }

    pub fn choose(&self, count: usize, mode: RenderingMode) -> StrategyKind {
        match mode {
            RenderingMode::Points => StrategyKind::PointSprites,
            RenderingMode::Instanced => StrategyKind::InstancedSpheres,
            RenderingMode::Auto if count > self.instancing_threshold => StrategyKind::InstancedSpheres,
            RenderingMode::Auto => StrategyKind::PointSprites,
        }
    }

    /// `None` when there is nothing to draw
    pub fn build(&self, samples: &SampleList, options: &VisualizerOptions) -> Option<PointCloud> {
        let layout = Layout::compute(samples, self.scale_factor, options.coloring_mode)?;
        let params = BuildParams {
            point_size: options.point_size,
            instance_radius_scale: self.instance_radius_scale,
            pick_threshold: self.sprite_pick_threshold(options.point_size),
        };
        let kind = self.choose(samples.len(), options.rendering_mode);
        let cloud = kind.strategy().build(samples, layout, &params);
        log::debug!(
            "Built {} cloud {} with {} samples",
            kind.label(),
            cloud.id(),
            cloud.len()
        );
        Some(cloud)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitospace_shared::Rgb;

    fn list(points: &[(f32, f32, f32)]) -> SampleList {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z))| Arc::new(Sample::at(&i.to_string(), x, y, z)))
            .collect()
    }

    fn builder() -> PointCloudBuilder {
        PointCloudBuilder::new(&ViewerConfig::default())
    }

    #[test]
    fn empty_list_builds_nothing() {
        assert!(builder().build(&list(&[]), &VisualizerOptions::default()).is_none());
    }

    #[test]
    fn positions_are_centered_and_scaled() {
        let samples = list(&[(1.0, 2.0, 3.0), (3.0, 2.0, 1.0), (5.0, -1.0, 2.0)]);
        let cloud = builder().build(&samples, &VisualizerOptions::default()).unwrap();

        let mean = cloud.positions().iter().copied().sum::<Vec3>() / cloud.len() as f32;
        assert!(mean.length() < 1e-5);
        assert!((cloud.centroid() - Vec3::new(3.0, 1.0, 2.0)).length() < 1e-5);
        assert!((cloud.positions()[0] - Vec3::new(-8.0, 4.0, 4.0)).length() < 1e-5);
    }

    #[test]
    fn strategy_follows_threshold_and_override() {
        let builder = builder();
        assert_eq!(builder.choose(1000, RenderingMode::Auto), StrategyKind::PointSprites);
        assert_eq!(builder.choose(1001, RenderingMode::Auto), StrategyKind::InstancedSpheres);
        assert_eq!(builder.choose(5, RenderingMode::Instanced), StrategyKind::InstancedSpheres);
        assert_eq!(builder.choose(5000, RenderingMode::Points), StrategyKind::PointSprites);
    }

    #[test]
    fn colors_are_clamped_and_follow_the_mode() {
        let mut sample = Sample::at("a", 0.0, 0.0, 0.0);
        sample.color = Rgb::new(2.0, 0.5, f32::NAN);
        sample.color_phenotypic = Rgb::new(0.1, 0.2, 0.3);
        let samples: SampleList = vec![Arc::new(sample)].into();

        let mut options = VisualizerOptions::default();
        let cloud = builder().build(&samples, &options).unwrap();
        assert_eq!(cloud.colors()[0], Vec3::new(1.0, 0.5, 0.0));

        options.coloring_mode = ColoringMode::Phenotype;
        let cloud = builder().build(&samples, &options).unwrap();
        assert_eq!(cloud.colors()[0], Vec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn instanced_geometry_scales_with_point_size() {
        let samples = list(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)]);
        let options = VisualizerOptions {
            rendering_mode: RenderingMode::Instanced,
            point_size: 2.0,
            ..Default::default()
        };
        let cloud = builder().build(&samples, &options).unwrap();
        let CloudGeometry::Instances { transforms, radius } = cloud.geometry() else {
            panic!("expected instanced geometry");
        };
        assert!((radius - 0.4).abs() < 1e-6);
        assert_eq!(transforms.len(), 2);
        let origin = transforms[1].transform_point3(Vec3::ZERO);
        assert!((origin - cloud.positions()[1]).length() < 1e-5);
    }

    #[test]
    fn sprite_pick_radius_grows_with_point_size() {
        let builder = builder();
        assert_eq!(builder.sprite_pick_threshold(1.5), 1.0);
        let radius = 20.0 * (25.0f32.to_radians()).tan() * 0.5;
        assert!((builder.sprite_pick_threshold(20.0) - radius).abs() < 1e-5);

        let samples = list(&[(0.0, 0.0, 0.0)]);
        let options = VisualizerOptions {
            rendering_mode: RenderingMode::Points,
            point_size: 20.0,
            ..Default::default()
        };
        let cloud = builder.build(&samples, &options).unwrap();
        // Inside the drawn sprite but outside the minimum radius
        let ray = Ray::new(Vec3::new(3.5, 0.0, 50.0), Vec3::NEG_Z);
        assert_eq!(cloud.intersect(&ray).map(|hit| hit.index), Some(0));
        let ray = Ray::new(Vec3::new(5.0, 0.0, 50.0), Vec3::NEG_Z);
        assert!(cloud.intersect(&ray).is_none());
    }

    #[test]
    fn every_build_gets_a_fresh_id() {
        let samples = list(&[(0.0, 0.0, 0.0)]);
        let a = builder().build(&samples, &VisualizerOptions::default()).unwrap();
        let b = builder().build(&samples, &VisualizerOptions::default()).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(Arc::ptr_eq(a.samples(), &samples));
        assert_eq!(a.index_of(&samples[0]), Some(0));
        assert!(a.resolve(1).is_none());
    }

    #[test]
    fn sprite_hit_prefers_the_point_nearest_the_camera() {
        let samples = list(&[(0.0, 0.0, 0.0), (0.0, 0.0, 2.0)]);
        let options = VisualizerOptions {
            rendering_mode: RenderingMode::Points,
            ..Default::default()
        };
        let cloud = builder().build(&samples, &options).unwrap();
        let ray = Ray::new(Vec3::new(0.2, 0.0, 50.0), Vec3::NEG_Z);
        let hit = cloud.intersect(&ray).unwrap();
        assert_eq!(hit.index, 1);

        let wide = Ray::new(Vec3::new(3.0, 0.0, 50.0), Vec3::NEG_Z);
        assert!(cloud.intersect(&wide).is_none());
    }
}
