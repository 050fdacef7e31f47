mod camera;
mod controls;
mod geometry;
mod gl_renderer;
mod picking;
mod point_cloud;
mod scene;

pub use camera::Camera;
pub use controls::{zoom_percentage, Gesture, OrbitController};
pub use gl_renderer::{RenderError, SceneRenderer};
pub use picking::{pick, pointer_to_ndc, Hit, PickOutcome, Ray};
pub use point_cloud::{
    CloudGeometry, CloudStrategy, InstancedSpheres, PointCloud, PointCloudBuilder, PointSprites,
    StrategyKind,
};
pub use scene::{
    CloudDraw, CloudSlot, FrameSnapshot, HighlightMarker, Lighting, NodeId, Scene, SceneNode,
    SceneObject,
};
