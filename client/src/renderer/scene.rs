use glam::{Mat4, Vec3};
use mitospace_shared::Rgb;
use std::sync::Arc;

use super::camera::Camera;
use super::point_cloud::PointCloud;

/// Handle of a node in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

/// Wireframe sphere marking the selected sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightMarker {
    pub position: Vec3,
    pub color: Vec3,
    pub radius: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone)]
pub enum SceneObject {
    Cloud(Arc<PointCloud>),
    Highlight(HighlightMarker),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub visible: bool,
    pub object: SceneObject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: f32,
    pub directional: f32,
    /// Direction the light comes from
    pub direction: Vec3,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: 0.7,
            directional: 0.8,
            direction: Vec3::ONE.normalize(),
        }
    }
}

/// A cloud placed in the scene
#[derive(Debug, Clone)]
pub struct CloudSlot {
    pub node: NodeId,
    pub cloud: Arc<PointCloud>,
}

impl CloudSlot {
    /// Replace the cloud held in `slot`: the previous node is removed before
    /// the new one (if any) is added
    pub fn replace(slot: &mut Option<CloudSlot>, scene: &mut Scene, cloud: Option<PointCloud>, visible: bool) {
        if let Some(previous) = slot.take() {
            scene.remove(previous.node);
        }
        *slot = cloud.map(|cloud| CloudSlot::place(scene, cloud, visible));
    }

    pub fn place(scene: &mut Scene, cloud: PointCloud, visible: bool) -> CloudSlot {
        let cloud = Arc::new(cloud);
        let node = scene.add(SceneObject::Cloud(Arc::clone(&cloud)), visible);
        CloudSlot { node, cloud }
    }
}

/// Flat scene graph of clouds and highlight markers
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    next_id: u64,
    pub background: Rgb,
    pub lighting: Lighting,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            background: Rgb::WHITE,
            ..Default::default()
        }
    }

    pub fn add(&mut self, object: SceneObject, visible: bool) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push(SceneNode { id, visible, object });
        id
    }

    pub fn remove(&mut self, id: NodeId) -> Option<SceneObject> {
        let index = self.nodes.iter().position(|node| node.id == id)?;
        Some(self.nodes.remove(index).object)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        match self.nodes.iter_mut().find(|node| node.id == id) {
            Some(node) => {
                node.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn is_visible(&self, id: NodeId) -> Option<bool> {
        self.get(id).map(|node| node.visible)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn clouds(&self) -> impl Iterator<Item = &Arc<PointCloud>> {
        self.nodes.iter().filter_map(|node| match &node.object {
            SceneObject::Cloud(cloud) => Some(cloud),
            SceneObject::Highlight(_) => None,
        })
    }

    pub fn cloud_count(&self) -> usize {
        self.clouds().count()
    }

    pub fn highlight_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node.object, SceneObject::Highlight(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Everything the GL renderer needs for one frame
    pub fn snapshot(&self, camera: &Camera, width: f32, height: f32) -> FrameSnapshot {
        let aspect_ratio = width / height.max(1.0);
        let mut clouds = Vec::new();
        let mut highlights = Vec::new();
        for node in &self.nodes {
            match &node.object {
                SceneObject::Cloud(cloud) => clouds.push(CloudDraw {
                    cloud: Arc::clone(cloud),
                    visible: node.visible,
                }),
                SceneObject::Highlight(marker) if node.visible => highlights.push(*marker),
                SceneObject::Highlight(_) => {}
            }
        }
        FrameSnapshot {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(aspect_ratio),
            viewport_height: height,
            lighting: self.lighting,
            clouds,
            highlights,
        }
    }
}

/// A cloud to keep resident on the GPU, drawn only when visible
#[derive(Debug, Clone)]
pub struct CloudDraw {
    pub cloud: Arc<PointCloud>,
    pub visible: bool,
}

/// Immutable per-frame render input handed to the paint callback
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub view: Mat4,
    pub projection: Mat4,
    /// Viewport height in pixels, for sprite size attenuation
    pub viewport_height: f32,
    pub lighting: Lighting,
    pub clouds: Vec<CloudDraw>,
    pub highlights: Vec<HighlightMarker>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> HighlightMarker {
        HighlightMarker {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            radius: 1.0,
            opacity: 0.8,
        }
    }

    #[test]
    fn nodes_are_added_toggled_and_removed() {
        let mut scene = Scene::new();
        let a = scene.add(SceneObject::Highlight(marker()), true);
        let b = scene.add(SceneObject::Highlight(marker()), false);
        assert_ne!(a, b);
        assert_eq!(scene.highlight_count(), 2);
        assert_eq!(scene.is_visible(b), Some(false));

        assert!(scene.set_visible(b, true));
        assert_eq!(scene.is_visible(b), Some(true));

        assert!(scene.remove(a).is_some());
        assert!(scene.remove(a).is_none());
        assert!(!scene.set_visible(a, true));
        assert_eq!(scene.nodes().len(), 1);
    }

    #[test]
    fn snapshot_skips_hidden_highlights() {
        let mut scene = Scene::new();
        scene.add(SceneObject::Highlight(marker()), false);
        let frame = scene.snapshot(&Camera::default(), 800.0, 600.0);
        assert!(frame.highlights.is_empty());
        assert_eq!(frame.viewport_height, 600.0);
        assert_eq!(frame.lighting, Lighting::default());
    }
}
