//! Scene Graph
//!
//! A flat list of drawable nodes. Entities own at most two nodes (their
//! visual mesh and a wireframe debug overlay) and push transforms into them
//! every tick. Storage is sparse: removing a node leaves a hole, so a
//! `NodeId` never starts pointing at a different node.

use macroquad::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Background used when the config does not override it
pub const DEFAULT_BACKGROUND: u32 = 0x5843c1;

/// Handle to a node in a `Scene`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Axis-aligned bounding box of a piece of geometry
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.to_array(),
            max: max.to_array(),
        }
    }

    pub fn size(&self) -> Vec3 {
        Vec3::from(self.max) - Vec3::from(self.min)
    }

    pub fn center(&self) -> Vec3 {
        (Vec3::from(self.max) + Vec3::from(self.min)) * 0.5
    }

    /// Radius of the smallest sphere around the center enclosing the box
    pub fn bounding_sphere_radius(&self) -> f32 {
        self.size().length() * 0.5
    }
}

/// Geometry of a node
#[derive(Clone, Debug, PartialEq)]
pub enum MeshShape {
    Cuboid { size: Vec3 },
    Sphere { radius: f32 },
    /// Upright capsule around `center`; `half_height` is the cylinder part only
    Capsule { half_height: f32, radius: f32, center: Vec3 },
    /// Imported model, drawn as its bounding box
    Model { bounds: Bounds },
}

/// Surface appearance of a node
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// 0xRRGGBB
    pub color: u32,
    pub texture: Option<String>,
    /// Texture repeat count along u and v
    pub texture_repeat: [f32; 2],
}

impl Material {
    pub fn solid(color: u32) -> Self {
        Self {
            color,
            texture: None,
            texture_repeat: [1.0, 1.0],
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::solid(0xFFFFFF)
    }
}

/// A drawable thing placed in the world
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub shape: MeshShape,
    pub material: Material,
    pub wireframe: bool,
    pub visible: bool,
    pub position: Vec3,
    pub rotation: Quat,
}

impl SceneNode {
    pub fn new(shape: MeshShape, material: Material) -> Self {
        Self {
            shape,
            material,
            wireframe: false,
            visible: true,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    /// Wireframe overlay, hidden until something turns it on
    pub fn debug(shape: MeshShape, color: u32) -> Self {
        Self {
            wireframe: true,
            visible: false,
            ..Self::new(shape, Material::solid(color))
        }
    }

    pub fn set_transform(&mut self, position: Vec3, rotation: Quat) {
        self.position = position;
        self.rotation = rotation;
    }
}

/// Everything the renderer draws this frame
pub struct Scene {
    /// Sparse array indexed by NodeId
    nodes: Vec<Option<SceneNode>>,
    pub background: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            background: DEFAULT_BACKGROUND,
        }
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    /// Remove a node. Returns the node if it existed.
    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        self.nodes.get_mut(id.0 as usize).and_then(|slot| slot.take())
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0 as usize).and_then(|opt| opt.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0 as usize).and_then(|opt| opt.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate over live nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, opt)| opt.as_ref().map(|n| (NodeId(idx as u32), n)))
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|opt| opt.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Texture paths referenced by any node, deduplicated
    pub fn texture_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .iter()
            .filter_map(|(_, node)| node.material.texture.clone())
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> SceneNode {
        SceneNode::new(MeshShape::Cuboid { size: Vec3::ONE }, Material::default())
    }

    #[test]
    fn test_add_and_get() {
        let mut scene = Scene::new();
        let id = scene.add(cube());

        assert!(scene.contains(id));
        assert_eq!(scene.len(), 1);
        assert!(scene.get(id).unwrap().visible);
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut scene = Scene::new();
        let first = scene.add(cube());
        assert!(scene.remove(first).is_some());

        let second = scene.add(cube());
        assert_ne!(first, second);
        assert!(!scene.contains(first));
        assert!(scene.remove(first).is_none());
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_debug_node_starts_hidden() {
        let node = SceneNode::debug(MeshShape::Sphere { radius: 1.0 }, 0xFF0000);
        assert!(node.wireframe);
        assert!(!node.visible);
        assert_eq!(node.material.color, 0xFF0000);
    }

    #[test]
    fn test_bounds() {
        let bounds = Bounds::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 4.0, 1.0));
        assert_eq!(bounds.size(), Vec3::new(2.0, 4.0, 2.0));
        assert_eq!(bounds.center(), Vec3::new(0.0, 2.0, 0.0));
        assert!((bounds.bounding_sphere_radius() - 24.0f32.sqrt() * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_texture_paths_deduplicated() {
        let mut scene = Scene::new();
        let mut textured = cube();
        textured.material.texture = Some("assets/crate.png".to_string());
        scene.add(textured.clone());
        scene.add(textured);
        scene.add(cube());

        assert_eq!(scene.texture_paths(), vec!["assets/crate.png".to_string()]);
    }
}
