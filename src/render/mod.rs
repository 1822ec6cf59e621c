//! Rendering
//!
//! The simulation never draws anything itself. It fills a `Scene` and hands
//! it, together with the camera, to whatever `Renderer` the game was built
//! with: the macroquad window renderer in the demo, a headless one in tests.

mod scene;
mod window;

pub use scene::{Bounds, Material, MeshShape, NodeId, Scene, SceneNode, DEFAULT_BACKGROUND};
pub use window::MacroquadRenderer;

use crate::game::PyramidCamera;

/// Draws a scene from a camera's point of view
pub trait Renderer {
    fn render(&mut self, scene: &Scene, camera: &PyramidCamera);
}

/// Renderer that draws nothing and counts frames
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    pub frames: u64,
    /// Visible nodes in the last rendered frame
    pub last_visible: usize,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, scene: &Scene, _camera: &PyramidCamera) {
        self.frames += 1;
        self.last_visible = scene.iter().filter(|(_, node)| node.visible).count();
    }
}
