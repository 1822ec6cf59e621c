//! Window Renderer
//!
//! Draws a `Scene` with macroquad's immediate-mode 3D primitives. Node
//! rotation is applied by pushing a model matrix, so every shape is drawn
//! around the origin.

use std::collections::HashMap;

use macroquad::prelude::*;

use super::{MeshShape, Renderer, Scene, SceneNode};
use crate::game::PyramidCamera;

/// Convert 0xRRGGBB into a macroquad color
pub fn hex_color(hex: u32) -> Color {
    Color::from_rgba(
        ((hex >> 16) & 0xFF) as u8,
        ((hex >> 8) & 0xFF) as u8,
        (hex & 0xFF) as u8,
        255,
    )
}

pub struct MacroquadRenderer {
    textures: HashMap<String, Texture2D>,
}

impl MacroquadRenderer {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
        }
    }

    /// Load every texture the scene references that is not cached yet.
    /// Missing files are logged and the node falls back to its flat color.
    pub async fn load_textures(&mut self, scene: &Scene) {
        for path in scene.texture_paths() {
            if self.textures.contains_key(&path) {
                continue;
            }
            match load_texture(&path).await {
                Ok(tex) => {
                    tex.set_filter(FilterMode::Nearest);
                    log::info!("Loaded texture {}", path);
                    self.textures.insert(path, tex);
                }
                Err(e) => log::warn!("Failed to load texture {}: {}", path, e),
            }
        }
    }

    fn draw_node(&self, node: &SceneNode) {
        let color = hex_color(node.material.color);
        let texture = node
            .material
            .texture
            .as_ref()
            .and_then(|path| self.textures.get(path));

        let model = Mat4::from_rotation_translation(node.rotation, node.position);
        unsafe { get_internal_gl().quad_gl.push_model_matrix(model) };

        match &node.shape {
            MeshShape::Cuboid { size } => {
                if node.wireframe {
                    draw_cube_wires(Vec3::ZERO, *size, color);
                } else {
                    draw_cube(Vec3::ZERO, *size, texture, color);
                }
            }
            MeshShape::Sphere { radius } => {
                if node.wireframe {
                    draw_sphere_wires(Vec3::ZERO, *radius, None, color);
                } else {
                    draw_sphere(Vec3::ZERO, *radius, texture, color);
                }
            }
            MeshShape::Capsule { half_height, radius, center } => {
                let top = *center + vec3(0.0, *half_height, 0.0);
                let bottom = *center - vec3(0.0, *half_height, 0.0);
                let height = half_height * 2.0;
                if node.wireframe {
                    draw_cylinder_wires(bottom, *radius, *radius, height, None, color);
                    draw_sphere_wires(top, *radius, None, color);
                    draw_sphere_wires(bottom, *radius, None, color);
                } else {
                    draw_cylinder(bottom, *radius, *radius, height, texture, color);
                    draw_sphere(top, *radius, texture, color);
                    draw_sphere(bottom, *radius, texture, color);
                }
            }
            MeshShape::Model { bounds } => {
                // Stand-in until skinned meshes are drawn: the model's box
                let center = bounds.center();
                if node.wireframe {
                    draw_cube_wires(center, bounds.size(), color);
                } else {
                    draw_cube(center, bounds.size(), texture, color);
                }
            }
        }

        unsafe { get_internal_gl().quad_gl.pop_model_matrix() };
    }
}

impl Default for MacroquadRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MacroquadRenderer {
    fn render(&mut self, scene: &Scene, camera: &PyramidCamera) {
        clear_background(hex_color(scene.background));

        set_camera(&Camera3D {
            position: camera.position,
            target: camera.target,
            up: Vec3::Y,
            fovy: camera.fov,
            z_near: camera.near,
            z_far: camera.far,
            ..Default::default()
        });

        for (_, node) in scene.iter() {
            if node.visible {
                self.draw_node(node);
            }
        }

        set_default_camera();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        let c = hex_color(0xFF8000);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.a, 1.0);
    }
}
