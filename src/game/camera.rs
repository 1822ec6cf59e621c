//! Stage camera: a fixed perspective rig that can keep one entity in view.

use std::collections::HashMap;

use macroquad::math::Vec3;

use super::entity::{Entity, EntityId};
use crate::physics::PhysicsWorld;

pub const DEFAULT_FOV_DEGREES: f32 = 45.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 1000.0;

#[derive(Clone, Debug, PartialEq)]
pub struct PyramidCamera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view, radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    follow: Option<EntityId>,
}

impl PyramidCamera {
    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 6.0 * (std::f32::consts::PI / 3.0).tan(), 20.0),
            target: Vec3::ZERO,
            fov: DEFAULT_FOV_DEGREES.to_radians(),
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            follow: None,
        }
    }

    pub fn follow_entity(&mut self, id: EntityId) {
        self.follow = Some(id);
    }

    pub fn unfollow(&mut self) {
        self.follow = None;
    }

    pub fn following(&self) -> Option<EntityId> {
        self.follow
    }

    /// Aim at the followed entity's body. Stays put if it is gone.
    pub fn update(&mut self, world: &PhysicsWorld, children: &HashMap<EntityId, Entity>) {
        let Some(id) = self.follow else {
            return;
        };
        if let Some(translation) = children.get(&id).and_then(|e| world.translation(e.body())) {
            self.target = translation;
        }
    }
}

impl Default for PyramidCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rig() {
        let camera = PyramidCamera::new();
        assert!((camera.position.y - 6.0 * 3.0f32.sqrt()).abs() < 1e-4);
        assert_eq!(camera.position.z, 20.0);
        assert!((camera.fov - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
        assert_eq!(camera.following(), None);
    }

    #[test]
    fn test_follow_tracks_body() {
        let mut world = PhysicsWorld::new(Vec3::ZERO, 1.0 / 60.0).unwrap();
        let entity = Entity::new("target", &mut world, Vec3::new(3.0, 1.0, -2.0));
        let id = entity.id();
        let mut children = HashMap::new();
        children.insert(id, entity);

        let mut camera = PyramidCamera::new();
        camera.update(&world, &children);
        assert_eq!(camera.target, Vec3::ZERO);

        camera.follow_entity(id);
        camera.update(&world, &children);
        assert_eq!(camera.target, Vec3::new(3.0, 1.0, -2.0));

        camera.unfollow();
        assert_eq!(camera.following(), None);
    }
}
