//! Collision Registry
//!
//! Each kind carries one table mapping a collision key to a named handler.
//! When an entity of that kind touches another entity, the other entity's
//! `collision_key` selects which handler runs. Tables are built once by the
//! kind builder and then only read, shared by every instance of the kind.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use super::entity::Entity;
use crate::physics::PhysicsWorld;
use crate::render::Scene;

/// Everything a collision handler may touch
pub struct Collision<'a> {
    /// The entity whose kind owns the handler
    pub entity: &'a mut Entity,
    /// The entity it collided with
    pub target: &'a mut Entity,
    pub world: &'a mut PhysicsWorld,
    pub scene: &'a mut Scene,
}

type ErasedHandler = Rc<dyn Fn(&mut dyn Any, &mut Collision<'_>)>;

/// A named handler bound to one kind
#[derive(Clone)]
pub struct CollisionHandler {
    pub name: String,
    handler: ErasedHandler,
}

impl CollisionHandler {
    /// Wrap a handler written against the concrete kind `K`.
    pub fn new<K, F>(name: impl Into<String>, handler: F) -> Self
    where
        K: Any,
        F: Fn(&mut K, &mut Collision<'_>) + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self {
            name,
            handler: Rc::new(move |owner: &mut dyn Any, collision: &mut Collision<'_>| {
                match owner.downcast_mut::<K>() {
                    Some(owner) => handler(owner, collision),
                    None => log::warn!("collision handler {} bound to a different kind", label),
                }
            }),
        }
    }

    pub fn call(&self, owner: &mut dyn Any, collision: &mut Collision<'_>) {
        (self.handler)(owner, collision)
    }
}

impl fmt::Debug for CollisionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionHandler").field("name", &self.name).finish()
    }
}

/// Ordered key -> handler table
#[derive(Clone, Debug, Default)]
pub struct CollisionRegistry {
    entries: Vec<(String, CollisionHandler)>,
}

impl CollisionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for `key`, replacing any handler already there.
    pub fn insert(&mut self, key: impl Into<String>, handler: CollisionHandler) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => {
                log::warn!("collision key {} registered twice, keeping {}", key, handler.name);
                *existing = handler;
            }
            None => self.entries.push((key, handler)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CollisionHandler> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, h)| h)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroquad::math::Vec3;

    #[derive(Default)]
    struct Bumper {
        hits: u32,
    }

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut registry = CollisionRegistry::new();
        registry.insert("wall", CollisionHandler::new("bounce", |_: &mut Bumper, _: &mut Collision<'_>| {}));
        registry.insert("coin", CollisionHandler::new("collect", |_: &mut Bumper, _: &mut Collision<'_>| {}));
        registry.insert("wall", CollisionHandler::new("stop", |_: &mut Bumper, _: &mut Collision<'_>| {}));

        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["wall", "coin"]);
        assert_eq!(registry.get("wall").unwrap().name, "stop");
        assert!(registry.get("lava").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_call_downcasts_owner() {
        let mut world = PhysicsWorld::new(Vec3::ZERO, 1.0 / 60.0).unwrap();
        let mut scene = Scene::new();
        let mut a = Entity::new("a", &mut world, Vec3::ZERO);
        let mut b = Entity::new("b", &mut world, Vec3::ZERO);
        let target_id = b.id();

        let handler = CollisionHandler::new("count", move |owner: &mut Bumper, c: &mut Collision<'_>| {
            assert_eq!(c.target.id(), target_id);
            owner.hits += 1;
        });

        let mut owner = Bumper::default();
        let mut collision = Collision {
            entity: &mut a,
            target: &mut b,
            world: &mut world,
            scene: &mut scene,
        };
        handler.call(&mut owner, &mut collision);
        handler.call(&mut owner, &mut collision);
        assert_eq!(owner.hits, 2);

        // Wrong owner type is skipped
        let mut other = 5u32;
        handler.call(&mut other, &mut collision);
        assert_eq!(other, 5);
    }
}
