//! Entity
//!
//! An entity pairs one physics body with at most one visual node and one
//! wireframe debug node. The body's user data carries the entity id, which
//! is how collision passes find their way back from rapier to the stage.
//!
//! Construction happens in steps (body, then collider, then meshes) and is
//! driven by the factories in `factory.rs`.

use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use macroquad::math::{Quat, Vec3};

use super::actor::ActorState;
use super::frame::FrameStore;
use super::options::YELLOW;
use crate::physics::{
    stamp, ActiveCollisionTypes, ColliderBuilder, ColliderHandle, PhysicsWorld, RigidBodyBuilder,
    RigidBodyHandle, RigidBodyType,
};
use crate::render::{Bounds, Material, MeshShape, NodeId, Scene, SceneNode};

/// Identifies a registered kind
pub type KindId = TypeId;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Unique entity id. Drawn from a process-wide counter, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        EntityId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        EntityId(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e-{}", self.0)
    }
}

/// Enter/exit state of a trigger area
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriggerState {
    pub entered: bool,
}

/// What part an entity plays, decided by the factory that built it
#[derive(Clone, Debug, PartialEq)]
pub enum Role {
    Solid,
    Trigger(TriggerState),
    Actor(ActorState),
}

pub struct Entity {
    id: EntityId,
    pub tag: String,
    body: RigidBodyHandle,
    collider: Option<ColliderHandle>,
    is_sensor: bool,
    material: Material,
    pub mesh: Option<NodeId>,
    pub debug_mesh: Option<NodeId>,
    pub debug_color: u32,
    pub show_debug: bool,
    /// Key other kinds use to pick a collision handler for this entity
    pub collision_key: Option<String>,
    pub role: Role,
    pub(crate) kind: Option<KindId>,
    pub(crate) owner: Option<Box<dyn Any>>,
    pub(crate) frames: FrameStore,
    /// Entities currently inside this sensor
    pub(crate) overlaps: BTreeSet<EntityId>,
}

impl Entity {
    /// Allocate an id and create the entity's dynamic body at `position`.
    pub fn new(tag: impl Into<String>, world: &mut PhysicsWorld, position: Vec3) -> Self {
        let id = EntityId::next();
        let body = world.create_rigid_body(
            RigidBodyBuilder::dynamic()
                .translation(crate::physics::to_vector(position))
                .linear_damping(1.0)
                .angular_damping(1.0)
                .user_data(stamp(id.raw())),
        );

        Self {
            id,
            tag: tag.into(),
            body,
            collider: None,
            is_sensor: false,
            material: Material::default(),
            mesh: None,
            debug_mesh: None,
            debug_color: 0xFFFFFF,
            show_debug: false,
            collision_key: None,
            role: Role::Solid,
            kind: None,
            owner: None,
            frames: FrameStore::new(),
            overlaps: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn collider(&self) -> Option<ColliderHandle> {
        self.collider
    }

    pub fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    pub fn kind(&self) -> Option<KindId> {
        self.kind
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self.role, Role::Trigger(_))
    }

    pub fn is_actor(&self) -> bool {
        matches!(self.role, Role::Actor(_))
    }

    /// Trigger state, if this entity is a trigger
    pub fn trigger(&self) -> Option<&TriggerState> {
        match &self.role {
            Role::Trigger(state) => Some(state),
            _ => None,
        }
    }

    pub fn actor(&self) -> Option<&ActorState> {
        match &self.role {
            Role::Actor(state) => Some(state),
            _ => None,
        }
    }

    pub fn actor_mut(&mut self) -> Option<&mut ActorState> {
        match &mut self.role {
            Role::Actor(state) => Some(state),
            _ => None,
        }
    }

    /// Entities overlapping this sensor as of the last intersection pass
    pub fn overlaps(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.overlaps.iter().copied()
    }

    /// Borrow the kind instance bound to this entity
    pub fn owner<K: Any>(&self) -> Option<&K> {
        self.owner.as_ref().and_then(|o| o.downcast_ref::<K>())
    }

    pub fn owner_mut<K: Any>(&mut self) -> Option<&mut K> {
        self.owner.as_mut().and_then(|o| o.downcast_mut::<K>())
    }

    // =========================================================================
    // Visuals
    // =========================================================================

    /// Material used by meshes created after this call
    pub fn apply_material(&mut self, texture_path: Option<String>, color: u32, repeat: [f32; 2]) {
        self.material = Material {
            color,
            texture: texture_path,
            texture_repeat: repeat,
        };
    }

    pub fn rectangular_mesh(&mut self, scene: &mut Scene, size: Vec3, position: Vec3) {
        self.add_mesh(scene, MeshShape::Cuboid { size }, position);
    }

    pub fn spherical_mesh(&mut self, scene: &mut Scene, radius: f32, position: Vec3) {
        self.add_mesh(scene, MeshShape::Sphere { radius }, position);
    }

    fn add_mesh(&mut self, scene: &mut Scene, shape: MeshShape, position: Vec3) {
        let mut node = SceneNode::new(shape.clone(), self.material.clone());
        node.position = position;
        self.mesh = Some(scene.add(node));
        self.create_debug_mesh(scene, shape, position, self.debug_color);
    }

    /// Add the wireframe overlay. It stays hidden until `show_debug` is set.
    pub fn create_debug_mesh(&mut self, scene: &mut Scene, shape: MeshShape, position: Vec3, color: u32) {
        if let Some(old) = self.debug_mesh.take() {
            scene.remove(old);
        }
        let mut node = SceneNode::debug(shape, color);
        node.position = position;
        self.debug_color = color;
        self.debug_mesh = Some(scene.add(node));
    }

    // =========================================================================
    // Colliders
    // =========================================================================

    fn attach_collider(&mut self, world: &mut PhysicsWorld, collider: ColliderBuilder, is_sensor: bool) -> bool {
        if self.collider.is_some() {
            log::warn!("{} ({}) already has a collider, ignoring another", self.id, self.tag);
            return false;
        }
        self.is_sensor = is_sensor;
        self.collider = Some(world.create_collider(collider, self.body));
        true
    }

    /// Box collider; `size` is the full extent.
    pub fn collision_rectangular(&mut self, world: &mut PhysicsWorld, size: Vec3, is_sensor: bool) {
        let half = size * 0.5;
        let mut collider = ColliderBuilder::cuboid(half.x, half.y, half.z).sensor(is_sensor);
        if is_sensor {
            // Also sense kinematic actors walking through a fixed sensor
            collider = collider
                .active_collision_types(ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_FIXED);
        }
        self.attach_collider(world, collider, is_sensor);
    }

    pub fn collision_spherical(&mut self, world: &mut PhysicsWorld, radius: f32, is_sensor: bool) {
        self.attach_collider(world, ColliderBuilder::ball(radius).sensor(is_sensor), is_sensor);
    }

    /// Capsule approximation of arbitrary geometry from its bounding box.
    pub fn collision_custom_geometry(&mut self, world: &mut PhysicsWorld, scene: &mut Scene, bounds: &Bounds) {
        let size = bounds.size();
        let half_height = size.y / 4.0;
        let radius = bounds.bounding_sphere_radius() / 4.0;
        let collider =
            ColliderBuilder::capsule_y(half_height, radius).translation(crate::physics::to_vector(Vec3::Y));
        if !self.attach_collider(world, collider, false) {
            return;
        }

        world.set_translation(self.body, Vec3::new(0.0, size.y / 4.0, 0.0));
        let shape = MeshShape::Capsule {
            half_height,
            radius,
            center: Vec3::Y,
        };
        self.create_debug_mesh(scene, shape, Vec3::ZERO, YELLOW);
    }

    /// Make the body immovable.
    pub fn collision_static(&mut self, world: &mut PhysicsWorld) {
        world.set_body_type(self.body, RigidBodyType::Fixed);
    }

    // =========================================================================
    // Per-tick
    // =========================================================================

    /// Copy the body transform into the scene nodes.
    pub fn update(&mut self, delta: f32, world: &PhysicsWorld, scene: &mut Scene) {
        let (Some(translation), Some(rotation)) = (world.translation(self.body), world.rotation(self.body)) else {
            return;
        };

        let (mesh_position, mesh_rotation) = match &mut self.role {
            Role::Actor(actor) => {
                actor.advance(delta);
                (translation - Vec3::Y, Quat::from_rotation_y(actor.facing))
            }
            _ => (translation, rotation),
        };

        if let Some(node) = self.mesh.and_then(|id| scene.get_mut(id)) {
            node.set_transform(mesh_position, mesh_rotation);
        }

        if let Some(node) = self.debug_mesh.and_then(|id| scene.get_mut(id)) {
            if self.show_debug {
                node.visible = true;
                node.set_transform(translation, rotation);
                node.material.color = self.debug_color;
            } else {
                node.visible = false;
            }
        }
    }

    // =========================================================================
    // Movement
    // =========================================================================

    /// Set the body's linear velocity.
    pub fn move_body(&self, world: &mut PhysicsWorld, velocity: Vec3) {
        world.set_linvel(self.body, velocity);
    }

    /// Turn an actor's model to face along `direction` (xz plane).
    pub fn rotate_in_direction(&mut self, direction: Vec3) {
        if direction.x == 0.0 && direction.z == 0.0 {
            return;
        }
        if let Some(actor) = self.actor_mut() {
            actor.facing = (-direction.x).atan2(direction.z);
        }
    }

    /// Switch an actor to animation clip `index`. Returns whether it changed.
    pub fn animate(&mut self, index: usize) -> bool {
        self.actor_mut().map(|a| a.play(index)).unwrap_or(false)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("collider", &self.collider)
            .field("is_sensor", &self.is_sensor)
            .field("collision_key", &self.collision_key)
            .field("role", &self.role)
            .finish()
    }
}
