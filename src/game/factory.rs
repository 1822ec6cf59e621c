//! Entity Factories
//!
//! A factory turns merged `EntityOptions` into a finished entity: material,
//! visual and debug nodes, body, collider, and the tuning every primitive
//! gets. Factories are plain function tables so a kind entry can hold one by
//! value.

use macroquad::math::Vec3;

use super::actor::{ActorPayload, ActorState, ACTOR_MASS};
use super::entity::{Entity, Role, TriggerState};
use super::options::{EntityOptions, WHITE};
use crate::physics::{PhysicsWorld, RigidBodyType};
use crate::render::{MeshShape, Scene, SceneNode};

/// Additional mass given to box and sphere bodies
pub const PRIMITIVE_MASS: f32 = 0.02;
/// Angular damping applied to box and sphere bodies after creation
pub const PRIMITIVE_ANGULAR_DAMPING: f32 = 0.1;

/// Error type for entity creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateError {
    /// Kind was never registered, or was registered without a factory
    UnrecognizedKind(&'static str),
}

impl std::fmt::Display for CreateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateError::UnrecognizedKind(name) => write!(f, "Unrecognized entity kind: {}", name),
        }
    }
}

impl std::error::Error for CreateError {}

/// Inputs to a factory's build function
pub struct BuildContext<'a> {
    pub world: &'a mut PhysicsWorld,
    pub scene: &'a mut Scene,
    /// Tag used when the options don't set one
    pub tag: &'a str,
    /// Fully merged options
    pub options: &'a EntityOptions,
}

impl BuildContext<'_> {
    fn tag(&self) -> String {
        self.options.tag.clone().unwrap_or_else(|| self.tag.to_string())
    }
}

#[derive(Clone, Copy)]
pub struct Factory {
    pub name: &'static str,
    pub defaults: fn() -> EntityOptions,
    pub build: fn(&mut BuildContext<'_>) -> Entity,
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory").field("name", &self.name).finish()
    }
}

pub const BOX: Factory = Factory {
    name: "box",
    defaults: box_defaults,
    build: build_box,
};

pub const SPHERE: Factory = Factory {
    name: "sphere",
    defaults: sphere_defaults,
    build: build_sphere,
};

pub const AREA_TRIGGER: Factory = Factory {
    name: "area_trigger",
    defaults: trigger_defaults,
    build: build_area_trigger,
};

// =============================================================================
// Defaults
// =============================================================================

fn primitive_defaults() -> EntityOptions {
    EntityOptions {
        position: Some([0.0, 0.0, 0.0]),
        color: Some(WHITE),
        texture_size: Some([1.0, 1.0]),
        debug_color: Some(WHITE),
        show_debug: Some(false),
        fixed: Some(false),
        is_sensor: Some(false),
        ..EntityOptions::default()
    }
}

pub fn box_defaults() -> EntityOptions {
    primitive_defaults().size(1.0, 1.0, 1.0)
}

pub fn sphere_defaults() -> EntityOptions {
    primitive_defaults().radius(1.0)
}

pub fn trigger_defaults() -> EntityOptions {
    EntityOptions {
        position: Some([0.0, 0.0, 0.0]),
        debug_color: Some(WHITE),
        show_debug: Some(false),
        ..EntityOptions::default()
    }
    .size(1.0, 1.0, 1.0)
}

pub fn actor_defaults() -> EntityOptions {
    EntityOptions {
        color: Some(WHITE),
        show_debug: Some(false),
        ..EntityOptions::default()
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Material, debug color and position shared by the visual primitives
fn begin_primitive(ctx: &mut BuildContext<'_>) -> (Entity, Vec3) {
    let opts = ctx.options;
    let position = Vec3::from(opts.position_or_origin());
    let mut entity = Entity::new(ctx.tag(), ctx.world, position);
    entity.apply_material(
        opts.texture_path.clone(),
        opts.color.unwrap_or(WHITE),
        opts.texture_size.unwrap_or([1.0, 1.0]),
    );
    entity.debug_color = opts.debug_color.unwrap_or(WHITE);
    (entity, position)
}

/// Body tuning and flags shared by the visual primitives
fn finish_primitive(world: &mut PhysicsWorld, entity: &mut Entity, opts: &EntityOptions) {
    world.set_additional_mass(entity.body(), PRIMITIVE_MASS);
    world.set_angular_damping(entity.body(), PRIMITIVE_ANGULAR_DAMPING);
    if opts.is_fixed() {
        entity.collision_static(world);
    }
    entity.debug_color = opts.debug_color.unwrap_or(WHITE);
    entity.show_debug = opts.show_debug.unwrap_or(false);
    entity.collision_key = opts.collision_key.clone();
}

fn build_box(ctx: &mut BuildContext<'_>) -> Entity {
    let (mut entity, position) = begin_primitive(ctx);
    let size = Vec3::from(ctx.options.box_size());
    entity.rectangular_mesh(ctx.scene, size, position);
    entity.collision_rectangular(ctx.world, size, ctx.options.is_sensor.unwrap_or(false));
    finish_primitive(ctx.world, &mut entity, ctx.options);
    entity
}

fn build_sphere(ctx: &mut BuildContext<'_>) -> Entity {
    let (mut entity, position) = begin_primitive(ctx);
    let radius = ctx.options.radius.unwrap_or(1.0);
    entity.spherical_mesh(ctx.scene, radius, position);
    entity.collision_spherical(ctx.world, radius, ctx.options.is_sensor.unwrap_or(false));
    finish_primitive(ctx.world, &mut entity, ctx.options);
    entity
}

/// Invisible static sensor box with enter/exit hooks. Only its debug
/// wireframe is ever drawn.
fn build_area_trigger(ctx: &mut BuildContext<'_>) -> Entity {
    let opts = ctx.options;
    let position = Vec3::from(opts.position_or_origin());
    let size = Vec3::from(opts.box_size());

    let mut entity = Entity::new(ctx.tag(), ctx.world, position);
    entity.create_debug_mesh(
        ctx.scene,
        MeshShape::Cuboid { size },
        position,
        opts.debug_color.unwrap_or(WHITE),
    );
    entity.collision_rectangular(ctx.world, size, true);
    entity.collision_static(ctx.world);
    entity.show_debug = opts.show_debug.unwrap_or(false);
    entity.collision_key = opts.collision_key.clone();
    entity.role = Role::Trigger(TriggerState::default());
    entity
}

/// Build a player actor from a loaded payload.
///
/// The body ends up at the payload position (or the `position` option),
/// lifted by a quarter of the model height so the capsule sits on it.
pub fn build_actor(ctx: &mut BuildContext<'_>, payload: &ActorPayload) -> Entity {
    let opts = ctx.options;
    let position = Vec3::from(opts.position.unwrap_or(payload.position));
    let size = payload.bounds.size();

    let mut entity = Entity::new(ctx.tag(), ctx.world, position);
    entity.collision_custom_geometry(ctx.world, ctx.scene, &payload.bounds);
    ctx.world
        .set_translation(entity.body(), position + Vec3::new(0.0, size.y / 4.0, 0.0));

    let mut model = SceneNode::new(
        MeshShape::Model { bounds: payload.bounds },
        crate::render::Material::solid(opts.color.unwrap_or(WHITE)),
    );
    model.position = position - Vec3::Y;
    entity.mesh = Some(ctx.scene.add(model));

    let body = entity.body();
    ctx.world.lock_rotations(body, true);
    ctx.world.set_additional_mass(body, ACTOR_MASS);
    ctx.world.set_body_type(body, RigidBodyType::KinematicVelocityBased);

    if let Some(color) = opts.debug_color {
        entity.debug_color = color;
    }
    entity.show_debug = opts.show_debug.unwrap_or(false);
    entity.collision_key = opts.collision_key.clone();
    entity.role = Role::Actor(ActorState::new(payload.clips.clone()));
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::options::RED;
    use crate::render::Bounds;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(Vec3::new(0.0, -9.81, 0.0), 1.0 / 60.0).unwrap()
    }

    fn build(factory: Factory, params: EntityOptions, world: &mut PhysicsWorld, scene: &mut Scene) -> Entity {
        let options = (factory.defaults)().merge(&params);
        let mut ctx = BuildContext {
            world,
            scene,
            tag: "Thing",
            options: &options,
        };
        (factory.build)(&mut ctx)
    }

    #[test]
    fn test_box_defaults() {
        let mut world = world();
        let mut scene = Scene::new();
        let entity = build(BOX, EntityOptions::new(), &mut world, &mut scene);

        assert_eq!(entity.tag, "Thing");
        assert!(entity.collider().is_some());
        assert!(!entity.is_sensor());
        assert_eq!(world.body_type(entity.body()), Some(RigidBodyType::Dynamic));

        let mesh = scene.get(entity.mesh.unwrap()).unwrap();
        assert_eq!(mesh.shape, MeshShape::Cuboid { size: Vec3::ONE });
        assert_eq!(mesh.material.color, WHITE);
        assert!(entity.debug_mesh.is_some());
    }

    #[test]
    fn test_fixed_box_is_static() {
        let mut world = world();
        let mut scene = Scene::new();
        let entity = build(
            BOX,
            EntityOptions::new().fixed(true).color(RED).position(0.0, 3.0, 0.0),
            &mut world,
            &mut scene,
        );

        assert_eq!(world.body_type(entity.body()), Some(RigidBodyType::Fixed));
        for _ in 0..20 {
            world.step();
        }
        assert_eq!(world.translation(entity.body()), Some(Vec3::new(0.0, 3.0, 0.0)));
        assert_eq!(scene.get(entity.mesh.unwrap()).unwrap().material.color, RED);
    }

    #[test]
    fn test_sphere_ignores_box_fields() {
        let mut world = world();
        let mut scene = Scene::new();
        let entity = build(SPHERE, EntityOptions::new().size(9.0, 9.0, 9.0).radius(0.5), &mut world, &mut scene);

        let mesh = scene.get(entity.mesh.unwrap()).unwrap();
        assert_eq!(mesh.shape, MeshShape::Sphere { radius: 0.5 });
    }

    #[test]
    fn test_area_trigger() {
        let mut world = world();
        let mut scene = Scene::new();
        let entity = build(
            AREA_TRIGGER,
            EntityOptions::new().size(4.0, 2.0, 4.0).collision_key("zone").tag("goal"),
            &mut world,
            &mut scene,
        );

        assert!(entity.is_sensor());
        assert!(entity.is_trigger());
        assert!(entity.mesh.is_none());
        assert!(entity.debug_mesh.is_some());
        assert_eq!(entity.tag, "goal");
        assert_eq!(entity.collision_key.as_deref(), Some("zone"));
        assert_eq!(world.body_type(entity.body()), Some(RigidBodyType::Fixed));
    }

    #[test]
    fn test_build_actor() {
        let mut world = world();
        let mut scene = Scene::new();
        let payload = ActorPayload {
            position: [2.0, 0.0, 0.0],
            bounds: Bounds::new(Vec3::new(-0.5, 0.0, -0.5), Vec3::new(0.5, 4.0, 0.5)),
            clips: vec!["idle".into()],
        };
        let options = actor_defaults();
        let mut ctx = BuildContext {
            world: &mut world,
            scene: &mut scene,
            tag: "Hero",
            options: &options,
        };
        let entity = build_actor(&mut ctx, &payload);

        assert!(entity.is_actor());
        assert_eq!(world.body_type(entity.body()), Some(RigidBodyType::KinematicVelocityBased));
        assert_eq!(world.translation(entity.body()), Some(Vec3::new(2.0, 1.0, 0.0)));
        assert_eq!(entity.actor().unwrap().current_clip(), Some("idle"));
        assert!(entity.mesh.is_some());
    }
}
