//! Stage
//!
//! Owns the physics world, the scene, the camera and every entity, and runs
//! one simulation tick:
//!
//! 1. step physics
//! 2. sync every entity (insertion order) and run its `update` hook
//! 3. contact pass: solid entities whose kind has collision handlers
//! 4. intersection pass: sensors, including trigger enter/exit
//! 5. camera follow
//!
//! Entities are indexed once, when they are added: `colliders` holds solid
//! entities whose kind registered collision handlers, `intersectors` holds
//! sensors, `players` holds actors. Entities live for the whole session.

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap};

use macroquad::math::Vec3;

use super::actor::{ActorError, ActorPayload};
use super::camera::PyramidCamera;
use super::collision::Collision;
use super::entity::{Entity, EntityId, Role};
use super::factory::{actor_defaults, build_actor, BuildContext, CreateError};
use super::frame::FrameHelper;
use super::kind::{short_type_name, EntityClass, KindEntry, KindRegistry, SetupContext, TriggerContext, UpdateContext};
use super::options::EntityOptions;
use crate::input::ControllerInput;
use crate::physics::{ColliderHandle, PhysicsWorld};
use crate::render::Scene;

pub struct Stage {
    pub world: PhysicsWorld,
    pub scene: Scene,
    pub camera: PyramidCamera,
    pub kinds: KindRegistry,
    children: HashMap<EntityId, Entity>,
    /// Insertion order of `children`
    order: Vec<EntityId>,
    colliders: Vec<EntityId>,
    intersectors: Vec<EntityId>,
    players: Vec<EntityId>,
}

/// Entity creation handle passed to setup hooks
pub struct Create<'a> {
    stage: &'a mut Stage,
}

impl<'a> Create<'a> {
    pub fn new(stage: &'a mut Stage) -> Self {
        Self { stage }
    }

    pub fn create<K: EntityClass>(&mut self, params: EntityOptions) -> Result<EntityId, CreateError> {
        self.stage.create::<K>(params)
    }

    pub fn create_actor<K: EntityClass>(
        &mut self,
        payload: &ActorPayload,
        params: EntityOptions,
    ) -> Result<EntityId, ActorError> {
        self.stage.create_actor::<K>(payload, params)
    }

    pub fn camera(&mut self) -> &mut PyramidCamera {
        &mut self.stage.camera
    }
}

impl Stage {
    pub fn new(world: PhysicsWorld) -> Self {
        Self {
            world,
            scene: Scene::new(),
            camera: PyramidCamera::new(),
            kinds: KindRegistry::new(),
            children: HashMap::new(),
            order: Vec::new(),
            colliders: Vec::new(),
            intersectors: Vec::new(),
            players: Vec::new(),
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Build an entity of kind `K` with `params` layered over the kind's
    /// options and the factory defaults, then add it to the stage.
    pub fn create<K: EntityClass>(&mut self, params: EntityOptions) -> Result<EntityId, CreateError> {
        let unrecognized = || CreateError::UnrecognizedKind(short_type_name::<K>());
        let entry = self.kinds.get_kind::<K>().ok_or_else(unrecognized)?;
        let factory = entry.factory.ok_or_else(unrecognized)?;

        let options = EntityOptions::layered(&(factory.defaults)(), &entry.options, &params);
        let mut ctx = BuildContext {
            world: &mut self.world,
            scene: &mut self.scene,
            tag: entry.name,
            options: &options,
        };
        let mut entity = (factory.build)(&mut ctx);
        entity.kind = Some(TypeId::of::<K>());
        entity.owner = Some(entry.hooks.instantiate());

        log::debug!("created {} {} via {}", entry.name, entity.id(), factory.name);
        Ok(self.add_child(entity))
    }

    /// Build an actor of kind `K` from an already loaded payload.
    pub fn create_actor<K: EntityClass>(
        &mut self,
        payload: &ActorPayload,
        params: EntityOptions,
    ) -> Result<EntityId, ActorError> {
        let entry = self
            .kinds
            .get_kind::<K>()
            .ok_or(ActorError::UnrecognizedKind(short_type_name::<K>()))?;

        let options = EntityOptions::layered(&actor_defaults(), &entry.options, &params);
        let mut ctx = BuildContext {
            world: &mut self.world,
            scene: &mut self.scene,
            tag: entry.name,
            options: &options,
        };
        let mut entity = build_actor(&mut ctx, payload);
        entity.kind = Some(TypeId::of::<K>());
        entity.owner = Some(entry.hooks.instantiate());

        log::info!("created actor {} {}", entry.name, entity.id());
        Ok(self.add_child(entity))
    }

    /// Load an actor payload (RON) and build it. Nothing is added on failure.
    pub async fn load_actor<K: EntityClass>(&mut self, path: &str, params: EntityOptions) -> Result<EntityId, ActorError> {
        let payload = ActorPayload::fetch(path).await.map_err(|e| {
            log::error!("failed to load actor {}: {}", path, e);
            e
        })?;
        self.create_actor::<K>(&payload, params)
    }

    /// Run the entity's setup hook, then insert and index it.
    pub fn add_child(&mut self, mut entity: Entity) -> EntityId {
        let id = entity.id();

        if let Some(entry) = self.entry_of(&entity) {
            if let Some(mut owner) = entity.owner.take() {
                let mut ctx = SetupContext {
                    entity: &mut entity,
                    create: Create::new(self),
                };
                entry.hooks.setup(owner.as_mut(), &mut ctx);
                entity.owner = Some(owner);
            }
        }

        if entity.collider().is_some() {
            if entity.is_sensor() {
                self.intersectors.push(id);
            } else if self.entry_of(&entity).is_some_and(|e| !e.collisions.is_empty()) {
                self.colliders.push(id);
            }
        } else {
            log::warn!("{} ({}) has no collider, it will not take part in collisions", id, entity.tag);
        }
        if entity.is_actor() {
            self.players.push(id);
        }

        self.order.push(id);
        self.children.insert(id, entity);
        id
    }

    fn entry_of(&self, entity: &Entity) -> Option<std::rc::Rc<KindEntry>> {
        entity.kind.and_then(|kind| self.kinds.get(kind))
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.children.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.children.get_mut(&id)
    }

    /// Entities in insertion order
    pub fn children(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.children.get(id))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn colliders(&self) -> &[EntityId] {
        &self.colliders
    }

    pub fn intersectors(&self) -> &[EntityId] {
        &self.intersectors
    }

    pub fn players(&self) -> &[EntityId] {
        &self.players
    }

    /// The first actor added, if any
    pub fn player(&self) -> Option<EntityId> {
        self.players.first().copied()
    }

    /// Borrow the kind instance of an entity
    pub fn owner<K: EntityClass>(&self, id: EntityId) -> Option<&K> {
        self.children.get(&id).and_then(|e| e.owner::<K>())
    }

    pub fn owner_mut<K: EntityClass>(&mut self, id: EntityId) -> Option<&mut K> {
        self.children.get_mut(&id).and_then(|e| e.owner_mut::<K>())
    }

    /// Map a collider back to its entity through the body stamp.
    pub fn entity_from_collider(&self, collider: ColliderHandle) -> Option<&Entity> {
        self.resolve(collider).and_then(|id| self.children.get(&id))
    }

    fn resolve(&self, collider: ColliderHandle) -> Option<EntityId> {
        match self.world.collider_stamp(collider) {
            Ok(raw) => {
                let id = EntityId::from_raw(raw);
                if self.children.contains_key(&id) {
                    Some(id)
                } else {
                    log::debug!("collider belongs to {} which is not on this stage", id);
                    None
                }
            }
            Err(e) => {
                log::warn!("cannot resolve collider {:?}: {}", collider, e);
                None
            }
        }
    }

    // =========================================================================
    // Actor helpers
    // =========================================================================

    /// Drive an entity's body by velocity and turn it to face the motion.
    pub fn move_actor(&mut self, id: EntityId, velocity: Vec3) {
        if let Some(entity) = self.children.get_mut(&id) {
            entity.move_body(&mut self.world, velocity);
            entity.rotate_in_direction(velocity);
        }
    }

    pub fn animate(&mut self, id: EntityId, clip: usize) -> bool {
        self.children.get_mut(&id).map(|e| e.animate(clip)).unwrap_or(false)
    }

    /// Turn debug wireframes on or off for every entity
    pub fn set_show_debug(&mut self, show: bool) {
        for entity in self.children.values_mut() {
            entity.show_debug = show;
        }
    }

    // =========================================================================
    // Tick
    // =========================================================================

    pub fn update(&mut self, delta: f32, inputs: &[ControllerInput]) {
        self.world.step();

        for i in 0..self.order.len() {
            let id = self.order[i];
            let Some(entity) = self.children.get_mut(&id) else {
                continue;
            };
            entity.update(delta, &self.world, &mut self.scene);

            let Some(entry) = entity.kind.and_then(|kind| self.kinds.get(kind)) else {
                continue;
            };
            let Some(mut owner) = entity.owner.take() else {
                continue;
            };
            let mut frames = std::mem::take(&mut entity.frames);
            {
                let mut ctx = UpdateContext {
                    delta,
                    inputs,
                    entity: &mut *entity,
                    world: &mut self.world,
                    scene: &mut self.scene,
                    frame: FrameHelper::new(&mut frames, delta),
                };
                entry.hooks.update(owner.as_mut(), &mut ctx);
            }
            entity.frames = frames;
            entity.owner = Some(owner);
        }

        self.update_collision();
        self.camera.update(&self.world, &self.children);
    }

    pub fn update_collision(&mut self) {
        self.update_colliders();
        self.update_intersectors();
    }

    /// Dispatch handlers for every active contact of every solid collider.
    pub fn update_colliders(&mut self) {
        for i in 0..self.colliders.len() {
            let id = self.colliders[i];
            let Some(collider) = self.children.get(&id).and_then(|e| e.collider()) else {
                continue;
            };

            let mut partners = Vec::new();
            self.world.contacts_with(collider, |other| partners.push(other));

            for other in partners {
                let Some(target) = self.resolve(other) else {
                    continue;
                };
                if target == id {
                    continue;
                }
                self.dispatch(id, target);
            }
        }
    }

    /// Track what each sensor overlaps and fire handlers on new overlaps.
    ///
    /// Exit is handled before enter. A trigger fires `on_enter` when it goes
    /// from empty to occupied and `on_exit` when it goes back to empty;
    /// entities staying inside do not dispatch again.
    pub fn update_intersectors(&mut self) {
        for i in 0..self.intersectors.len() {
            let id = self.intersectors[i];
            let Some(collider) = self.children.get(&id).and_then(|e| e.collider()) else {
                continue;
            };

            let mut handles = Vec::new();
            self.world.intersections_with(collider, |other| handles.push(other));
            let current: BTreeSet<EntityId> = handles
                .into_iter()
                .filter_map(|h| self.resolve(h))
                .filter(|other| *other != id)
                .collect();

            let Some(mut entity) = self.children.remove(&id) else {
                continue;
            };
            let previous = std::mem::replace(&mut entity.overlaps, current.clone());

            if !previous.is_empty() && current.is_empty() {
                self.set_trigger(&mut entity, false);
            }

            for partner in current.difference(&previous) {
                let Some(other) = self.children.get_mut(partner) else {
                    continue;
                };
                dispatch_between(&self.kinds, &mut self.world, &mut self.scene, &mut entity, other);
                if !other.is_sensor() {
                    dispatch_between(&self.kinds, &mut self.world, &mut self.scene, other, &mut entity);
                }
                self.set_trigger(&mut entity, true);
            }

            self.children.insert(id, entity);
        }
    }

    /// Run the initiator's handler for the target's collision key.
    fn dispatch(&mut self, initiator: EntityId, target: EntityId) -> bool {
        let Some(mut entity) = self.children.remove(&initiator) else {
            return false;
        };
        let dispatched = match self.children.get_mut(&target) {
            Some(other) => dispatch_between(&self.kinds, &mut self.world, &mut self.scene, &mut entity, other),
            None => false,
        };
        self.children.insert(initiator, entity);
        dispatched
    }

    /// Move a trigger between idle and entered, running the matching hook on
    /// a real transition. Non-trigger sensors only track overlaps.
    fn set_trigger(&mut self, entity: &mut Entity, entered: bool) {
        let Role::Trigger(state) = &mut entity.role else {
            return;
        };
        if state.entered == entered {
            return;
        }
        state.entered = entered;
        log::debug!("{} {}", entity.id(), if entered { "entered" } else { "exited" });

        let Some(entry) = entity.kind.and_then(|kind| self.kinds.get(kind)) else {
            return;
        };
        let Some(mut owner) = entity.owner.take() else {
            return;
        };
        {
            let mut ctx = TriggerContext {
                entity: &mut *entity,
                world: &mut self.world,
                scene: &mut self.scene,
            };
            if entered {
                entry.hooks.on_enter(owner.as_mut(), &mut ctx);
            } else {
                entry.hooks.on_exit(owner.as_mut(), &mut ctx);
            }
        }
        entity.owner = Some(owner);
    }
}

/// Look up `target`'s collision key in `entity`'s kind table and run the
/// handler. Returns whether a handler ran.
fn dispatch_between(
    kinds: &KindRegistry,
    world: &mut PhysicsWorld,
    scene: &mut Scene,
    entity: &mut Entity,
    target: &mut Entity,
) -> bool {
    let Some(entry) = entity.kind.and_then(|kind| kinds.get(kind)) else {
        return false;
    };
    let Some(key) = target.collision_key.as_deref() else {
        return false;
    };
    let Some(handler) = entry.collisions.get(key) else {
        return false;
    };
    let Some(mut owner) = entity.owner.take() else {
        return false;
    };

    log::trace!("{} -> {} ({})", entity.id(), target.id(), handler.name);
    handler.call(
        owner.as_mut(),
        &mut Collision {
            entity: &mut *entity,
            target,
            world,
            scene,
        },
    );
    entity.owner = Some(owner);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::kind::Kind;
    use crate::game::options::RED;

    fn stage() -> Stage {
        Stage::new(PhysicsWorld::new(Vec3::new(0.0, -9.81, 0.0), 1.0 / 60.0).unwrap())
    }

    #[derive(Default)]
    struct Floor;
    impl EntityClass for Floor {}

    #[derive(Default)]
    struct Crate {
        hits: Vec<EntityId>,
        updates: u32,
        ticks: u32,
    }

    impl EntityClass for Crate {
        fn update(&mut self, ctx: &mut UpdateContext<'_>) {
            self.updates += 1;
            let ticks = &mut self.ticks;
            ctx.frame.every(0.5, || *ticks += 1);
        }
    }

    #[derive(Default)]
    struct Spawner;

    impl EntityClass for Spawner {
        fn setup(&mut self, ctx: &mut SetupContext<'_>) {
            ctx.entity.tag = "spawner".to_string();
            let _ = ctx.create.create::<Floor>(EntityOptions::new().position(5.0, 0.0, 0.0));
        }
    }

    #[derive(Default)]
    struct Unregistered;
    impl EntityClass for Unregistered {}

    fn register(stage: &mut Stage) {
        Kind::<Floor>::boxed(EntityOptions::new().size(10.0, 1.0, 10.0).fixed(true).collision_key("floor"))
            .register(&mut stage.kinds);
        Kind::<Crate>::boxed(EntityOptions::new().color(RED))
            .on_collision("floor", "land", |krate: &mut Crate, hit: &mut Collision<'_>| {
                krate.hits.push(hit.target.id());
            })
            .register(&mut stage.kinds);
        Kind::<Spawner>::sphere(EntityOptions::new().fixed(true)).register(&mut stage.kinds);
    }

    #[test]
    fn test_unregistered_kind() {
        let mut stage = stage();
        let result = stage.create::<Unregistered>(EntityOptions::new());
        assert_eq!(result, Err(CreateError::UnrecognizedKind("Unregistered")));
        assert!(stage.is_empty());
    }

    #[test]
    fn test_kind_without_factory() {
        let mut stage = stage();
        Kind::<Unregistered>::new().register(&mut stage.kinds);
        assert!(stage.create::<Unregistered>(EntityOptions::new()).is_err());
    }

    #[test]
    fn test_create_merges_options_and_indexes() {
        let mut stage = stage();
        register(&mut stage);

        let floor = stage.create::<Floor>(EntityOptions::new()).unwrap();
        let krate = stage.create::<Crate>(EntityOptions::new().position(0.0, 2.0, 0.0)).unwrap();

        let entity = stage.entity(krate).unwrap();
        assert_eq!(entity.tag, "Crate");
        let mesh = stage.scene.get(entity.mesh.unwrap()).unwrap();
        assert_eq!(mesh.material.color, RED);

        // Floor has no collision handlers of its own
        assert_eq!(stage.colliders(), &[krate]);
        assert!(stage.intersectors().is_empty());
        assert_eq!(stage.children().map(|e| e.id()).collect::<Vec<_>>(), vec![floor, krate]);
        assert!(stage.owner::<Crate>(krate).is_some());
    }

    #[test]
    fn test_setup_can_create() {
        let mut stage = stage();
        register(&mut stage);

        let spawner = stage.create::<Spawner>(EntityOptions::new()).unwrap();
        assert_eq!(stage.len(), 2);
        assert_eq!(stage.entity(spawner).unwrap().tag, "spawner");
        assert!(stage.children().any(|e| e.tag == "Floor"));
    }

    #[test]
    fn test_contact_dispatch_once_per_tick() {
        let mut stage = stage();
        register(&mut stage);

        let floor = stage.create::<Floor>(EntityOptions::new()).unwrap();
        // Resting on the floor from the start
        let krate = stage.create::<Crate>(EntityOptions::new().position(0.0, 0.99, 0.0)).unwrap();

        stage.update(1.0 / 60.0, &[]);
        let hits = stage.owner::<Crate>(krate).unwrap().hits.clone();
        assert_eq!(hits, vec![floor]);

        stage.update(1.0 / 60.0, &[]);
        assert_eq!(stage.owner::<Crate>(krate).unwrap().hits.len(), 2);
    }

    #[test]
    fn test_update_hook_and_frame_helper() {
        let mut stage = stage();
        register(&mut stage);
        let krate = stage.create::<Crate>(EntityOptions::new().position(0.0, 50.0, 0.0)).unwrap();

        for _ in 0..6 {
            stage.update(0.25, &[]);
        }

        let owner = stage.owner::<Crate>(krate).unwrap();
        assert_eq!(owner.updates, 6);
        // created at 0.25, then fires on ticks 2, 4 and 6
        assert_eq!(owner.ticks, 3);
    }

    #[test]
    fn test_entity_from_collider() {
        let mut stage = stage();
        register(&mut stage);
        let floor = stage.create::<Floor>(EntityOptions::new()).unwrap();
        let collider = stage.entity(floor).unwrap().collider().unwrap();

        assert_eq!(stage.entity_from_collider(collider).map(|e| e.id()), Some(floor));
    }

    #[test]
    fn test_camera_follow() {
        let mut stage = stage();
        register(&mut stage);
        let floor = stage.create::<Floor>(EntityOptions::new().position(1.0, -2.0, 3.0)).unwrap();

        stage.camera.follow_entity(floor);
        stage.update(1.0 / 60.0, &[]);
        assert_eq!(stage.camera.target, Vec3::new(1.0, -2.0, 3.0));
    }
}
