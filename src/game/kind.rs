//! Entity Kinds
//!
//! A kind is a user type that the stage knows how to create. Registration
//! happens once per type, before any instance exists:
//!
//! ```ignore
//! Kind::<Crate>::boxed(EntityOptions::new().color(RED))
//!     .on_collision("hazard", "burn", |krate: &mut Crate, hit: &mut Collision| krate.burn(hit))
//!     .register(&mut stage.kinds);
//! ```
//!
//! The registry is keyed by `TypeId`. Each entry holds the factory that
//! builds instances, the options layered over the factory defaults, the
//! collision table, and the kind's lifecycle hooks as plain function
//! pointers so entities only need to carry a `TypeId` and a boxed instance.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;

use super::collision::{Collision, CollisionHandler, CollisionRegistry};
use super::entity::{Entity, KindId};
use super::factory::{Factory, AREA_TRIGGER, BOX, SPHERE};
use super::frame::FrameHelper;
use super::options::EntityOptions;
use super::stage::Create;
use crate::input::ControllerInput;
use crate::physics::PhysicsWorld;
use crate::render::Scene;

/// Passed to `setup` right before the entity joins the stage
pub struct SetupContext<'a> {
    pub entity: &'a mut Entity,
    /// Create further entities from inside setup
    pub create: Create<'a>,
}

/// Passed to `update` once per tick
pub struct UpdateContext<'a> {
    pub delta: f32,
    pub inputs: &'a [ControllerInput],
    pub entity: &'a mut Entity,
    pub world: &'a mut PhysicsWorld,
    pub scene: &'a mut Scene,
    pub frame: FrameHelper<'a>,
}

/// Passed to trigger enter/exit hooks
pub struct TriggerContext<'a> {
    pub entity: &'a mut Entity,
    pub world: &'a mut PhysicsWorld,
    pub scene: &'a mut Scene,
}

/// Behavior of a creatable entity kind. All hooks are optional.
pub trait EntityClass: Any + Default {
    fn setup(&mut self, _ctx: &mut SetupContext<'_>) {}

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}

    /// Something entered this trigger while it was idle
    fn on_enter(&mut self, _ctx: &mut TriggerContext<'_>) {}

    /// The last overlapping entity left this trigger
    fn on_exit(&mut self, _ctx: &mut TriggerContext<'_>) {}
}

// =============================================================================
// Type-erased hooks
// =============================================================================

type SetupHook = fn(&mut dyn Any, &mut SetupContext<'_>);
type UpdateHook = fn(&mut dyn Any, &mut UpdateContext<'_>);
type TriggerHook = fn(&mut dyn Any, &mut TriggerContext<'_>);

/// Lifecycle hooks of one kind with the concrete type erased
#[derive(Clone, Copy)]
pub struct KindHooks {
    instantiate: fn() -> Box<dyn Any>,
    setup: SetupHook,
    update: UpdateHook,
    on_enter: TriggerHook,
    on_exit: TriggerHook,
}

fn instantiate<K: EntityClass>() -> Box<dyn Any> {
    Box::new(K::default())
}

fn setup_hook<K: EntityClass>(owner: &mut dyn Any, ctx: &mut SetupContext<'_>) {
    if let Some(owner) = owner.downcast_mut::<K>() {
        owner.setup(ctx);
    }
}

fn update_hook<K: EntityClass>(owner: &mut dyn Any, ctx: &mut UpdateContext<'_>) {
    if let Some(owner) = owner.downcast_mut::<K>() {
        owner.update(ctx);
    }
}

fn enter_hook<K: EntityClass>(owner: &mut dyn Any, ctx: &mut TriggerContext<'_>) {
    if let Some(owner) = owner.downcast_mut::<K>() {
        owner.on_enter(ctx);
    }
}

fn exit_hook<K: EntityClass>(owner: &mut dyn Any, ctx: &mut TriggerContext<'_>) {
    if let Some(owner) = owner.downcast_mut::<K>() {
        owner.on_exit(ctx);
    }
}

impl KindHooks {
    fn of<K: EntityClass>() -> Self {
        Self {
            instantiate: instantiate::<K>,
            setup: setup_hook::<K>,
            update: update_hook::<K>,
            on_enter: enter_hook::<K>,
            on_exit: exit_hook::<K>,
        }
    }

    pub fn instantiate(&self) -> Box<dyn Any> {
        (self.instantiate)()
    }

    pub fn setup(&self, owner: &mut dyn Any, ctx: &mut SetupContext<'_>) {
        (self.setup)(owner, ctx)
    }

    pub fn update(&self, owner: &mut dyn Any, ctx: &mut UpdateContext<'_>) {
        (self.update)(owner, ctx)
    }

    pub fn on_enter(&self, owner: &mut dyn Any, ctx: &mut TriggerContext<'_>) {
        (self.on_enter)(owner, ctx)
    }

    pub fn on_exit(&self, owner: &mut dyn Any, ctx: &mut TriggerContext<'_>) {
        (self.on_exit)(owner, ctx)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Everything known about one registered kind
pub struct KindEntry {
    /// Short type name, used as the default entity tag
    pub name: &'static str,
    pub factory: Option<Factory>,
    pub options: EntityOptions,
    pub collisions: Rc<CollisionRegistry>,
    pub hooks: KindHooks,
}

/// Kinds by type id
#[derive(Default)]
pub struct KindRegistry {
    entries: HashMap<KindId, Rc<KindEntry>>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A kind registers once; later attempts are ignored.
    pub fn insert(&mut self, id: KindId, entry: KindEntry) -> bool {
        if self.entries.contains_key(&id) {
            log::warn!("kind {} is already registered", entry.name);
            return false;
        }
        log::debug!("registered kind {} ({} collision handlers)", entry.name, entry.collisions.len());
        self.entries.insert(id, Rc::new(entry));
        true
    }

    pub fn get(&self, id: KindId) -> Option<Rc<KindEntry>> {
        self.entries.get(&id).cloned()
    }

    pub fn get_kind<K: Any>(&self) -> Option<Rc<KindEntry>> {
        self.get(TypeId::of::<K>())
    }

    pub fn contains<K: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<K>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Last path segment of a type name, without generics
pub fn short_type_name<K: ?Sized>() -> &'static str {
    let full = type_name::<K>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// =============================================================================
// Builder
// =============================================================================

/// Declares a kind: how it is built and how it reacts to collisions.
pub struct Kind<K: EntityClass> {
    factory: Option<Factory>,
    options: EntityOptions,
    collisions: CollisionRegistry,
    _kind: PhantomData<fn() -> K>,
}

impl<K: EntityClass> Kind<K> {
    /// A kind with no factory. It can carry hooks and collision handlers
    /// (actors use this) but `create` will refuse it.
    pub fn new() -> Self {
        Self {
            factory: None,
            options: EntityOptions::default(),
            collisions: CollisionRegistry::new(),
            _kind: PhantomData,
        }
    }

    pub fn custom(factory: Factory, options: EntityOptions) -> Self {
        Self {
            factory: Some(factory),
            options,
            ..Self::new()
        }
    }

    pub fn boxed(options: EntityOptions) -> Self {
        Self::custom(BOX, options)
    }

    pub fn sphere(options: EntityOptions) -> Self {
        Self::custom(SPHERE, options)
    }

    pub fn area_trigger(options: EntityOptions) -> Self {
        Self::custom(AREA_TRIGGER, options)
    }

    /// Options layered over the factory defaults
    pub fn options(mut self, options: EntityOptions) -> Self {
        self.options = options;
        self
    }

    /// Run `handler` when an instance touches an entity whose collision key
    /// is `key`.
    pub fn on_collision<F>(mut self, key: impl Into<String>, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut K, &mut Collision<'_>) + 'static,
    {
        self.collisions.insert(key, CollisionHandler::new::<K, F>(name, handler));
        self
    }

    /// Freeze the declaration into `registry`.
    pub fn register(self, registry: &mut KindRegistry) -> bool {
        registry.insert(
            TypeId::of::<K>(),
            KindEntry {
                name: short_type_name::<K>(),
                factory: self.factory,
                options: self.options,
                collisions: Rc::new(self.collisions),
                hooks: KindHooks::of::<K>(),
            },
        )
    }
}

impl<K: EntityClass> Default for Kind<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::options::RED;

    #[derive(Default)]
    struct Crate;
    impl EntityClass for Crate {}

    #[derive(Default)]
    struct Hero;
    impl EntityClass for Hero {}

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Crate>(), "Crate");
        assert_eq!(short_type_name::<Vec<u8>>(), "Vec");
    }

    #[test]
    fn test_register_once() {
        let mut registry = KindRegistry::new();
        assert!(Kind::<Crate>::boxed(EntityOptions::new().color(RED)).register(&mut registry));
        assert!(!Kind::<Crate>::sphere(EntityOptions::new()).register(&mut registry));

        let entry = registry.get_kind::<Crate>().unwrap();
        assert_eq!(entry.name, "Crate");
        assert_eq!(entry.options.color, Some(RED));
        assert_eq!(entry.factory.map(|f| f.name), Some("box"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_collision_table_accumulates() {
        let mut registry = KindRegistry::new();
        Kind::<Hero>::new()
            .on_collision("coin", "collect", |_: &mut Hero, _: &mut Collision<'_>| {})
            .on_collision("hazard", "hurt", |_: &mut Hero, _: &mut Collision<'_>| {})
            .register(&mut registry);

        let entry = registry.get_kind::<Hero>().unwrap();
        assert!(entry.factory.is_none());
        assert_eq!(entry.collisions.keys().collect::<Vec<_>>(), vec!["coin", "hazard"]);
        assert!(!registry.contains::<Crate>());
    }

    #[test]
    fn test_instantiate_builds_default() {
        let hooks = KindHooks::of::<Crate>();
        assert!(hooks.instantiate().downcast_ref::<Crate>().is_some());
    }
}
