//! Physics World Adapter
//!
//! Owns every rapier3d set (bodies, colliders, joints) plus the pipeline that
//! advances them. The rest of the crate only talks to physics through this
//! type, using macroquad's `Vec3`/`Quat` at the boundary.
//!
//! Bodies created for entities carry a *stamp* in their user data: the
//! entity's numeric id with the top bit set. The stamp is the only way a
//! contact or intersection reported by rapier gets mapped back to an entity.

use macroquad::math::{Quat, Vec3};
use rapier3d::prelude::*;

pub use rapier3d::prelude::{
    ActiveCollisionTypes, ColliderBuilder, ColliderHandle, RigidBodyBuilder, RigidBodyHandle,
    RigidBodyType,
};

/// Marker bit distinguishing a stamped body from rapier's default user data (0)
const STAMP_BIT: u128 = 1 << 127;

/// Encode an entity id as body user data.
pub fn stamp(id: u64) -> u128 {
    STAMP_BIT | id as u128
}

/// Decode body user data. `None` if the body was never stamped.
pub fn unstamp(user_data: u128) -> Option<u64> {
    if user_data & STAMP_BIT == 0 {
        None
    } else {
        Some((user_data & !STAMP_BIT) as u64)
    }
}

/// Error type for physics world initialization
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsError {
    InvalidGravity([f32; 3]),
    InvalidTimestep(f32),
}

impl std::fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhysicsError::InvalidGravity(g) => {
                write!(f, "Invalid gravity vector: ({}, {}, {})", g[0], g[1], g[2])
            }
            PhysicsError::InvalidTimestep(dt) => write!(f, "Invalid timestep: {}", dt),
        }
    }
}

impl std::error::Error for PhysicsError {}

/// Why a collider could not be traced back to an entity stamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampError {
    /// Collider handle is not in the collider set
    MissingCollider,
    /// Collider is not attached to a rigid body
    NoParent,
    /// Parent body carries no entity stamp
    Unstamped,
}

impl std::fmt::Display for StampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StampError::MissingCollider => write!(f, "collider not found"),
            StampError::NoParent => write!(f, "collider has no parent body"),
            StampError::Unstamped => write!(f, "no user data on collider body"),
        }
    }
}

/// Convert a macroquad vector into a rapier vector
pub fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

/// Convert a rapier vector into a macroquad vector
pub fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// The simulated world: every body and collider lives here.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    /// Create a world with the given gravity and fixed step length (seconds).
    pub fn new(gravity: Vec3, timestep: f32) -> Result<Self, PhysicsError> {
        if !gravity.is_finite() {
            return Err(PhysicsError::InvalidGravity(gravity.to_array()));
        }
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(PhysicsError::InvalidTimestep(timestep));
        }

        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = timestep;

        Ok(Self {
            gravity: to_vector(gravity),
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        })
    }

    /// Advance the simulation by one fixed step.
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    // =========================================================================
    // Creation
    // =========================================================================

    pub fn create_rigid_body(&mut self, body: impl Into<RigidBody>) -> RigidBodyHandle {
        self.bodies.insert(body)
    }

    /// Attach a collider to `parent`.
    pub fn create_collider(
        &mut self,
        collider: impl Into<Collider>,
        parent: RigidBodyHandle,
    ) -> ColliderHandle {
        self.colliders
            .insert_with_parent(collider, parent, &mut self.bodies)
    }

    // =========================================================================
    // Pair queries
    // =========================================================================

    /// Call `f` with the partner of every pair touching `collider` that has
    /// at least one active contact point. One call per collider pair,
    /// regardless of how many contact points the pair has.
    pub fn contacts_with(&self, collider: ColliderHandle, mut f: impl FnMut(ColliderHandle)) {
        for pair in self.narrow_phase.contact_pairs_with(collider) {
            if !pair.has_any_active_contact {
                continue;
            }
            let other = if pair.collider1 == collider {
                pair.collider2
            } else {
                pair.collider1
            };
            f(other);
        }
    }

    /// Call `f` with the partner of every sensor pair currently intersecting
    /// `collider`.
    pub fn intersections_with(&self, collider: ColliderHandle, mut f: impl FnMut(ColliderHandle)) {
        for (c1, c2, intersecting) in self.narrow_phase.intersection_pairs_with(collider) {
            if !intersecting {
                continue;
            }
            let other = if c1 == collider { c2 } else { c1 };
            f(other);
        }
    }

    /// Trace a collider back to the entity stamp on its parent body.
    pub fn collider_stamp(&self, collider: ColliderHandle) -> Result<u64, StampError> {
        let collider = self
            .colliders
            .get(collider)
            .ok_or(StampError::MissingCollider)?;
        let parent = collider.parent().ok_or(StampError::NoParent)?;
        let body = self.bodies.get(parent).ok_or(StampError::NoParent)?;
        unstamp(body.user_data).ok_or(StampError::Unstamped)
    }

    // =========================================================================
    // Body accessors
    // =========================================================================

    pub fn translation(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(body).map(|b| from_vector(b.translation()))
    }

    pub fn rotation(&self, body: RigidBodyHandle) -> Option<Quat> {
        self.bodies.get(body).map(|b| {
            let q = b.rotation();
            Quat::from_xyzw(q.i, q.j, q.k, q.w)
        })
    }

    pub fn body_type(&self, body: RigidBodyHandle) -> Option<RigidBodyType> {
        self.bodies.get(body).map(|b| b.body_type())
    }

    pub fn linvel(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(body).map(|b| from_vector(b.linvel()))
    }

    pub fn set_translation(&mut self, body: RigidBodyHandle, translation: Vec3) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_translation(to_vector(translation), true);
        }
    }

    pub fn set_linvel(&mut self, body: RigidBodyHandle, velocity: Vec3) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn set_angvel(&mut self, body: RigidBodyHandle, velocity: Vec3) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_angvel(to_vector(velocity), true);
        }
    }

    pub fn set_body_type(&mut self, body: RigidBodyHandle, body_type: RigidBodyType) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_body_type(body_type, true);
        }
    }

    pub fn lock_rotations(&mut self, body: RigidBodyHandle, locked: bool) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.lock_rotations(locked, true);
        }
    }

    pub fn set_additional_mass(&mut self, body: RigidBodyHandle, mass: f32) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_additional_mass(mass, true);
        }
    }

    pub fn set_angular_damping(&mut self, body: RigidBodyHandle, damping: f32) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_angular_damping(damping);
        }
    }

    pub fn is_sensor(&self, collider: ColliderHandle) -> bool {
        self.colliders
            .get(collider)
            .map(|c| c.is_sensor())
            .unwrap_or(false)
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(Vec3::new(0.0, -9.81, 0.0), DT).unwrap()
    }

    fn cube(world: &mut PhysicsWorld, body: RigidBodyBuilder, half: f32) -> (RigidBodyHandle, ColliderHandle) {
        let handle = world.create_rigid_body(body);
        let collider = world.create_collider(ColliderBuilder::cuboid(half, half, half), handle);
        (handle, collider)
    }

    #[test]
    fn test_invalid_gravity_rejected() {
        let result = PhysicsWorld::new(Vec3::new(0.0, f32::NAN, 0.0), DT);
        assert!(matches!(result, Err(PhysicsError::InvalidGravity(_))));

        let result = PhysicsWorld::new(Vec3::ZERO, 0.0);
        assert_eq!(result.err(), Some(PhysicsError::InvalidTimestep(0.0)));
    }

    #[test]
    fn test_dynamic_body_falls() {
        let mut world = world();
        let (body, _) = cube(&mut world, RigidBodyBuilder::dynamic().translation(vector![0.0, 10.0, 0.0]), 0.5);

        for _ in 0..10 {
            world.step();
        }

        assert!(world.translation(body).unwrap().y < 10.0);
    }

    #[test]
    fn test_fixed_body_stays_put() {
        let mut world = world();
        let (body, _) = cube(&mut world, RigidBodyBuilder::dynamic().translation(vector![1.0, 5.0, 1.0]), 0.5);
        world.set_body_type(body, RigidBodyType::Fixed);

        for _ in 0..30 {
            world.step();
        }

        assert_eq!(world.translation(body), Some(Vec3::new(1.0, 5.0, 1.0)));
    }

    #[test]
    fn test_contacts_reported_once_per_pair() {
        let mut world = world();
        let ground = world.create_rigid_body(RigidBodyBuilder::fixed());
        let ground_collider = world.create_collider(ColliderBuilder::cuboid(5.0, 0.5, 5.0), ground);
        let (_, box_collider) = cube(&mut world, RigidBodyBuilder::dynamic().translation(vector![0.0, 0.95, 0.0]), 0.5);

        world.step();

        let mut partners = Vec::new();
        world.contacts_with(box_collider, |other| partners.push(other));
        assert_eq!(partners, vec![ground_collider]);
    }

    #[test]
    fn test_sensor_intersections() {
        let mut world = world();
        let zone = world.create_rigid_body(RigidBodyBuilder::fixed());
        let zone_collider = world.create_collider(ColliderBuilder::cuboid(2.0, 2.0, 2.0).sensor(true), zone);
        let (_, box_collider) = cube(&mut world, RigidBodyBuilder::dynamic().translation(vector![0.0, 1.0, 0.0]), 0.5);

        world.step();

        assert!(world.is_sensor(zone_collider));
        let mut partners = Vec::new();
        world.intersections_with(zone_collider, |other| partners.push(other));
        assert_eq!(partners, vec![box_collider]);
    }

    #[test]
    fn test_collider_stamp_lookup() {
        let mut world = world();
        let stamped = world.create_rigid_body(RigidBodyBuilder::dynamic().user_data(stamp(42)));
        let stamped_collider = world.create_collider(ColliderBuilder::ball(0.5), stamped);
        let (_, bare_collider) = cube(&mut world, RigidBodyBuilder::dynamic(), 0.5);

        assert_eq!(world.collider_stamp(stamped_collider), Ok(42));
        assert_eq!(world.collider_stamp(bare_collider), Err(StampError::Unstamped));
        assert_eq!(unstamp(0), None);
        assert_eq!(unstamp(stamp(0)), Some(0));
    }
}
