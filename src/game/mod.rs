//! Game Foundation Module
//!
//! Entities, the kinds they are created from, and the stage that steps them.
//!
//! Key concepts:
//! - Entity: one physics body plus optional visual and debug nodes
//! - Kind: a user type registered once with a factory, options and
//!   collision handlers
//! - Stage: owns the world and every entity, runs the per-tick passes
//! - Game: input, stage, user logic and rendering in a loop
//!
//! Design philosophy:
//! - Kinds are registered up front, nothing is discovered at runtime
//! - Entities live for the session
//! - Single-threaded; hooks borrow what they need for the call only

pub mod actor;
pub mod camera;
pub mod collision;
pub mod entity;
pub mod factory;
pub mod frame;
pub mod game_loop;
pub mod globals;
pub mod kind;
pub mod options;
pub mod stage;

// Re-export main types
pub use actor::{ActorError, ActorPayload, ActorState};
pub use camera::PyramidCamera;
pub use collision::{Collision, CollisionHandler, CollisionRegistry};
pub use entity::{Entity, EntityId, KindId, Role, TriggerState};
pub use factory::{BuildContext, CreateError, Factory, AREA_TRIGGER, BOX, SPHERE};
pub use frame::{Frame, FrameHelper};
pub use game_loop::{FpsLimit, Game, GameError, GameLogic, LoopContext, LoopControl};
pub use globals::{GameState, GlobalValue, Globals};
pub use kind::{EntityClass, Kind, KindRegistry, SetupContext, TriggerContext, UpdateContext};
pub use options::EntityOptions;
pub use stage::{Create, Stage};
