//! Pyramid: a small real-time simulation framework
//!
//! Declare entity kinds once, then let the stage step rapier physics, keep
//! the scene in sync with the bodies, and dispatch per-kind collision and
//! trigger handlers every tick. Rendering and input sit behind traits so the
//! whole loop also runs headless.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod game;
pub mod input;
pub mod physics;
pub mod render;

pub use config::GameConfig;
pub use game::{
    Collision, EntityClass, EntityId, EntityOptions, Game, GameLogic, Kind, LoopContext, Stage,
};
