//! Game Loop
//!
//! One tick: poll input, update the stage (physics, entities, collisions,
//! camera), run the game's own per-tick logic, then render. `run` repeats
//! ticks once per macroquad frame until the logic asks to stop.

use macroquad::prelude::{get_frame_time, get_time, next_frame, Vec3};
use serde::{Deserialize, Serialize};

use super::actor::ActorError;
use super::factory::CreateError;
use super::globals::Globals;
use super::stage::Stage;
use crate::config::{ConfigError, GameConfig};
use crate::input::{ControllerInput, InputSource};
use crate::physics::{PhysicsError, PhysicsWorld};
use crate::render::{MacroquadRenderer, Renderer};

/// FPS limit setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FpsLimit {
    Fps30,
    #[default]
    Fps60,
    /// As fast as possible
    Unlocked,
}

impl FpsLimit {
    /// Get the target frame time in seconds (None = unlocked)
    pub fn frame_time(&self) -> Option<f64> {
        match self {
            FpsLimit::Fps30 => Some(1.0 / 30.0),
            FpsLimit::Fps60 => Some(1.0 / 60.0),
            FpsLimit::Unlocked => None,
        }
    }

    /// Cycle to next value
    pub fn next(self) -> Self {
        match self {
            FpsLimit::Fps30 => FpsLimit::Fps60,
            FpsLimit::Fps60 => FpsLimit::Unlocked,
            FpsLimit::Unlocked => FpsLimit::Fps30,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FpsLimit::Fps30 => "30",
            FpsLimit::Fps60 => "60",
            FpsLimit::Unlocked => "Unlocked",
        }
    }
}

/// Error type for game startup
#[derive(Debug)]
pub enum GameError {
    Physics(PhysicsError),
    Config(ConfigError),
    Create(CreateError),
    Actor(ActorError),
}

impl From<PhysicsError> for GameError {
    fn from(e: PhysicsError) -> Self {
        GameError::Physics(e)
    }
}

impl From<ConfigError> for GameError {
    fn from(e: ConfigError) -> Self {
        GameError::Config(e)
    }
}

impl From<CreateError> for GameError {
    fn from(e: CreateError) -> Self {
        GameError::Create(e)
    }
}

impl From<ActorError> for GameError {
    fn from(e: ActorError) -> Self {
        GameError::Actor(e)
    }
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::Physics(e) => write!(f, "Physics error: {}", e),
            GameError::Config(e) => write!(f, "Config error: {}", e),
            GameError::Create(e) => write!(f, "Create error: {}", e),
            GameError::Actor(e) => write!(f, "Actor error: {}", e),
        }
    }
}

impl std::error::Error for GameError {}

/// Lets per-tick logic end the loop
#[derive(Debug, Default)]
pub struct LoopControl {
    stopped: bool,
}

impl LoopControl {
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Handed to `GameLogic::update` every tick
pub struct LoopContext<'a> {
    /// Seconds since the previous tick
    pub delta: f32,
    /// Ticks completed before this one
    pub ticks: u64,
    pub inputs: &'a [ControllerInput],
    pub stage: &'a mut Stage,
    pub globals: &'a mut Globals,
    pub control: &'a mut LoopControl,
    /// Frame pacing `run` applies after this tick
    pub fps_limit: &'a mut FpsLimit,
}

/// The game's own code: registers kinds, creates the first entities, and
/// reacts to input every tick.
pub trait GameLogic {
    fn setup(&mut self, stage: &mut Stage, globals: &mut Globals) -> Result<(), GameError>;

    fn update(&mut self, _ctx: &mut LoopContext<'_>) {}
}

pub struct Game<R: Renderer> {
    pub config: GameConfig,
    pub stage: Stage,
    pub globals: Globals,
    pub fps_limit: FpsLimit,
    pub renderer: R,
    logic: Box<dyn GameLogic>,
    input: Box<dyn InputSource>,
    control: LoopControl,
    ticks: u64,
}

impl<R: Renderer> Game<R> {
    /// Build the physics world and stage, then run the logic's setup.
    pub fn new(
        config: GameConfig,
        logic: impl GameLogic + 'static,
        input: Box<dyn InputSource>,
        renderer: R,
    ) -> Result<Self, GameError> {
        let world = PhysicsWorld::new(Vec3::from(config.gravity), config.timestep)?;
        let mut stage = Stage::new(world);
        stage.scene.background = config.background;

        let mut globals = Globals::default();
        let mut logic: Box<dyn GameLogic> = Box::new(logic);
        logic.setup(&mut stage, &mut globals)?;
        if config.show_debug {
            stage.set_show_debug(true);
        }
        log::info!(
            "Game ready: {} entities, {} colliders, {} kinds",
            stage.len(),
            stage.world.collider_count(),
            stage.kinds.len()
        );

        Ok(Self {
            fps_limit: config.fps_limit,
            config,
            stage,
            globals,
            logic,
            input,
            renderer,
            control: LoopControl::default(),
            ticks: 0,
        })
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_stopped(&self) -> bool {
        self.control.is_stopped()
    }

    pub fn stop(&mut self) {
        self.control.stop();
    }

    /// Run one tick. Returns false once the loop has been asked to stop.
    pub fn tick(&mut self, delta: f32) -> bool {
        if self.control.is_stopped() {
            return false;
        }

        let inputs = self.input.poll();
        self.stage.update(delta, &inputs);

        let mut ctx = LoopContext {
            delta,
            ticks: self.ticks,
            inputs: &inputs,
            stage: &mut self.stage,
            globals: &mut self.globals,
            control: &mut self.control,
            fps_limit: &mut self.fps_limit,
        };
        self.logic.update(&mut ctx);

        self.renderer.render(&self.stage.scene, &self.stage.camera);
        self.ticks += 1;
        !self.control.is_stopped()
    }

    /// Tick once per frame until stopped.
    pub async fn run(mut self) {
        log::info!("Starting {}", self.config.title);

        loop {
            let frame_start = get_time();
            if !self.tick(get_frame_time()) {
                break;
            }

            if let Some(target_frame_time) = self.fps_limit.frame_time() {
                let elapsed = get_time() - frame_start;
                let remaining = target_frame_time - elapsed;

                if remaining > 0.0 {
                    // Native: use sleep for bulk, then spin-wait for precision
                    #[cfg(not(target_arch = "wasm32"))]
                    {
                        let spin_margin = 0.002; // 2ms
                        while get_time() - frame_start + spin_margin < target_frame_time {
                            std::thread::sleep(std::time::Duration::from_millis(1));
                        }
                        while get_time() - frame_start < target_frame_time {
                            std::hint::spin_loop();
                        }
                    }
                    // WASM: just spin-wait (no thread::sleep available)
                    #[cfg(target_arch = "wasm32")]
                    {
                        while get_time() - frame_start < target_frame_time {}
                    }
                }
            }

            next_frame().await;
        }

        log::info!("Stopped after {} ticks", self.ticks);
    }
}

impl Game<MacroquadRenderer> {
    /// Load the textures the stage's scene references. Call after setup and
    /// again whenever new textured entities appear.
    pub async fn load_textures(&mut self) {
        self.renderer.load_textures(&self.stage.scene).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{EntityClass, EntityOptions, Kind};
    use crate::input::ScriptedInput;
    use crate::render::HeadlessRenderer;

    #[derive(Default)]
    struct Ball;
    impl EntityClass for Ball {}

    #[derive(Default)]
    struct Bouncy {
        updates: u64,
        stop_at: u64,
    }

    impl GameLogic for Bouncy {
        fn setup(&mut self, stage: &mut Stage, globals: &mut Globals) -> Result<(), GameError> {
            Kind::<Ball>::sphere(EntityOptions::new().radius(0.5)).register(&mut stage.kinds);
            stage.create::<Ball>(EntityOptions::new().position(0.0, 5.0, 0.0))?;
            globals.set(crate::game::globals::state([("score", 0)]));
            Ok(())
        }

        fn update(&mut self, ctx: &mut LoopContext<'_>) {
            assert_eq!(ctx.ticks, self.updates);
            self.updates += 1;
            ctx.globals.update(crate::game::globals::state([("score", self.updates as i64)]));
            if self.updates == self.stop_at {
                ctx.control.stop();
            }
        }
    }

    fn game(stop_at: u64) -> Game<HeadlessRenderer> {
        Game::new(
            GameConfig::default(),
            Bouncy { updates: 0, stop_at },
            Box::new(ScriptedInput::new()),
            HeadlessRenderer::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_runs_setup() {
        let game = game(10);
        assert_eq!(game.stage.len(), 1);
        assert_eq!(game.ticks(), 0);
        assert!(game.globals.get("score").is_some());
    }

    #[test]
    fn test_tick_until_stopped() {
        let mut game = game(3);
        let mut ran = 0;
        while game.tick(1.0 / 60.0) {
            ran += 1;
        }
        assert_eq!(ran, 2);
        assert_eq!(game.ticks(), 3);
        assert!(game.is_stopped());
        assert_eq!(game.renderer.frames, 3);
        assert!(!game.tick(1.0 / 60.0));
        assert_eq!(game.globals.get("score").and_then(|v| v.as_int()), Some(3));
    }

    #[test]
    fn test_invalid_gravity_fails() {
        let config = GameConfig {
            gravity: [0.0, f32::INFINITY, 0.0],
            ..GameConfig::default()
        };
        let result = Game::new(
            config,
            Bouncy::default(),
            Box::new(ScriptedInput::new()),
            HeadlessRenderer::new(),
        );
        assert!(matches!(result, Err(GameError::Physics(PhysicsError::InvalidGravity(_)))));
    }

    struct Throttle;

    impl GameLogic for Throttle {
        fn setup(&mut self, _stage: &mut Stage, _globals: &mut Globals) -> Result<(), GameError> {
            Ok(())
        }

        fn update(&mut self, ctx: &mut LoopContext<'_>) {
            *ctx.fps_limit = ctx.fps_limit.next();
        }
    }

    #[test]
    fn test_logic_cycles_fps_limit() {
        let mut game = Game::new(
            GameConfig::default(),
            Throttle,
            Box::new(ScriptedInput::new()),
            HeadlessRenderer::new(),
        )
        .unwrap();
        assert_eq!(game.fps_limit, FpsLimit::Fps60);

        game.tick(1.0 / 60.0);
        assert_eq!(game.fps_limit, FpsLimit::Unlocked);
        assert_eq!(game.fps_limit.frame_time(), None);
        assert_eq!(game.fps_limit.label(), "Unlocked");

        game.tick(1.0 / 60.0);
        assert_eq!(game.fps_limit.label(), "30");
        game.tick(1.0 / 60.0);
        assert_eq!(game.fps_limit, FpsLimit::Fps60);
    }
}
