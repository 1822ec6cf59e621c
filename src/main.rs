//! Pyramid demo
//!
//! A floor, a stack of crates, a bouncing ball and a lava pit. The hero is
//! loaded from `assets/actors/hero.ron` and walks with the arrow keys or the
//! left stick. Tab toggles debug wireframes, Backspace undoes the last
//! visit counter change, F cycles the frame rate
//! limit, Escape quits.

use macroquad::prelude::*;

use pyramid::game::options::{GREEN, RED, YELLOW};
use pyramid::game::globals::state;
use pyramid::game::{
    Collision, EntityClass, EntityId, EntityOptions, Game, GameError, GameLogic, Globals, Kind,
    LoopContext, Stage, TriggerContext, UpdateContext,
};
use pyramid::input::GamepadInput;
use pyramid::render::MacroquadRenderer;
use pyramid::{GameConfig, VERSION};

const CONFIG_PATH: &str = "assets/pyramid.ron";
const HERO_PATH: &str = "assets/actors/hero.ron";
const HERO_SPEED: f32 = 4.0;
const BALL_KICK: f32 = 6.0;

fn load_config() -> GameConfig {
    GameConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        log::warn!("Using default config: {}", e);
        GameConfig::default()
    })
}

fn window_conf() -> Conf {
    let config = load_config();
    Conf {
        window_title: format!("{} v{}", config.title, VERSION),
        window_width: config.window_width,
        window_height: config.window_height,
        window_resizable: true,
        high_dpi: true,
        #[cfg(not(target_arch = "wasm32"))]
        fullscreen: false,
        ..Default::default()
    }
}

// =============================================================================
// Kinds
// =============================================================================

#[derive(Default)]
struct Ground;
impl EntityClass for Ground {}

#[derive(Default)]
struct Crate {
    landed: bool,
    burnt: bool,
}

impl Crate {
    fn land(&mut self, hit: &mut Collision<'_>) {
        if !self.landed {
            log::debug!("{} landed on {}", hit.entity.id(), hit.target.id());
            self.landed = true;
        }
    }

    fn burn(&mut self, hit: &mut Collision<'_>) {
        if self.burnt {
            return;
        }
        self.burnt = true;
        if let Some(mesh) = hit.entity.mesh {
            if let Some(node) = hit.scene.get_mut(mesh) {
                node.material.color = RED;
            }
        }
        log::info!("{} fell into the lava", hit.entity.id());
    }
}

impl EntityClass for Crate {}

#[derive(Default)]
struct Ball;

impl EntityClass for Ball {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if ctx.frame.every(2.0, || log::trace!("kick {}", ctx.entity.id())) {
            ctx.world.set_linvel(ctx.entity.body(), Vec3::new(0.0, BALL_KICK, 0.0));
        }
    }
}

#[derive(Default)]
struct Lava {
    visits: u32,
}

impl EntityClass for Lava {
    fn on_enter(&mut self, ctx: &mut TriggerContext<'_>) {
        self.visits += 1;
        ctx.entity.debug_color = RED;
        log::info!("Something entered the lava ({} visits)", self.visits);
    }

    fn on_exit(&mut self, ctx: &mut TriggerContext<'_>) {
        ctx.entity.debug_color = YELLOW;
        log::info!("The lava is empty again");
    }
}

#[derive(Default)]
struct Hero;

impl EntityClass for Hero {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let Some(input) = ctx.inputs.first() else {
            return;
        };
        let velocity = input.direction() * HERO_SPEED;
        ctx.entity.move_body(ctx.world, velocity);
        ctx.entity.rotate_in_direction(velocity);
        ctx.entity.animate(if velocity.length_squared() > 0.0 { 1 } else { 0 });
    }
}

// =============================================================================
// Game
// =============================================================================

#[derive(Default)]
struct Demo {
    lava: Option<EntityId>,
    lava_visits: u32,
}

impl GameLogic for Demo {
    fn setup(&mut self, stage: &mut Stage, globals: &mut Globals) -> Result<(), GameError> {
        Kind::<Ground>::boxed(
            EntityOptions::new()
                .size(30.0, 1.0, 30.0)
                .color(0x3a3a3a)
                .fixed(true)
                .collision_key("ground"),
        )
        .register(&mut stage.kinds);
        Kind::<Crate>::boxed(EntityOptions::new().color(0xb5835a))
            .on_collision("ground", "land", Crate::land)
            .on_collision("lava", "burn", Crate::burn)
            .register(&mut stage.kinds);
        Kind::<Ball>::sphere(EntityOptions::new().radius(0.75).color(GREEN).collision_key("ball"))
            .register(&mut stage.kinds);
        Kind::<Lava>::area_trigger(
            EntityOptions::new()
                .size(4.0, 1.0, 4.0)
                .debug(true, YELLOW)
                .collision_key("lava"),
        )
        .register(&mut stage.kinds);
        Kind::<Hero>::new().register(&mut stage.kinds);

        stage.create::<Ground>(EntityOptions::new().position(0.0, -0.5, 0.0))?;
        for level in 0..4 {
            let y = 0.5 + level as f32 * 1.5;
            stage.create::<Crate>(EntityOptions::new().position(-3.0 + level as f32 * 0.2, y, 0.0))?;
        }
        stage.create::<Crate>(EntityOptions::new().position(6.0, 8.0, 0.0))?;
        let ball = stage.create::<Ball>(EntityOptions::new().position(3.0, 2.0, -2.0))?;
        self.lava = Some(stage.create::<Lava>(EntityOptions::new().position(6.0, 0.5, 0.0))?);

        stage.camera.follow_entity(ball);
        globals.set(state([("lava_visits", 0)]));
        Ok(())
    }

    fn update(&mut self, ctx: &mut LoopContext<'_>) {
        if is_key_pressed(KeyCode::Escape) {
            ctx.control.stop();
            return;
        }
        if is_key_pressed(KeyCode::Tab) {
            let show = !ctx.stage.children().any(|e| e.show_debug);
            ctx.stage.set_show_debug(show);
        }
        if is_key_pressed(KeyCode::F) {
            *ctx.fps_limit = ctx.fps_limit.next();
            log::info!("FPS limit: {}", ctx.fps_limit.label());
        }
        if is_key_pressed(KeyCode::Backspace) && ctx.globals.undo() {
            log::info!("Undo: lava visits back to {:?}", ctx.globals.get("lava_visits"));
        }

        let visits = self
            .lava
            .and_then(|id| ctx.stage.owner::<Lava>(id))
            .map(|lava| lava.visits)
            .unwrap_or(0);
        if visits != self.lava_visits {
            self.lava_visits = visits;
            ctx.globals.update(state([("lava_visits", visits as i64)]));
        }
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config();
    let mut game = match Game::new(
        config,
        Demo::default(),
        Box::new(GamepadInput::new()),
        MacroquadRenderer::new(),
    ) {
        Ok(game) => game,
        Err(e) => {
            log::error!("Failed to start: {}", e);
            return;
        }
    };

    match game.stage.load_actor::<Hero>(HERO_PATH, EntityOptions::new()).await {
        Ok(hero) => game.stage.camera.follow_entity(hero),
        Err(e) => log::warn!("Playing without a hero: {}", e),
    }
    game.load_textures().await;

    game.run().await;
}
