//! Input handling with gamepad support
//!
//! Every tick the game loop asks its `InputSource` for one `ControllerInput`
//! per player. The window source reads the keyboard (arrows, Z, X) and lets
//! an attached gamepad override it; tests and headless runs use
//! `ScriptedInput`.
//!
//! Native: Uses gilrs crate for cross-platform gamepad input
//! WASM: Keyboard only

mod gamepad;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub use gamepad::{button, Gamepad, GamepadInput};

/// Stick values at or below this magnitude leave the keyboard axis alone
pub const AXIS_THRESHOLD: f32 = 0.1;

/// One player's controls for a single tick.
///
/// Axes are in -1..1 with up and left negative. Buttons carry the pressure
/// reported by the device (0 or 1 for digital buttons and keys).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerInput {
    pub horizontal: f32,
    pub vertical: f32,
    pub button_a: f32,
    pub button_b: f32,
    pub button_x: f32,
    pub button_y: f32,
    pub select: f32,
    pub start: f32,
}

impl ControllerInput {
    /// Build from held keys: arrows move, Z is A, X is B.
    pub fn from_keys(keys: KeyboardState) -> Self {
        let axis = |neg: bool, pos: bool| match (neg, pos) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        Self {
            horizontal: axis(keys.left, keys.right),
            vertical: axis(keys.up, keys.down),
            button_a: if keys.z { 1.0 } else { 0.0 },
            button_b: if keys.x { 1.0 } else { 0.0 },
            ..Self::default()
        }
    }

    /// Let a gamepad's readings override keyboard input where it is active.
    pub fn with_gamepad(mut self, pad: GamepadReading) -> Self {
        self.horizontal = override_axis(self.horizontal, pad.stick_x);
        self.vertical = override_axis(self.vertical, pad.stick_y);
        self.button_a = self.button_a.max(pad.button_a);
        self.button_b = self.button_b.max(pad.button_b);
        self.button_x = self.button_x.max(pad.button_x);
        self.button_y = self.button_y.max(pad.button_y);
        self.select = self.select.max(pad.select);
        self.start = self.start.max(pad.start);
        self
    }

    pub fn a_pressed(&self) -> bool {
        self.button_a > 0.5
    }

    pub fn b_pressed(&self) -> bool {
        self.button_b > 0.5
    }

    /// Movement on the xz plane
    pub fn direction(&self) -> macroquad::math::Vec3 {
        macroquad::math::Vec3::new(self.horizontal, 0.0, self.vertical)
    }
}

fn override_axis(keyboard: f32, stick: f32) -> f32 {
    if stick.abs() > AXIS_THRESHOLD {
        stick
    } else {
        keyboard
    }
}

/// Keys the keyboard mapping looks at
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyboardState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub z: bool,
    pub x: bool,
}

/// Raw values read from one gamepad. Stick y is positive downward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GamepadReading {
    pub stick_x: f32,
    pub stick_y: f32,
    pub button_a: f32,
    pub button_b: f32,
    pub button_x: f32,
    pub button_y: f32,
    pub select: f32,
    pub start: f32,
}

/// Supplies controller state once per tick
pub trait InputSource {
    fn poll(&mut self) -> Vec<ControllerInput>;
}

/// Replays prepared inputs, then repeats the idle input forever.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    frames: VecDeque<Vec<ControllerInput>>,
    idle: Vec<ControllerInput>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            idle: vec![ControllerInput::default()],
        }
    }

    pub fn push(&mut self, inputs: Vec<ControllerInput>) {
        self.frames.push_back(inputs);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Vec<ControllerInput> {
        self.frames.pop_front().unwrap_or_else(|| self.idle.clone())
    }
}
