//! Gamepad support for native and WASM
//!
//! Native: Uses gilrs crate for cross-platform gamepad input
//! WASM: No gamepad backend, the keyboard is the only controller

use macroquad::input::{is_key_down, KeyCode};

use super::{ControllerInput, GamepadReading, InputSource, KeyboardState};

// Standard gamepad button indices (Xbox layout)
pub mod button {
    pub const A: u32 = 0; // South
    pub const B: u32 = 1; // East
    pub const X: u32 = 2; // West
    pub const Y: u32 = 3; // North
    pub const SELECT: u32 = 8;
    pub const START: u32 = 9;
}

fn mask_value(mask: u32, button: u32) -> f32 {
    if mask & (1 << button) != 0 {
        1.0
    } else {
        0.0
    }
}

// ============================================================================
// WASM Implementation
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod platform {
    use super::GamepadReading;

    pub struct Gamepad;

    impl Gamepad {
        pub fn new() -> Self {
            Self
        }

        pub fn poll(&mut self) {}

        pub fn has_gamepad(&self) -> bool {
            false
        }

        pub fn reading(&self) -> Option<GamepadReading> {
            None
        }
    }
}

// ============================================================================
// Native Implementation (gilrs)
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod platform {
    use super::{button, mask_value, GamepadReading};
    use gilrs::{Axis, Button as GilrsButton, Gilrs};

    pub struct Gamepad {
        gilrs: Option<Gilrs>,
    }

    impl Gamepad {
        pub fn new() -> Self {
            let gilrs = match Gilrs::new() {
                Ok(gilrs) => Some(gilrs),
                Err(e) => {
                    log::warn!("Gamepad support unavailable: {}", e);
                    None
                }
            };
            Self { gilrs }
        }

        pub fn poll(&mut self) {
            let Some(gilrs) = self.gilrs.as_mut() else { return };
            // Drain events so gilrs updates its cached state
            while let Some(event) = gilrs.next_event() {
                if let gilrs::EventType::Connected = event.event {
                    log::info!("Gamepad {:?} connected", event.id);
                }
            }
        }

        fn active(&self) -> Option<gilrs::Gamepad<'_>> {
            self.gilrs.as_ref()?.gamepads().next().map(|(_, gp)| gp)
        }

        pub fn has_gamepad(&self) -> bool {
            self.active().is_some()
        }

        fn button_mask(gp: &gilrs::Gamepad<'_>) -> u32 {
            let mut mask = 0u32;
            if gp.is_pressed(GilrsButton::South) { mask |= 1 << button::A; }
            if gp.is_pressed(GilrsButton::East) { mask |= 1 << button::B; }
            if gp.is_pressed(GilrsButton::West) { mask |= 1 << button::X; }
            if gp.is_pressed(GilrsButton::North) { mask |= 1 << button::Y; }
            if gp.is_pressed(GilrsButton::Select) { mask |= 1 << button::SELECT; }
            if gp.is_pressed(GilrsButton::Start) { mask |= 1 << button::START; }
            mask
        }

        /// Current stick and button values of the first connected pad
        pub fn reading(&self) -> Option<GamepadReading> {
            let gp = self.active()?;
            let mask = Self::button_mask(&gp);
            Some(GamepadReading {
                stick_x: gp.value(Axis::LeftStickX),
                // Down is positive, matching the keyboard mapping
                stick_y: -gp.value(Axis::LeftStickY),
                button_a: mask_value(mask, button::A),
                button_b: mask_value(mask, button::B),
                button_x: mask_value(mask, button::X),
                button_y: mask_value(mask, button::Y),
                select: mask_value(mask, button::SELECT),
                start: mask_value(mask, button::START),
            })
        }
    }
}

pub use platform::Gamepad;

impl Default for Gamepad {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyboard plus first gamepad, as a single player
pub struct GamepadInput {
    gamepad: Gamepad,
}

impl GamepadInput {
    pub fn new() -> Self {
        Self {
            gamepad: Gamepad::new(),
        }
    }

    pub fn has_gamepad(&self) -> bool {
        self.gamepad.has_gamepad()
    }

    fn keyboard() -> KeyboardState {
        KeyboardState {
            up: is_key_down(KeyCode::Up),
            down: is_key_down(KeyCode::Down),
            left: is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::Right),
            z: is_key_down(KeyCode::Z),
            x: is_key_down(KeyCode::X),
        }
    }
}

impl Default for GamepadInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for GamepadInput {
    fn poll(&mut self) -> Vec<ControllerInput> {
        self.gamepad.poll();
        let input = ControllerInput::from_keys(Self::keyboard());
        let input = match self.gamepad.reading() {
            Some(pad) => input.with_gamepad(pad),
            None => input,
        };
        vec![input]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_value() {
        let mask = (1 << button::A) | (1 << button::START);
        assert_eq!(mask_value(mask, button::A), 1.0);
        assert_eq!(mask_value(mask, button::START), 1.0);
        assert_eq!(mask_value(mask, button::B), 0.0);
    }
}
