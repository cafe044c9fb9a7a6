//! Input handling.
//!
//! A graphical client would sample keyboard and mouse here. This crate only
//! needs a small input state that turns into one `ControlCommand` per send.

use arena_shared::{
    math::Vec2,
    protocol::{ControlCommand, FireMode, Movement},
};

/// User input state at a moment in time.
#[derive(Debug, Clone, Copy)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire_main: bool,
    pub fire_alt: bool,
    /// Turret direction; need not be normalised.
    pub aim: Vec2,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            up: false,
            down: false,
            left: false,
            right: false,
            fire_main: false,
            fire_alt: false,
            aim: Vec2::UP,
        }
    }
}

impl InputState {
    /// Only one direction is sent per command. Opposite keys cancel out and
    /// vertical movement wins over horizontal.
    pub fn movement(self) -> Movement {
        match (self.up, self.down, self.left, self.right) {
            (true, false, _, _) => Movement::Up,
            (false, true, _, _) => Movement::Down,
            (_, _, true, false) => Movement::Left,
            (_, _, false, true) => Movement::Right,
            _ => Movement::None,
        }
    }

    pub fn fire(self) -> FireMode {
        if self.fire_alt {
            FireMode::Alt
        } else if self.fire_main {
            FireMode::Main
        } else {
            FireMode::None
        }
    }
}

/// Turns sampled input into a command for the server.
pub fn build_command(input: InputState) -> ControlCommand {
    ControlCommand {
        moving: input.movement(),
        fire: input.fire(),
        tdir: input.aim,
    }
}
