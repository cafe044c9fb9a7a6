//! Wire protocol.
//!
//! Everything is newline-delimited UTF-8 over one TCP stream:
//! - client -> server: the display name as a raw line, then one
//!   [`ControlCommand`] JSON object per line;
//! - server -> client: tank id and arena size as two integer lines, one wall
//!   per line, then one frame per tick made of entity lines.
//!
//! Server lines are told apart by their identity key (`tank`, `proj`, ...).
//! [`decode_server_line`] resolves that once into a [`ServerLine`] so callers
//! dispatch on the variant instead of probing keys.

use anyhow::Context;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::{
    entity::{Beam, Powerup, Projectile, Tank, TankId, Wall},
    math::Vec2,
};

/// Requested movement for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    #[default]
    None,
    Up,
    Left,
    Down,
    Right,
}

impl Movement {
    /// Unit direction of travel; zero for [`Movement::None`].
    pub fn direction(self) -> Vec2 {
        match self {
            Movement::None => Vec2::ZERO,
            Movement::Up => Vec2::UP,
            Movement::Left => Vec2::LEFT,
            Movement::Down => Vec2::DOWN,
            Movement::Right => Vec2::RIGHT,
        }
    }
}

/// Requested weapon for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FireMode {
    #[default]
    None,
    /// Projectile, subject to the fire cooldown.
    Main,
    /// Beam, consumes one held power-up.
    Alt,
}

fn default_aim() -> Vec2 {
    Vec2::UP
}

/// Client -> server control command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    #[serde(default)]
    pub moving: Movement,
    #[serde(default)]
    pub fire: FireMode,
    #[serde(default = "default_aim")]
    pub tdir: Vec2,
}

impl Default for ControlCommand {
    fn default() -> Self {
        Self {
            moving: Movement::None,
            fire: FireMode::None,
            tdir: default_aim(),
        }
    }
}

impl ControlCommand {
    pub fn decode(line: &str) -> anyhow::Result<Self> {
        serde_json::from_str(line).context("decode control command")
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).context("encode control command")
    }
}

/// Any entity line the server can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerLine {
    Tank(Tank),
    Projectile(Projectile),
    Beam(Beam),
    Powerup(Powerup),
    Wall(Wall),
}

pub fn decode_server_line(line: &str) -> anyhow::Result<ServerLine> {
    serde_json::from_str(line).context("decode server line")
}

/// Builds one broadcast frame: one JSON object per line.
///
/// The finished frame is a [`Bytes`], so fanning it out to every session only
/// bumps a refcount.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    buf: BytesMut,
    lines: usize,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T: Serialize>(&mut self, line: &T) -> anyhow::Result<()> {
        serde_json::to_writer((&mut self.buf).writer(), line).context("encode frame line")?;
        self.buf.put_u8(b'\n');
        self.lines += 1;
        Ok(())
    }

    pub fn push_scalar(&mut self, value: impl std::fmt::Display) {
        self.buf.extend_from_slice(value.to_string().as_bytes());
        self.buf.put_u8(b'\n');
        self.lines += 1;
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Server side of the join handshake: tank id, arena size, then every wall.
pub fn encode_handshake(tank: TankId, arena_size: u32, walls: &[Wall]) -> anyhow::Result<Bytes> {
    let mut enc = FrameEncoder::new();
    enc.push_scalar(tank);
    enc.push_scalar(arena_size);
    for wall in walls {
        enc.push(wall)?;
    }
    Ok(enc.finish())
}

/// Parses one of the integer handshake lines.
pub fn parse_scalar_line(line: &str) -> anyhow::Result<u32> {
    line.trim()
        .parse()
        .with_context(|| format!("expected integer line, got {line:?}"))
}
