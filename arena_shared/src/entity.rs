//! Arena entities.
//!
//! Every entity serialises to exactly one protocol line. Fields the client
//! never sees (held power-ups, cooldown and respawn bookkeeping) are skipped
//! by serde and only exist on the server side.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{AxisBox, Vec2};

/// Hit points of a freshly spawned tank.
pub const MAX_HP: u8 = 3;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Tank identity; also identifies the owning session.
    TankId
);
entity_id!(ProjectileId);
entity_id!(PowerupId);
entity_id!(WallId);

/// A player-controlled tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    #[serde(rename = "tank")]
    pub id: TankId,
    #[serde(rename = "loc")]
    pub location: Vec2,
    /// Body orientation; the last movement direction (zero when idle).
    #[serde(rename = "bdir")]
    pub orientation: Vec2,
    /// Turret direction, always normalised.
    #[serde(rename = "tdir")]
    pub aiming: Vec2,
    pub name: String,
    pub hp: u8,
    pub score: u32,
    pub died: bool,
    #[serde(rename = "dc")]
    pub disconnected: bool,
    #[serde(rename = "join")]
    pub joined: bool,

    #[serde(skip)]
    pub powerups: u32,
    #[serde(skip)]
    pub respawn_tick: Option<u64>,
    #[serde(skip)]
    pub last_fire_tick: Option<u64>,
    /// Death already reported in a frame; the tank stays out of frames until it respawns.
    #[serde(skip)]
    pub hidden: bool,
}

impl Tank {
    pub fn new(id: TankId, name: impl Into<String>, location: Vec2) -> Self {
        Self {
            id,
            location,
            orientation: Vec2::ZERO,
            aiming: Vec2::UP,
            name: name.into(),
            hp: MAX_HP,
            score: 0,
            died: false,
            disconnected: false,
            joined: true,
            powerups: 0,
            respawn_tick: None,
            last_fire_tick: None,
            hidden: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0 && !self.died && !self.disconnected
    }

    /// Removes one hit point. Returns true when the hit killed the tank.
    pub fn damage(&mut self, tick: u64, respawn_delay: u64) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hp -= 1;
        if self.hp == 0 {
            self.kill(tick, respawn_delay);
            return true;
        }
        false
    }

    /// Kills the tank outright and schedules its respawn strictly after `tick`.
    ///
    /// Killing an already-dead tank keeps its original respawn tick.
    pub fn kill(&mut self, tick: u64, respawn_delay: u64) {
        if self.died {
            return;
        }
        self.hp = 0;
        self.died = true;
        self.respawn_tick = Some(tick + respawn_delay.max(1));
    }

    /// Brings a dead tank back at `location`; the score survives.
    pub fn respawn_at(&mut self, location: Vec2) {
        self.location = location;
        self.orientation = Vec2::ZERO;
        self.aiming = Vec2::UP;
        self.hp = MAX_HP;
        self.died = false;
        self.disconnected = false;
        self.joined = false;
        self.powerups = 0;
        self.respawn_tick = None;
        self.hidden = false;
    }
}

/// A main-gun shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    #[serde(rename = "proj")]
    pub id: ProjectileId,
    #[serde(rename = "loc")]
    pub location: Vec2,
    #[serde(rename = "dir")]
    pub direction: Vec2,
    pub died: bool,
    pub owner: TankId,
}

impl Projectile {
    pub fn new(id: ProjectileId, owner: TankId, location: Vec2, direction: Vec2) -> Self {
        Self {
            id,
            location,
            direction: direction.normalize(),
            died: false,
            owner,
        }
    }
}

/// An instantaneous alt-fire beam. Lives for exactly one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beam {
    /// Keyed by the firing tank.
    #[serde(rename = "beam")]
    pub id: TankId,
    #[serde(rename = "org")]
    pub origin: Vec2,
    #[serde(rename = "dir")]
    pub direction: Vec2,
    pub owner: TankId,
}

/// A pickup that grants one beam shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Powerup {
    #[serde(rename = "power")]
    pub id: PowerupId,
    #[serde(rename = "loc")]
    pub location: Vec2,
    pub died: bool,
}

/// Axis-aligned wall segment; both endpoints share either x or y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    #[serde(rename = "wall")]
    pub id: WallId,
    pub p1: Vec2,
    pub p2: Vec2,
}

impl Wall {
    pub fn new(id: WallId, p1: Vec2, p2: Vec2) -> Self {
        Self { id, p1, p2 }
    }

    /// Bounding box of the segment grown by `margin` on every side.
    pub fn bounds(&self, margin: f64) -> AxisBox {
        AxisBox::from_corners(self.p1, self.p2).expand(margin)
    }
}
