//! Client-side world view.
//!
//! The server sends every entity every frame but no frame delimiter, so the
//! view is updated line by line: each line replaces what is known about that
//! entity, and a line flagged dead or disconnected removes it.

use std::collections::{BTreeMap, VecDeque};

use arena_shared::{
    entity::{Beam, Powerup, PowerupId, Projectile, ProjectileId, Tank, TankId, Wall, WallId},
    protocol::ServerLine,
};

/// Beams are instantaneous; keep a short history for display.
const BEAM_HISTORY: usize = 16;

#[derive(Debug, Default)]
pub struct ArenaView {
    pub tanks: BTreeMap<TankId, Tank>,
    pub projectiles: BTreeMap<ProjectileId, Projectile>,
    pub powerups: BTreeMap<PowerupId, Powerup>,
    pub walls: BTreeMap<WallId, Wall>,
    beams: VecDeque<Beam>,
    lines_seen: u64,
}

impl ArenaView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, line: &ServerLine) {
        self.lines_seen += 1;
        match line {
            ServerLine::Tank(t) if t.disconnected => {
                self.tanks.remove(&t.id);
            }
            ServerLine::Tank(t) => {
                self.tanks.insert(t.id, t.clone());
            }
            ServerLine::Projectile(p) if p.died => {
                self.projectiles.remove(&p.id);
            }
            ServerLine::Projectile(p) => {
                self.projectiles.insert(p.id, p.clone());
            }
            ServerLine::Powerup(p) if p.died => {
                self.powerups.remove(&p.id);
            }
            ServerLine::Powerup(p) => {
                self.powerups.insert(p.id, p.clone());
            }
            ServerLine::Beam(b) => {
                self.beams.push_back(b.clone());
                while self.beams.len() > BEAM_HISTORY {
                    self.beams.pop_front();
                }
            }
            ServerLine::Wall(w) => {
                self.walls.insert(w.id, w.clone());
            }
        }
    }

    pub fn tank(&self, id: TankId) -> Option<&Tank> {
        self.tanks.get(&id)
    }

    /// Most recent beams, oldest first.
    pub fn recent_beams(&self) -> impl Iterator<Item = &Beam> {
        self.beams.iter()
    }

    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }
}
