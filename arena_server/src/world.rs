//! World simulation.
//!
//! The `World` is the single owner of every entity. The tick scheduler calls
//! into it once per frame under one lock; nothing else mutates entities.
//!
//! Determinism notes:
//! - Entity maps are `BTreeMap`s, so every pass runs in ascending id order and
//!   "first collision wins" is well defined.
//! - The frame counter is the only clock. Cooldowns and respawns are counted
//!   in frames, never in wall-clock time.
//! - Randomness (spawn points, power-up pacing) comes from an owned `StdRng`
//!   that tests can seed.
//!
//! Removal is two-phase: passes only set `died`/`disconnected` flags, and
//! [`World::sweep_dead`] deletes flagged entries once at the end of the tick.

use std::collections::BTreeMap;

use anyhow::Result;
use arena_shared::{
    config::GameSettings,
    entity::{Beam, Powerup, PowerupId, Projectile, ProjectileId, Tank, TankId, Wall, WallId},
    math::{ray_hits_circle, AxisBox, Vec2},
    protocol::{ControlCommand, FireMode, FrameEncoder},
};
use bytes::Bytes;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::tuning::ArenaTuning;

/// Hands out monotonically increasing ids.
#[derive(Debug, Clone)]
struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    fn next(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}

enum Shot {
    Projectile { origin: Vec2, direction: Vec2 },
    Beam,
}

/// Authoritative arena state.
pub struct World {
    settings: GameSettings,
    tuning: ArenaTuning,
    frame: u64,

    tanks: BTreeMap<TankId, Tank>,
    walls: BTreeMap<WallId, Wall>,
    projectiles: BTreeMap<ProjectileId, Projectile>,
    powerups: BTreeMap<PowerupId, Powerup>,
    beams: BTreeMap<TankId, Beam>,

    tank_ids: IdAllocator,
    projectile_ids: IdAllocator,
    powerup_ids: IdAllocator,

    next_powerup_frame: u64,
    rng: StdRng,
}

impl World {
    /// Creates a world seeded from OS entropy.
    pub fn new(settings: GameSettings) -> Self {
        Self::with_rng(settings, ArenaTuning::default(), StdRng::from_entropy())
    }

    /// Creates a world with a fixed seed (reproducible spawns).
    pub fn with_seed(settings: GameSettings, seed: u64) -> Self {
        Self::with_rng(settings, ArenaTuning::default(), StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(settings: GameSettings, tuning: ArenaTuning, rng: StdRng) -> Self {
        let walls = settings
            .walls
            .iter()
            .map(|w| (w.id, w.clone()))
            .collect();

        Self {
            settings,
            tuning,
            frame: 0,
            tanks: BTreeMap::new(),
            walls,
            projectiles: BTreeMap::new(),
            powerups: BTreeMap::new(),
            beams: BTreeMap::new(),
            tank_ids: IdAllocator::starting_at(1),
            projectile_ids: IdAllocator::starting_at(0),
            powerup_ids: IdAllocator::starting_at(0),
            next_powerup_frame: 0,
            rng,
        }
    }

    /// Current frame number.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn arena_size(&self) -> u32 {
        self.settings.universe_size
    }

    pub fn half_size(&self) -> f64 {
        self.settings.half_size()
    }

    pub fn respawn_delay(&self) -> u64 {
        self.settings.respawn_rate
    }

    pub fn tank(&self, id: TankId) -> Option<&Tank> {
        self.tanks.get(&id)
    }

    pub fn tank_mut(&mut self, id: TankId) -> Option<&mut Tank> {
        self.tanks.get_mut(&id)
    }

    pub fn tanks(&self) -> impl Iterator<Item = &Tank> {
        self.tanks.values()
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    pub fn powerups(&self) -> impl Iterator<Item = &Powerup> {
        self.powerups.values()
    }

    pub fn beams(&self) -> impl Iterator<Item = &Beam> {
        self.beams.values()
    }

    pub fn walls(&self) -> Vec<Wall> {
        self.walls.values().cloned().collect()
    }

    /// Spawns a tank for a newly joined player and returns its id.
    pub fn add_tank(&mut self, name: &str) -> TankId {
        let id = TankId(self.tank_ids.next());
        let location = self.random_clear_point(self.tuning.tank_wall_margin);
        self.tanks.insert(id, Tank::new(id, name, location));
        info!(tank_id = %id, name = %name, x = location.x, y = location.y, "Tank spawned");
        id
    }

    /// Marks a player's tank as gone. It is reported once with `dc` set and
    /// removed by the following sweep.
    pub fn disconnect(&mut self, id: TankId) {
        let Some(tank) = self.tanks.get_mut(&id) else {
            debug!(tank_id = %id, "Disconnect for unknown tank");
            return;
        };
        tank.disconnected = true;
        tank.died = true;
        tank.hp = 0;
        tank.hidden = false;
        info!(tank_id = %id, name = %tank.name, "Tank disconnected");
    }

    /// Applies one control command to a tank.
    ///
    /// Aim and orientation update immediately. Movement is all-or-nothing:
    /// a step that would end inside a wall's margin leaves the tank in place.
    pub fn apply_command(&mut self, id: TankId, cmd: &ControlCommand) {
        let frame = self.frame;
        let half = self.half_size();
        let size = f64::from(self.settings.universe_size);
        let cooldown = self.settings.frames_per_shot;
        let tuning = self.tuning;
        let walls = &self.walls;

        let Some(tank) = self.tanks.get_mut(&id) else {
            debug!(tank_id = %id, "Command for unknown tank ignored");
            return;
        };
        if !tank.is_alive() {
            return;
        }

        let aim = cmd.tdir.normalize();
        if aim != Vec2::ZERO {
            tank.aiming = aim;
        }

        tank.orientation = cmd.moving.direction();
        if tank.orientation != Vec2::ZERO {
            let next = wrap(tank.location + tank.orientation * tuning.tank_speed, half, size);
            if !blocked_by_walls(walls, next, tuning.tank_wall_margin) {
                tank.location = next;
            }
        }

        let shot = match cmd.fire {
            FireMode::Main => {
                let ready = tank
                    .last_fire_tick
                    .map_or(true, |last| frame.saturating_sub(last) >= cooldown);
                if ready {
                    tank.last_fire_tick = Some(frame);
                    Some(Shot::Projectile {
                        origin: tank.location,
                        direction: tank.aiming,
                    })
                } else {
                    None
                }
            }
            FireMode::Alt if tank.powerups > 0 => {
                tank.powerups -= 1;
                Some(Shot::Beam)
            }
            FireMode::Alt | FireMode::None => None,
        };

        match shot {
            Some(Shot::Projectile { origin, direction }) => {
                let pid = ProjectileId(self.projectile_ids.next());
                self.projectiles
                    .insert(pid, Projectile::new(pid, id, origin, direction));
            }
            Some(Shot::Beam) => self.resolve_beam(id),
            None => {}
        }
    }

    /// Moves every live projectile one step and resolves the first thing it
    /// runs into: an enemy tank, then a wall, then the arena edge.
    pub fn advance_projectiles(&mut self) {
        let frame = self.frame;
        let half = self.half_size();
        let respawn_delay = self.respawn_delay();
        let tuning = self.tuning;
        let mut kills = Vec::new();

        for proj in self.projectiles.values_mut() {
            if proj.died {
                continue;
            }
            let next = proj.location + proj.direction * tuning.projectile_speed;
            proj.location = next;

            let victim = self.tanks.values_mut().find(|t| {
                t.id != proj.owner
                    && t.is_alive()
                    && AxisBox::around(t.location, tuning.tank_half_width).contains(next)
            });
            if let Some(victim) = victim {
                proj.died = true;
                if victim.damage(frame, respawn_delay) {
                    kills.push((proj.owner, victim.id));
                }
                continue;
            }

            if blocked_by_walls(&self.walls, next, tuning.projectile_wall_margin)
                || out_of_bounds(next, half)
            {
                proj.died = true;
            }
        }

        for (killer, victim) in kills {
            self.credit_kill(killer, victim);
        }
    }

    /// Fires `shooter`'s beam along its turret and kills every live tank the
    /// ray crosses. One beam entity is recorded regardless of hits.
    pub fn resolve_beam(&mut self, shooter: TankId) {
        let Some(tank) = self.tanks.get(&shooter) else {
            return;
        };
        let origin = tank.location;
        let direction = tank.aiming;
        let frame = self.frame;
        let respawn_delay = self.respawn_delay();
        let radius = self.tuning.beam_target_radius;

        let victims: Vec<TankId> = self
            .tanks
            .values_mut()
            .filter(|t| {
                t.id != shooter
                    && t.is_alive()
                    && ray_hits_circle(origin, direction, t.location, radius)
            })
            .map(|t| {
                t.kill(frame, respawn_delay);
                t.id
            })
            .collect();

        for victim in victims {
            self.credit_kill(shooter, victim);
        }

        self.beams.insert(
            shooter,
            Beam {
                id: shooter,
                origin,
                direction,
                owner: shooter,
            },
        );
    }

    fn credit_kill(&mut self, killer: TankId, victim: TankId) {
        if let Some(k) = self.tanks.get_mut(&killer) {
            k.score += 1;
            info!(killer = %killer, victim = %victim, score = k.score, "Tank destroyed");
        }
    }

    /// Live power-ups touched by a live tank are consumed by the first such
    /// tank in id order.
    pub fn collect_powerups(&mut self) {
        let half = self.tuning.pickup_half_width;
        for power in self.powerups.values_mut() {
            if power.died {
                continue;
            }
            let taker = self
                .tanks
                .values_mut()
                .find(|t| t.is_alive() && AxisBox::around(t.location, half).contains(power.location));
            if let Some(tank) = taker {
                power.died = true;
                tank.powerups += 1;
                debug!(tank_id = %tank.id, power_id = %power.id, held = tank.powerups, "Power-up collected");
            }
        }
    }

    /// Spawns a power-up when one is due and fewer than the cap are live,
    /// then draws the next due frame.
    pub fn spawn_powerups(&mut self) {
        if self.frame < self.next_powerup_frame {
            return;
        }

        let live = self.powerups.values().filter(|p| !p.died).count();
        if live < self.tuning.max_powerups {
            let location = self.random_clear_point(self.tuning.powerup_wall_margin);
            let id = PowerupId(self.powerup_ids.next());
            self.powerups.insert(
                id,
                Powerup {
                    id,
                    location,
                    died: false,
                },
            );
            debug!(power_id = %id, x = location.x, y = location.y, "Power-up spawned");
        }

        let gap = self.rng.gen_range(0..=self.settings.max_powerup_delay);
        self.next_powerup_frame = self.frame + gap;
    }

    /// Brings back every dead tank whose respawn frame has been reached.
    pub fn respawn_due_tanks(&mut self) {
        let frame = self.frame;
        let due: Vec<TankId> = self
            .tanks
            .values()
            .filter(|t| t.died && !t.disconnected)
            .filter(|t| t.respawn_tick.is_some_and(|at| frame >= at))
            .map(|t| t.id)
            .collect();

        for id in due {
            let location = self.random_clear_point(self.tuning.tank_wall_margin);
            if let Some(tank) = self.tanks.get_mut(&id) {
                tank.respawn_at(location);
                info!(tank_id = %id, frame, x = location.x, y = location.y, "Tank respawned");
            }
        }
    }

    /// Encodes this frame's broadcast.
    ///
    /// Tanks come first, then projectiles, power-ups and beams. A dead tank is
    /// sent once with `died` set and then held back until it respawns.
    pub fn encode_frame(&mut self) -> Result<Bytes> {
        let mut enc = FrameEncoder::new();

        for tank in self.tanks.values_mut() {
            if tank.hidden {
                continue;
            }
            enc.push(&*tank)?;
            tank.joined = false;
            if tank.died {
                tank.hidden = true;
            }
        }
        for proj in self.projectiles.values() {
            enc.push(proj)?;
        }
        for power in self.powerups.values() {
            enc.push(power)?;
        }
        for beam in self.beams.values() {
            enc.push(beam)?;
        }

        Ok(enc.finish())
    }

    /// Drops everything flagged for removal this frame. Beams never survive.
    pub fn sweep_dead(&mut self) {
        self.tanks.retain(|_, t| !t.disconnected);
        self.projectiles.retain(|_, p| !p.died);
        self.powerups.retain(|_, p| !p.died);
        self.beams.clear();
    }

    pub fn advance_frame(&mut self) {
        self.frame += 1;
    }

    /// Uniform random point in the arena outside every wall's `margin`.
    fn random_clear_point(&mut self, margin: f64) -> Vec2 {
        let half = self.half_size();
        let mut candidate = Vec2::ZERO;
        for _ in 0..self.tuning.placement_attempts {
            candidate = Vec2::new(
                self.rng.gen_range(-half..=half),
                self.rng.gen_range(-half..=half),
            );
            if !blocked_by_walls(&self.walls, candidate, margin) && !out_of_bounds(candidate, half)
            {
                return candidate;
            }
        }
        warn!(
            attempts = self.tuning.placement_attempts,
            margin, "No clear spawn point found; using last sample"
        );
        candidate
    }
}

fn blocked_by_walls(walls: &BTreeMap<WallId, Wall>, point: Vec2, margin: f64) -> bool {
    walls.values().any(|w| w.bounds(margin).contains(point))
}

fn out_of_bounds(point: Vec2, half: f64) -> bool {
    point.x.abs() > half || point.y.abs() > half
}

/// Teleports a point that left the arena to the opposite edge.
fn wrap(mut point: Vec2, half: f64, size: f64) -> Vec2 {
    if point.x > half {
        point.x -= size;
    } else if point.x < -half {
        point.x += size;
    }
    if point.y > half {
        point.y -= size;
    } else if point.y < -half {
        point.y += size;
    }
    point
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_shared::protocol::{decode_server_line, Movement, ServerLine};

    fn settings() -> GameSettings {
        GameSettings {
            frames_per_shot: 10,
            respawn_rate: 50,
            max_powerup_delay: 0,
            ..GameSettings::default()
        }
    }

    fn place(world: &mut World, name: &str, at: Vec2) -> TankId {
        let id = world.add_tank(name);
        world.tank_mut(id).unwrap().location = at;
        id
    }

    fn cmd(moving: Movement, fire: FireMode, tdir: Vec2) -> ControlCommand {
        ControlCommand { moving, fire, tdir }
    }

    fn frame_lines(world: &mut World) -> Vec<ServerLine> {
        let frame = world.encode_frame().unwrap();
        std::str::from_utf8(&frame)
            .unwrap()
            .lines()
            .map(|l| decode_server_line(l).unwrap())
            .collect()
    }

    /// One scheduler tick without the session side.
    fn tick(world: &mut World, cmds: &[(TankId, ControlCommand)]) -> Vec<ServerLine> {
        for (id, c) in cmds {
            world.apply_command(*id, c);
        }
        world.advance_projectiles();
        world.collect_powerups();
        world.respawn_due_tanks();
        let lines = frame_lines(world);
        world.sweep_dead();
        world.advance_frame();
        lines
    }

    #[test]
    fn tank_ids_start_at_one_and_increase() {
        let mut world = World::with_seed(settings(), 1);
        assert_eq!(world.add_tank("a"), TankId(1));
        assert_eq!(world.add_tank("b"), TankId(2));
    }

    #[test]
    fn spawn_points_avoid_walls() {
        let mut s = settings();
        s.walls = (0..10u32)
            .map(|i| {
                let x = -900.0 + 200.0 * f64::from(i);
                Wall::new(WallId(i), Vec2::new(x, -1000.0), Vec2::new(x, 1000.0))
            })
            .collect();
        let mut world = World::with_seed(s, 7);
        for n in 0..20 {
            let id = world.add_tank(&format!("t{n}"));
            let loc = world.tank(id).unwrap().location;
            assert!(
                world.walls().iter().all(|w| !w.bounds(55.0).contains(loc)),
                "tank spawned inside a wall at {loc:?}"
            );
        }
    }

    #[test]
    fn wall_blocks_movement() {
        let mut s = settings();
        s.walls = vec![Wall::new(WallId(0), Vec2::new(100.0, -100.0), Vec2::new(100.0, 100.0))];
        let mut world = World::with_seed(s, 2);
        let id = place(&mut world, "a", Vec2::new(42.0, 0.0));

        world.apply_command(id, &cmd(Movement::Right, FireMode::None, Vec2::UP));
        assert_eq!(world.tank(id).unwrap().location, Vec2::new(42.0, 0.0));
        assert_eq!(world.tank(id).unwrap().orientation, Vec2::RIGHT);

        world.apply_command(id, &cmd(Movement::Left, FireMode::None, Vec2::UP));
        assert_eq!(world.tank(id).unwrap().location, Vec2::new(39.0, 0.0));
    }

    #[test]
    fn aim_is_normalised_and_zero_aim_is_ignored() {
        let mut world = World::with_seed(settings(), 3);
        let id = place(&mut world, "a", Vec2::ZERO);
        world.apply_command(id, &cmd(Movement::None, FireMode::None, Vec2::new(0.0, 5.0)));
        assert_eq!(world.tank(id).unwrap().aiming, Vec2::DOWN);
        world.apply_command(id, &cmd(Movement::None, FireMode::None, Vec2::ZERO));
        assert_eq!(world.tank(id).unwrap().aiming, Vec2::DOWN);
    }

    #[test]
    fn tanks_wrap_across_the_edge() {
        let mut world = World::with_seed(settings(), 4);
        let id = place(&mut world, "a", Vec2::new(999.0, 0.0));
        world.apply_command(id, &cmd(Movement::Right, FireMode::None, Vec2::UP));
        assert_eq!(world.tank(id).unwrap().location, Vec2::new(-998.0, 0.0));
    }

    #[test]
    fn tanks_wrap_across_every_edge() {
        let cases = [
            (Vec2::new(-999.0, 0.0), Movement::Left, Vec2::new(998.0, 0.0)),
            (Vec2::new(0.0, 999.0), Movement::Down, Vec2::new(0.0, -998.0)),
            (Vec2::new(0.0, -999.0), Movement::Up, Vec2::new(0.0, 998.0)),
        ];
        for (start, moving, expected) in cases {
            let mut world = World::with_seed(settings(), 4);
            let id = place(&mut world, "a", start);
            world.apply_command(id, &cmd(moving, FireMode::None, Vec2::UP));
            assert_eq!(world.tank(id).unwrap().location, expected, "moving {moving:?}");
        }
    }

    #[test]
    fn main_gun_respects_cooldown() {
        let mut world = World::with_seed(settings(), 5);
        let id = place(&mut world, "a", Vec2::ZERO);
        let fire = cmd(Movement::None, FireMode::Main, Vec2::UP);

        world.apply_command(id, &fire);
        for _ in 0..9 {
            world.advance_frame();
        }
        world.apply_command(id, &fire);
        assert_eq!(world.projectiles().count(), 1);

        world.advance_frame();
        world.apply_command(id, &fire);
        assert_eq!(world.projectiles().count(), 2);

        let ids: Vec<_> = world.projectiles().map(|p| p.id).collect();
        assert!(ids[0] < ids[1]);
    }

    #[test]
    fn projectile_dies_on_wall_and_vanishes_next_frame() {
        let mut s = settings();
        s.walls = vec![Wall::new(WallId(0), Vec2::new(-100.0, -200.0), Vec2::new(100.0, -200.0))];
        let mut world = World::with_seed(s, 6);
        let id = place(&mut world, "a", Vec2::ZERO);

        let mut lines = tick(&mut world, &[(id, cmd(Movement::None, FireMode::Main, Vec2::UP))]);
        let mut saw_death = false;
        for _ in 0..20 {
            let dead_now = lines
                .iter()
                .any(|l| matches!(l, ServerLine::Projectile(p) if p.died));
            if saw_death {
                assert!(!lines.iter().any(|l| matches!(l, ServerLine::Projectile(_))));
                return;
            }
            saw_death = dead_now;
            lines = tick(&mut world, &[]);
        }
        panic!("projectile never hit the wall");
    }

    #[test]
    fn projectile_dies_at_arena_edge() {
        let mut world = World::with_seed(settings(), 8);
        let id = place(&mut world, "a", Vec2::new(0.0, -990.0));
        world.apply_command(id, &cmd(Movement::None, FireMode::Main, Vec2::UP));
        world.advance_projectiles();
        assert!(world.projectiles().all(|p| p.died));
    }

    #[test]
    fn projectiles_skip_their_owner() {
        let mut world = World::with_seed(settings(), 9);
        let id = place(&mut world, "a", Vec2::ZERO);
        world.apply_command(id, &cmd(Movement::None, FireMode::Main, Vec2::UP));
        world.advance_projectiles();
        assert!(world.projectiles().all(|p| !p.died));
        assert_eq!(world.tank(id).unwrap().hp, 3);
    }

    #[test]
    fn three_hits_kill_and_respawn_after_delay() {
        let mut world = World::with_seed(settings(), 10);
        let a = place(&mut world, "A", Vec2::ZERO);
        let b = place(&mut world, "B", Vec2::new(0.0, -200.0));
        let fire = cmd(Movement::None, FireMode::Main, Vec2::UP);

        let mut death_frame = None;
        for _ in 0..200 {
            let frame = world.frame();
            tick(&mut world, &[(a, fire)]);
            let hp = world.tank(b).unwrap().hp;
            assert!(hp <= 3);
            if hp == 0 {
                death_frame = Some(frame);
                break;
            }
        }
        let death_frame = death_frame.expect("B never died");
        assert_eq!(world.tank(a).unwrap().score, 1);
        assert_eq!(world.tank(b).unwrap().respawn_tick, Some(death_frame + 50));

        while world.frame() < death_frame + 50 {
            tick(&mut world, &[]);
            assert_eq!(world.tank(b).unwrap().hp, 0);
        }
        tick(&mut world, &[]);
        let b_tank = world.tank(b).unwrap();
        assert_eq!(b_tank.hp, 3);
        assert!(b_tank.is_alive());
        assert_eq!(world.tank(a).unwrap().score, 1);
    }

    #[test]
    fn dead_tank_is_reported_once_then_hidden() {
        let mut world = World::with_seed(settings(), 11);
        let a = place(&mut world, "A", Vec2::ZERO);
        world.tank_mut(a).unwrap().kill(0, 50);

        let first = tick(&mut world, &[]);
        assert!(first
            .iter()
            .any(|l| matches!(l, ServerLine::Tank(t) if t.id == a && t.died && t.hp == 0)));
        let second = tick(&mut world, &[]);
        assert!(!second.iter().any(|l| matches!(l, ServerLine::Tank(_))));
    }

    #[test]
    fn join_flag_only_on_first_frame() {
        let mut world = World::with_seed(settings(), 12);
        let a = place(&mut world, "A", Vec2::ZERO);
        let first = tick(&mut world, &[]);
        assert!(first.iter().any(|l| matches!(l, ServerLine::Tank(t) if t.id == a && t.joined)));
        let second = tick(&mut world, &[]);
        assert!(second.iter().any(|l| matches!(l, ServerLine::Tank(t) if t.id == a && !t.joined)));
    }

    #[test]
    fn beam_kills_tanks_on_the_ray_only() {
        let mut world = World::with_seed(settings(), 13);
        let a = place(&mut world, "A", Vec2::ZERO);
        let on_ray = place(&mut world, "B", Vec2::new(0.0, -100.0));
        let offset = place(&mut world, "C", Vec2::new(50.0, -100.0));
        world.tank_mut(a).unwrap().powerups = 1;

        world.apply_command(a, &cmd(Movement::None, FireMode::Alt, Vec2::UP));
        assert_eq!(world.tank(on_ray).unwrap().hp, 0);
        assert_eq!(world.tank(on_ray).unwrap().respawn_tick, Some(50));
        assert!(world.tank(offset).unwrap().is_alive());
        assert_eq!(world.tank(a).unwrap().score, 1);
        assert_eq!(world.tank(a).unwrap().powerups, 0);
        assert_eq!(world.beams().count(), 1);
        assert_eq!(world.beams().next().unwrap().id, a);
    }

    #[test]
    fn beam_needs_a_powerup_and_never_outlives_its_frame() {
        let mut world = World::with_seed(settings(), 14);
        let a = place(&mut world, "A", Vec2::ZERO);
        world.tank_mut(a).unwrap().powerups = 1;
        let alt = cmd(Movement::None, FireMode::Alt, Vec2::UP);

        let lines = tick(&mut world, &[(a, alt)]);
        assert_eq!(lines.iter().filter(|l| matches!(l, ServerLine::Beam(_))).count(), 1);
        assert_eq!(world.beams().count(), 0);

        let lines = tick(&mut world, &[(a, alt)]);
        assert!(!lines.iter().any(|l| matches!(l, ServerLine::Beam(_))));
    }

    #[test]
    fn powerups_are_capped_and_placed_clear_of_walls() {
        let mut s = settings();
        s.walls = vec![
            Wall::new(WallId(0), Vec2::new(-1000.0, 0.0), Vec2::new(1000.0, 0.0)),
            Wall::new(WallId(1), Vec2::new(0.0, -1000.0), Vec2::new(0.0, 1000.0)),
        ];
        let mut world = World::with_seed(s, 15);
        for _ in 0..10 {
            world.spawn_powerups();
            world.advance_frame();
        }
        assert_eq!(world.powerups().count(), 2);
        for p in world.powerups() {
            assert!(world.walls().iter().all(|w| !w.bounds(35.0).contains(p.location)));
            assert!(p.location.x.abs() <= 1000.0 && p.location.y.abs() <= 1000.0);
        }
    }

    #[test]
    fn tank_picks_up_powerup() {
        let mut world = World::with_seed(settings(), 16);
        world.spawn_powerups();
        let spot = world.powerups().next().unwrap().location;
        let a = place(&mut world, "A", spot + Vec2::new(20.0, -20.0));

        world.collect_powerups();
        assert_eq!(world.tank(a).unwrap().powerups, 1);
        assert!(world.powerups().all(|p| p.died));

        let lines = frame_lines(&mut world);
        assert!(lines.iter().any(|l| matches!(l, ServerLine::Powerup(p) if p.died)));
        world.sweep_dead();
        assert_eq!(world.powerups().count(), 0);
    }

    #[test]
    fn disconnected_tank_is_reported_once_then_removed() {
        let mut world = World::with_seed(settings(), 17);
        let a = place(&mut world, "A", Vec2::ZERO);
        world.disconnect(a);

        let lines = tick(&mut world, &[]);
        assert!(lines
            .iter()
            .any(|l| matches!(l, ServerLine::Tank(t) if t.id == a && t.disconnected && t.died)));
        assert!(world.tank(a).is_none());
        assert!(tick(&mut world, &[]).is_empty());
    }

    #[test]
    fn commands_for_missing_or_dead_tanks_are_ignored() {
        let mut world = World::with_seed(settings(), 18);
        world.apply_command(TankId(99), &cmd(Movement::Up, FireMode::Main, Vec2::UP));
        assert_eq!(world.projectiles().count(), 0);

        let a = place(&mut world, "A", Vec2::ZERO);
        world.tank_mut(a).unwrap().kill(0, 50);
        world.apply_command(a, &cmd(Movement::Up, FireMode::Main, Vec2::UP));
        assert_eq!(world.tank(a).unwrap().location, Vec2::ZERO);
        assert_eq!(world.projectiles().count(), 0);
    }
}
