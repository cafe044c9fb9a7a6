//! Fixed-rate tick scheduler.
//!
//! One task drives the whole simulation. A tick first takes the reaped
//! sessions and the queued commands, then simulates under the world lock,
//! then fans the encoded frame out under the session lock. No two of these
//! locks are ever held together.

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::server::ArenaState;

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Frame number the tick simulated.
    pub frame: u64,
    /// Sessions that accepted the frame.
    pub delivered: usize,
    /// Tanks disconnected at the start of the tick.
    pub disconnected: usize,
    pub frame_bytes: usize,
}

pub struct Scheduler {
    arena: Arc<ArenaState>,
    tick: Duration,
}

impl Scheduler {
    pub fn new(arena: Arc<ArenaState>) -> Self {
        let tick = arena.config.settings.tick_duration();
        Self { arena, tick }
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick
    }

    /// Runs one tick.
    pub fn step(&self) -> anyhow::Result<TickReport> {
        let drained = self.arena.sessions.take_drained();
        let commands: Vec<_> = self
            .arena
            .commands
            .drain()
            .into_iter()
            .filter(|(tank, _)| !drained.contains(tank))
            .collect();

        let (frame, encoded) = {
            let mut world = self.arena.world.lock();
            for tank in &drained {
                world.disconnect(*tank);
            }
            for (tank, cmd) in &commands {
                world.apply_command(*tank, cmd);
            }
            world.advance_projectiles();
            world.collect_powerups();
            world.spawn_powerups();
            world.respawn_due_tanks();
            let encoded = world.encode_frame();
            world.sweep_dead();

            let frame = world.frame();
            world.advance_frame();
            (frame, encoded)
        };

        let encoded = encoded?;
        let delivered = self.arena.sessions.broadcast(&encoded);
        trace!(frame, delivered, bytes = encoded.len(), "Tick");

        Ok(TickReport {
            frame,
            delivered,
            disconnected: drained.len(),
            frame_bytes: encoded.len(),
        })
    }

    /// Ticks forever. A tick starts no sooner than one tick duration after
    /// the previous one started; a slow tick delays the next instead of
    /// being skipped.
    pub async fn run(self) -> anyhow::Result<()> {
        debug!(tick_ms = self.tick.as_millis() as u64, "Scheduler started");
        loop {
            let started = Instant::now();
            if let Err(e) = self.step() {
                warn!(error = %e, "Tick failed");
            }
            let elapsed = started.elapsed();
            if elapsed > self.tick {
                debug!(elapsed_ms = elapsed.as_millis() as u64, "Tick overran");
            }
            tokio::time::sleep_until(started + self.tick).await;
        }
    }
}
