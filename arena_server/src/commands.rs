//! Per-tank command slots.
//!
//! Session readers write here, the scheduler drains once per tick. Each tank
//! keeps only its most recent command, so a client that sends several lines
//! between two ticks has just the last one applied.

use std::collections::HashMap;

use arena_shared::{entity::TankId, protocol::ControlCommand};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct CommandSlots {
    slots: Mutex<HashMap<TankId, ControlCommand>>,
}

impl CommandSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `cmd` for `tank`, replacing any command not yet applied.
    pub fn submit(&self, tank: TankId, cmd: ControlCommand) {
        self.slots.lock().insert(tank, cmd);
    }

    /// Takes every pending command, sorted by tank id.
    pub fn drain(&self) -> Vec<(TankId, ControlCommand)> {
        let mut pending: Vec<_> = self.slots.lock().drain().collect();
        pending.sort_by_key(|(id, _)| *id);
        pending
    }

    pub fn pending(&self) -> usize {
        self.slots.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_shared::protocol::{FireMode, Movement};

    #[test]
    fn latest_command_wins() {
        let slots = CommandSlots::new();
        slots.submit(
            TankId(1),
            ControlCommand {
                moving: Movement::Up,
                ..ControlCommand::default()
            },
        );
        slots.submit(
            TankId(1),
            ControlCommand {
                fire: FireMode::Main,
                ..ControlCommand::default()
            },
        );

        let drained = slots.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].1.moving, Movement::None);
        assert_eq!(drained[0].1.fire, FireMode::Main);
        assert_eq!(slots.pending(), 0);
    }

    #[test]
    fn drain_is_ordered_by_tank() {
        let slots = CommandSlots::new();
        for id in [5, 2, 9] {
            slots.submit(TankId(id), ControlCommand::default());
        }
        let ids: Vec<_> = slots.drain().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![TankId(2), TankId(5), TankId(9)]);
    }
}
