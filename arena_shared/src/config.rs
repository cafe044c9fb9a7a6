//! Configuration system.
//!
//! The server core consumes these as plain structs. Reading the settings file
//! is left to the binary; `from_json_str` is the only parsing offered here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entity::Wall;

/// Gameplay settings for the single arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Side length of the square arena; coordinates span `[-size/2, size/2]`.
    pub universe_size: u32,
    /// Minimum wall-clock duration of one tick.
    pub ms_per_frame: u64,
    /// Ticks a tank must wait between two main-gun shots.
    pub frames_per_shot: u64,
    /// Ticks a dead tank waits before respawning.
    pub respawn_rate: u64,
    /// Upper bound of the random gap between power-up spawns, in ticks.
    pub max_powerup_delay: u64,
    pub walls: Vec<Wall>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            universe_size: 2000,
            ms_per_frame: 17,
            frames_per_shot: 80,
            respawn_rate: 300,
            max_powerup_delay: 1650,
            walls: Vec::new(),
        }
    }
}

impl GameSettings {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.ms_per_frame)
    }

    pub fn half_size(&self) -> f64 {
        f64::from(self.universe_size) / 2.0
    }
}

/// Root server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. `0.0.0.0:11000`.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Frames queued per session before it is considered unable to keep up.
    #[serde(default = "default_frame_backlog")]
    pub frame_backlog: usize,
    /// Longest accepted inbound line, in bytes.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
    #[serde(default)]
    pub settings: GameSettings,
}

fn default_server_addr() -> String {
    "0.0.0.0:11000".to_string()
}

fn default_frame_backlog() -> usize {
    64
}

fn default_max_line_len() -> usize {
    4096
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            frame_backlog: default_frame_backlog(),
            max_line_len: default_max_line_len(),
            settings: GameSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
