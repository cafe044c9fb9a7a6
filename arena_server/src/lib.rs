//! `arena_server`
//!
//! Server-side systems:
//! - World simulation (movement, combat, power-ups, respawns)
//! - Per-connection sessions and the latest-wins command slots
//! - Fixed timestep tick scheduler
//! - Broadcasts one encoded frame per tick to every session
//!
//! Networking model:
//! - One TCP stream per client, newline-delimited UTF-8 both ways.

pub mod commands;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod tuning;
pub mod world;

pub use server::GameServer;
