//! Server implementation.
//!
//! An authoritative arena server. It supports:
//! - One shared arena with configurable size, walls and pacing
//! - Name handshake and newline-delimited JSON commands over TCP
//! - A fixed-rate tick loop broadcasting every entity each frame
//! - Console commands (status, quit)
//!
//! Ownership:
//! - [`ArenaState`] holds the world, the session registry and the command
//!   slots behind their own locks.
//! - Session tasks only write command slots; the scheduler is the only
//!   writer of entity state after a tank has been spawned.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use arena_shared::{
    config::{GameSettings, ServerConfig},
    net::LineListener,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    commands::CommandSlots,
    scheduler::Scheduler,
    session::{run_session, SessionRegistry},
    world::World,
};

/// State shared by the accept loop, every session and the scheduler.
pub struct ArenaState {
    pub config: ServerConfig,
    pub world: Mutex<World>,
    pub sessions: SessionRegistry,
    pub commands: CommandSlots,
}

impl ArenaState {
    pub fn new(config: ServerConfig) -> Self {
        let world = World::new(config.settings.clone());
        Self::with_world(config, world)
    }

    pub fn with_world(config: ServerConfig, world: World) -> Self {
        Self {
            config,
            world: Mutex::new(world),
            sessions: SessionRegistry::new(),
            commands: CommandSlots::new(),
        }
    }
}

/// Result of an operator console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleOutcome {
    Output(Vec<String>),
    Quit,
}

/// Game server.
pub struct GameServer {
    arena: Arc<ArenaState>,
    listener: LineListener,
}

impl GameServer {
    /// Binds the listen socket from `cfg.server_addr`.
    pub async fn bind(cfg: ServerConfig) -> anyhow::Result<Self> {
        let addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;
        let listener = LineListener::bind(addr).await?;
        Ok(Self {
            arena: Arc::new(ArenaState::new(cfg)),
            listener,
        })
    }

    /// Returns the local address (after binding).
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn arena(&self) -> Arc<ArenaState> {
        self.arena.clone()
    }

    /// Starts the tick scheduler on its own task.
    pub fn spawn_scheduler(&self) -> JoinHandle<anyhow::Result<()>> {
        let scheduler = Scheduler::new(self.arena.clone());
        info!(
            tick_ms = scheduler.tick_duration().as_millis() as u64,
            "Tick scheduler running"
        );
        tokio::spawn(scheduler.run())
    }

    /// Accepts connections forever, one session task each.
    ///
    /// A failed accept is logged and the loop keeps going.
    pub async fn accept_loop(&self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!(%peer, "Client connected");
                    let arena = self.arena.clone();
                    tokio::spawn(async move {
                        if let Err(e) = run_session(arena, stream, peer).await {
                            debug!(%peer, error = %e, "Session ended with error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "Accept failed"),
            }
        }
    }

    /// Runs the scheduler and the accept loop until the process exits.
    pub async fn run(&self) -> anyhow::Result<()> {
        let scheduler = self.spawn_scheduler();
        let accept = self.accept_loop();
        tokio::select! {
            res = scheduler => res.context("scheduler task")?,
            res = accept => res,
        }
    }

    /// Executes a console command.
    pub fn exec_console(&self, line: &str) -> ConsoleOutcome {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(cmd) = tokens.first() else {
            return ConsoleOutcome::Output(Vec::new());
        };

        match *cmd {
            "status" => ConsoleOutcome::Output(self.status_lines()),
            "quit" | "exit" => {
                info!("Server shutting down");
                ConsoleOutcome::Quit
            }
            other => ConsoleOutcome::Output(vec![format!("Unknown command: {other}")]),
        }
    }

    fn status_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        let sessions = self.arena.sessions.roster();
        {
            let world = self.arena.world.lock();
            out.push(format!("Frame: {}", world.frame()));
            out.push(format!("Arena: {} units", world.arena_size()));
            out.push(format!("Sessions: {}", sessions.len()));
            for tank in world.tanks() {
                out.push(format!(
                    "  tank {} '{}' hp={} score={} at ({:.0}, {:.0})",
                    tank.id, tank.name, tank.hp, tank.score, tank.location.x, tank.location.y
                ));
            }
        }
        for s in sessions {
            out.push(format!("  session {} {} {:?}", s.tank, s.peer, s.state));
        }
        out
    }
}

/// Helper for tests: bind to an ephemeral loopback port.
pub async fn bind_ephemeral(settings: GameSettings) -> anyhow::Result<GameServer> {
    let cfg = ServerConfig {
        server_addr: format!("{}:{}", IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        settings,
        ..Default::default()
    };
    GameServer::bind(cfg).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ephemeral_bind_gets_a_port() {
        let server = bind_ephemeral(GameSettings::default()).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn console_reports_status_and_quit() {
        let server = bind_ephemeral(GameSettings::default()).await.unwrap();
        server.arena().world.lock().add_tank("Ace");

        let ConsoleOutcome::Output(lines) = server.exec_console("status") else {
            panic!("status should print");
        };
        assert!(lines[0].starts_with("Frame: 0"));
        assert!(lines.iter().any(|l| l.contains("'Ace' hp=3 score=0")));

        assert_eq!(server.exec_console("  quit "), ConsoleOutcome::Quit);
        assert_eq!(server.exec_console(""), ConsoleOutcome::Output(Vec::new()));
        assert!(matches!(
            server.exec_console("map dust"),
            ConsoleOutcome::Output(l) if l[0].contains("Unknown command")
        ));
    }
}
