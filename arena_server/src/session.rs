//! Client sessions.
//!
//! A session is one TCP connection. It moves through
//! `Connecting -> AwaitingName -> Active -> Draining -> Closed`:
//! - the name line allocates a tank and queues the handshake;
//! - while active, every command line is decoded into the tank's command slot;
//! - a failed frame delivery or the end of the read loop marks it draining;
//! - the scheduler takes draining sessions at the next tick boundary and
//!   disconnects their tanks. Removing the registry entry fires the
//!   session's shutdown signal, which stops both the reader and the writer
//!   so the socket is released even if the peer never reads or closes.
//!
//! Sessions never touch the world directly except to spawn their tank.

use std::{collections::BTreeMap, net::SocketAddr, sync::Arc};

use anyhow::Context;
use arena_shared::{
    entity::TankId,
    net::{split_stream, Inbound, LineReader, LineWriter},
    protocol::{encode_handshake, ControlCommand},
};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::{mpsc, watch},
};
use tracing::{debug, info, warn};

use crate::server::ArenaState;

/// Longest display name kept, in characters.
pub const MAX_NAME_CHARS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingName,
    Active,
    Draining,
    Closed,
}

#[derive(Debug)]
struct SessionEntry {
    peer: SocketAddr,
    name: String,
    state: SessionState,
    frames: mpsc::Sender<Bytes>,
    /// Dropped with the entry; wakes every [`Shutdown`] of this session.
    _shutdown: watch::Sender<()>,
}

/// Resolves once the session has been removed from the registry.
#[derive(Debug, Clone)]
pub struct Shutdown(watch::Receiver<()>);

impl Shutdown {
    pub async fn wait(&mut self) {
        // No value is ever sent, so this only returns when the sender drops.
        while self.0.changed().await.is_ok() {}
    }
}

/// Summary of one registered session, for the operator console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub tank: TankId,
    pub peer: SocketAddr,
    pub name: String,
    pub state: SessionState,
}

/// All sessions that have completed the name handshake.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<BTreeMap<TankId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an active session whose frames go to `frames`.
    ///
    /// The returned [`Shutdown`] fires when the session is taken out by
    /// [`SessionRegistry::take_drained`].
    pub fn register(
        &self,
        tank: TankId,
        peer: SocketAddr,
        name: impl Into<String>,
        frames: mpsc::Sender<Bytes>,
    ) -> Shutdown {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        self.sessions.lock().insert(
            tank,
            SessionEntry {
                peer,
                name: name.into(),
                state: SessionState::Active,
                frames,
                _shutdown: shutdown_tx,
            },
        );
        Shutdown(shutdown_rx)
    }

    /// Flags a session for removal. Returns false if it was not active.
    pub fn mark_draining(&self, tank: TankId) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(&tank) {
            Some(entry) if entry.state == SessionState::Active => {
                entry.state = SessionState::Draining;
                true
            }
            _ => false,
        }
    }

    /// Queues `frame` on every active session and returns how many took it.
    ///
    /// A session whose queue is full or closed is never retried; it is moved
    /// to `Draining` instead.
    pub fn broadcast(&self, frame: &Bytes) -> usize {
        let mut delivered = 0;
        for (tank, entry) in self.sessions.lock().iter_mut() {
            if entry.state != SessionState::Active {
                continue;
            }
            match entry.frames.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    let reason = match e {
                        mpsc::error::TrySendError::Full(_) => "backlog full",
                        mpsc::error::TrySendError::Closed(_) => "writer closed",
                    };
                    info!(tank_id = %tank, peer = %entry.peer, reason, "Session draining");
                    entry.state = SessionState::Draining;
                }
            }
        }
        delivered
    }

    /// Removes every draining session and returns their tanks.
    ///
    /// Dropping an entry closes its frame queue and fires its shutdown.
    pub fn take_drained(&self) -> Vec<TankId> {
        let mut sessions = self.sessions.lock();
        let drained: Vec<TankId> = sessions
            .iter()
            .filter(|(_, e)| e.state == SessionState::Draining)
            .map(|(id, _)| *id)
            .collect();

        for tank in &drained {
            if let Some(mut entry) = sessions.remove(tank) {
                entry.state = SessionState::Closed;
                info!(tank_id = %tank, peer = %entry.peer, name = %entry.name, state = ?entry.state, "Session removed");
            }
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn roster(&self) -> Vec<SessionInfo> {
        self.sessions
            .lock()
            .iter()
            .map(|(tank, e)| SessionInfo {
                tank: *tank,
                peer: e.peer,
                name: e.name.clone(),
                state: e.state,
            })
            .collect()
    }
}

/// Cuts a raw name line down to what the arena shows.
pub fn display_name(raw: &str) -> String {
    raw.trim_end_matches(&['\r', '\n'][..])
        .chars()
        .take(MAX_NAME_CHARS)
        .collect()
}

/// Drives one accepted connection until its read side ends.
pub async fn run_session(
    arena: Arc<ArenaState>,
    stream: TcpStream,
    peer: SocketAddr,
) -> anyhow::Result<()> {
    let mut state = SessionState::Connecting;
    debug!(%peer, ?state, "Session opened");

    let (mut reader, writer) = split_stream(stream, arena.config.max_line_len);

    state = SessionState::AwaitingName;
    debug!(%peer, ?state, "Waiting for name");
    let Some(name) = read_name(&mut reader).await? else {
        info!(%peer, "Connection closed before handshake");
        return Ok(());
    };

    let (tank, handshake) = {
        let mut world = arena.world.lock();
        let tank = world.add_tank(&name);
        let handshake = encode_handshake(tank, world.arena_size(), &world.walls())
            .context("encode handshake")?;
        (tank, handshake)
    };

    let (frames_tx, frames_rx) = mpsc::channel(arena.config.frame_backlog.max(1));
    frames_tx
        .try_send(handshake)
        .context("queue handshake")?;
    let shutdown = arena.sessions.register(tank, peer, name.clone(), frames_tx);
    tokio::spawn(write_frames(writer, frames_rx, shutdown.clone(), tank));

    state = SessionState::Active;
    info!(tank_id = %tank, %peer, name = %name, ?state, "Player joined");

    read_commands(&arena, &mut reader, shutdown, tank).await;

    if arena.sessions.mark_draining(tank) {
        info!(tank_id = %tank, %peer, "Session draining");
    }
    Ok(())
}

async fn read_name<R: AsyncRead + Unpin>(
    reader: &mut LineReader<R>,
) -> anyhow::Result<Option<String>> {
    loop {
        match reader.recv_line().await? {
            Inbound::Line(raw) => return Ok(Some(display_name(&raw))),
            Inbound::Discarded => debug!("Unreadable name line dropped"),
            Inbound::Closed => return Ok(None),
        }
    }
}

async fn read_commands<R: AsyncRead + Unpin>(
    arena: &ArenaState,
    reader: &mut LineReader<R>,
    mut shutdown: Shutdown,
    tank: TankId,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.wait() => {
                debug!(tank_id = %tank, "Reader stopped by shutdown");
                return;
            }
            next = reader.recv_line() => next,
        };
        match next {
            Ok(Inbound::Line(line)) => match ControlCommand::decode(&line) {
                Ok(cmd) => arena.commands.submit(tank, cmd),
                Err(e) => debug!(tank_id = %tank, error = %e, "Malformed command dropped"),
            },
            Ok(Inbound::Discarded) => debug!(tank_id = %tank, "Oversized command dropped"),
            Ok(Inbound::Closed) => return,
            Err(e) => {
                debug!(tank_id = %tank, error = %e, "Session read failed");
                return;
            }
        }
    }
}

/// Writes queued frames until the queue closes, the socket fails or the
/// session shuts down. A write blocked on a peer that stopped reading is
/// abandoned on shutdown.
async fn write_frames<W: AsyncWrite + Unpin>(
    mut writer: LineWriter<W>,
    mut frames: mpsc::Receiver<Bytes>,
    mut shutdown: Shutdown,
    tank: TankId,
) {
    let pump = async {
        while let Some(frame) = frames.recv().await {
            if let Err(e) = writer.send_frame(&frame).await {
                warn!(tank_id = %tank, error = %e, "Frame write failed");
                return;
            }
        }
        let _ = writer.flush().await;
    };
    tokio::select! {
        biased;
        _ = shutdown.wait() => debug!(tank_id = %tank, "Writer stopped by shutdown"),
        _ = pump => debug!(tank_id = %tank, "Writer finished"),
    }
}
