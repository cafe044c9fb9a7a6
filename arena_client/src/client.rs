//! Client implementation.
//!
//! The client maintains:
//! - One TCP stream for the name handshake, commands out and frames in
//! - An [`ArenaView`] updated from every received line
//!
//! Reads are cancel safe, so polling with a timeout never loses a partially
//! received line.

use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use arena_shared::{
    entity::TankId,
    net::{split_stream, Inbound, LineReader, LineWriter},
    protocol::{decode_server_line, parse_scalar_line, ControlCommand, ServerLine},
};
use tokio::net::{
    tcp::{OwnedReadHalf, OwnedWriteHalf},
    TcpStream,
};
use tracing::{debug, info};

use crate::{
    input::{build_command, InputState},
    view::ArenaView,
};

/// Longest server line the client accepts.
const MAX_SERVER_LINE: usize = 64 * 1024;

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Handshake finished; frames are flowing.
    Playing,
    /// The server closed the stream.
    Disconnected,
}

/// High-level game client.
pub struct GameClient {
    pub tank_id: TankId,
    pub arena_size: u32,
    pub state: ClientState,
    pub view: ArenaView,

    reader: LineReader<OwnedReadHalf>,
    writer: LineWriter<OwnedWriteHalf>,
    sent: u64,
}

impl GameClient {
    /// Connects to a server and performs the name handshake.
    pub async fn connect(server_addr: SocketAddr, name: &str) -> anyhow::Result<Self> {
        info!(server = %server_addr, name = %name, "Connecting to server");

        let stream = TcpStream::connect(server_addr)
            .await
            .context("tcp connect")?;
        stream.set_nodelay(true).context("tcp nodelay")?;
        let (mut reader, mut writer) = split_stream(stream, MAX_SERVER_LINE);

        writer.send_line(name).await?;
        writer.flush().await?;

        let tank_id = TankId(parse_scalar_line(&expect_line(&mut reader).await?)?);
        let arena_size = parse_scalar_line(&expect_line(&mut reader).await?)?;

        info!(tank_id = %tank_id, arena_size, "Joined arena");

        Ok(Self {
            tank_id,
            arena_size,
            state: ClientState::Playing,
            view: ArenaView::new(),
            reader,
            writer,
            sent: 0,
        })
    }

    /// Waits up to `timeout` for the next entity line and applies it to the view.
    ///
    /// Returns `Ok(None)` on timeout. Lines that do not decode are skipped.
    pub async fn recv_line_timeout(
        &mut self,
        timeout: Duration,
    ) -> anyhow::Result<Option<ServerLine>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let next = match tokio::time::timeout_at(deadline, self.reader.recv_line()).await {
                Ok(res) => res?,
                Err(_) => return Ok(None),
            };
            match next {
                Inbound::Line(raw) => match decode_server_line(&raw) {
                    Ok(line) => {
                        self.view.apply(&line);
                        return Ok(Some(line));
                    }
                    Err(e) => debug!(error = %e, "Undecodable server line skipped"),
                },
                Inbound::Discarded => debug!("Oversized server line skipped"),
                Inbound::Closed => {
                    self.state = ClientState::Disconnected;
                    anyhow::bail!("server closed the connection");
                }
            }
        }
    }

    /// Reads lines for `window` and returns how many were applied.
    pub async fn poll(&mut self, window: Duration) -> anyhow::Result<usize> {
        let deadline = tokio::time::Instant::now() + window;
        let mut applied = 0;
        loop {
            let left = deadline.saturating_duration_since(tokio::time::Instant::now());
            if left.is_zero() {
                return Ok(applied);
            }
            match self.recv_line_timeout(left).await? {
                Some(_) => applied += 1,
                None => return Ok(applied),
            }
        }
    }

    /// Sends one control command.
    pub async fn send_command(&mut self, cmd: &ControlCommand) -> anyhow::Result<()> {
        self.send_raw(&cmd.encode()?).await
    }

    /// Builds a command from `input` and sends it.
    pub async fn send_input(&mut self, input: InputState) -> anyhow::Result<ControlCommand> {
        let cmd = build_command(input);
        self.send_command(&cmd).await?;
        Ok(cmd)
    }

    /// Sends an arbitrary line, bypassing command encoding.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.send_line(line).await?;
        self.writer.flush().await?;
        self.sent += 1;
        Ok(())
    }

    /// Executes a console command.
    pub fn exec_console(&self, line: &str) -> Vec<String> {
        match line.trim() {
            "" => Vec::new(),
            "status" => {
                let mut out = vec![
                    format!("State: {:?}", self.state),
                    format!("Tank: {}", self.tank_id),
                    format!("Arena: {}", self.arena_size),
                    format!("Commands sent: {}", self.sent),
                ];
                if let Some(me) = self.view.tank(self.tank_id) {
                    out.push(format!(
                        "hp={} score={} at ({:.0}, {:.0})",
                        me.hp, me.score, me.location.x, me.location.y
                    ));
                }
                out.push(format!(
                    "Visible: {} tanks, {} projectiles, {} power-ups, {} walls",
                    self.view.tanks.len(),
                    self.view.projectiles.len(),
                    self.view.powerups.len(),
                    self.view.walls.len()
                ));
                out
            }
            other => vec![format!("Unknown command: {other}")],
        }
    }
}

async fn expect_line(reader: &mut LineReader<OwnedReadHalf>) -> anyhow::Result<String> {
    loop {
        match reader.recv_line().await? {
            Inbound::Line(line) => return Ok(line),
            Inbound::Discarded => continue,
            Inbound::Closed => anyhow::bail!("server closed during handshake"),
        }
    }
}
