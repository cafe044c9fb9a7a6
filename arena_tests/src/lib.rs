//! Shared helpers for the arena integration tests.

use std::{net::SocketAddr, time::Duration};

use arena_client::GameClient;
use arena_server::server::bind_ephemeral;
use arena_shared::{config::GameSettings, protocol::ServerLine};

/// Installs a test-friendly subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Settings with a short tick so tests see frames quickly.
pub fn fast_settings() -> GameSettings {
    GameSettings {
        ms_per_frame: 5,
        ..GameSettings::default()
    }
}

/// Binds a server on an ephemeral port and runs it in the background.
pub async fn start_server(settings: GameSettings) -> anyhow::Result<SocketAddr> {
    let server = bind_ephemeral(settings).await?;
    let addr = server.local_addr()?;
    tracing::info!(%addr, "Test server started");
    tokio::spawn(async move { server.run().await });
    Ok(addr)
}

/// Reads lines until one matches `pred`, failing after `timeout`.
pub async fn wait_for(
    client: &mut GameClient,
    timeout: Duration,
    mut pred: impl FnMut(&ServerLine) -> bool,
) -> anyhow::Result<ServerLine> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(tokio::time::Instant::now());
        match client.recv_line_timeout(left).await? {
            Some(line) if pred(&line) => return Ok(line),
            Some(_) => {}
            None => anyhow::bail!("no matching line within {timeout:?}"),
        }
    }
}
