//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p arena_server -- [--addr 0.0.0.0:11000] [--settings settings.json] [--tick-ms 17]
//!
//! The settings file holds a JSON `ServerConfig`; missing fields keep their
//! defaults, and a file that cannot be read or parsed falls back to them.
//!
//! Console commands:
//!   status         - Show frame, sessions and tanks
//!   quit           - Shutdown server

use std::env;
use std::io::{BufRead, Write};

use anyhow::Context;
use arena_server::server::{ConsoleOutcome, GameServer};
use arena_shared::config::ServerConfig;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct Args {
    addr: Option<String>,
    settings: Option<String>,
    tick_ms: Option<u64>,
}

fn parse_args() -> Args {
    let mut out = Args::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                out.addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--settings" if i + 1 < args.len() => {
                out.settings = Some(args[i + 1].clone());
                i += 2;
            }
            "--tick-ms" if i + 1 < args.len() => {
                out.tick_ms = args[i + 1].parse().ok();
                i += 2;
            }
            _ => i += 1,
        }
    }
    out
}

fn load_config(args: &Args) -> ServerConfig {
    let mut cfg = match &args.settings {
        Some(path) => match std::fs::read_to_string(path)
            .with_context(|| format!("read {path}"))
            .and_then(|s| ServerConfig::from_json_str(&s).context("parse settings"))
        {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path, error = %e, "Using default settings");
                ServerConfig::default()
            }
        },
        None => ServerConfig::default(),
    };
    if let Some(addr) = &args.addr {
        cfg.server_addr = addr.clone();
    }
    if let Some(ms) = args.tick_ms {
        cfg.settings.ms_per_frame = ms;
    }
    cfg
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = load_config(&parse_args());
    info!(
        addr = %cfg.server_addr,
        size = cfg.settings.universe_size,
        ms_per_frame = cfg.settings.ms_per_frame,
        walls = cfg.settings.walls.len(),
        "Starting server"
    );

    let server = GameServer::bind(cfg).await.context("create server")?;
    let local = server.local_addr()?;
    info!(%local, "Server listening");

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Server ready. Type 'status' for info, 'quit' to exit.");
    println!();

    let console = async {
        while let Some(line) = console_rx.recv().await {
            match server.exec_console(&line) {
                ConsoleOutcome::Output(lines) => {
                    for l in lines {
                        println!("{l}");
                    }
                }
                ConsoleOutcome::Quit => return,
            }
        }
        // Stdin closed; keep serving without a console.
        std::future::pending::<()>().await
    };

    tokio::select! {
        res = server.run() => res,
        _ = console => Ok(()),
    }
}
