//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p arena_client -- [--addr 127.0.0.1:11000] [--name Bot] [--rate-ms 50]
//!
//! Joins the arena and drives a tank with random input, which is enough to
//! exercise a server without a graphical client.
//!
//! Console commands:
//!   status              - Show client status
//!   quit                - Exit client

use std::env;
use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use arena_client::{client::GameClient, input::InputState};
use arena_shared::math::Vec2;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::info;

struct Args {
    addr: String,
    name: String,
    rate_ms: u64,
}

fn parse_args() -> Args {
    let mut out = Args {
        addr: "127.0.0.1:11000".to_string(),
        name: "Bot".to_string(),
        rate_ms: 50,
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                out.addr = args[i + 1].clone();
                i += 2;
            }
            "--name" if i + 1 < args.len() => {
                out.name = args[i + 1].clone();
                i += 2;
            }
            "--rate-ms" if i + 1 < args.len() => {
                out.rate_ms = args[i + 1].parse().unwrap_or(50);
                i += 2;
            }
            _ => i += 1,
        }
    }
    out
}

fn random_input(rng: &mut impl Rng) -> InputState {
    let dir = rng.gen_range(0..5);
    InputState {
        up: dir == 1,
        down: dir == 2,
        left: dir == 3,
        right: dir == 4,
        fire_main: rng.gen_bool(0.3),
        fire_alt: rng.gen_bool(0.02),
        aim: Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args();
    let addr: SocketAddr = args.addr.parse().context("parse --addr")?;
    info!(server = %addr, name = %args.name, "Starting client");

    let mut client = GameClient::connect(addr, &args.name)
        .await
        .context("connect")?;

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

    println!("Client connected. Type 'status' for info, 'quit' to exit.");
    println!();

    let mut rng = rand::thread_rng();
    let rate = Duration::from_millis(args.rate_ms.max(1));

    loop {
        // Process console commands.
        while let Ok(line) = console_rx.try_recv() {
            if line == "quit" || line == "exit" {
                return Ok(());
            }
            for out in client.exec_console(&line) {
                println!("{out}");
            }
        }

        client.send_input(random_input(&mut rng)).await?;
        if let Err(e) = client.poll(rate).await {
            println!("Disconnected from server: {e}");
            break;
        }
    }

    Ok(())
}
