//! # Arena Client
//!
//! Headless participant: connects over UDP, optionally asks for a room,
//! and runs the sync loop at a fixed rate, logging every state change.
//!
//! ## Usage
//!
//! ```bash
//! arena_client --address 127.0.0.1 --port 5000 --room 1 --tick-rate 60
//! LOG_FORMAT=json RUST_LOG=arena_net=debug arena_client --config arena.toml
//! ```

use std::process::ExitCode;
use std::time::{Duration, Instant};

use arena_net::{NoInput, SyncConfig, SyncCoordinator, SyncEvent, UdpTransport};
use tracing::{error, info, warn};

struct Args {
    config: Option<String>,
    address: Option<String>,
    port: Option<u16>,
    room: Option<u8>,
    ticks: Option<u64>,
    tick_rate: u32,
}

fn print_help() {
    println!("Usage: arena_client [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>        TOML configuration file");
    println!("  -a, --address <HOST>       Server address (overrides config)");
    println!("  -p, --port <PORT>          Server port (overrides config)");
    println!("  -r, --room <N>             Enter room N once the lobby is known");
    println!("  -n, --ticks <N>            Run N ticks then exit");
    println!("  -t, --tick-rate <HZ>       Tick rate in Hz (default: 60)");
    println!("  -h, --help                 Show this help");
}

// Simple parsing, no external deps
fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config: None,
        address: None,
        port: None,
        room: None,
        ticks: None,
        tick_rate: 60,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--config" | "-c" => parsed.config = value.cloned(),
            "--address" | "-a" => parsed.address = value.cloned(),
            "--port" | "-p" => parsed.port = value.and_then(|v| v.parse().ok()),
            "--room" | "-r" => parsed.room = value.and_then(|v| v.parse().ok()),
            "--ticks" | "-n" => parsed.ticks = value.and_then(|v| v.parse().ok()),
            "--tick-rate" | "-t" => {
                parsed.tick_rate = value.and_then(|v| v.parse().ok()).unwrap_or(60).max(1);
            }
            "--help" | "-h" => {
                print_help();
                return None;
            }
            other => {
                warn!(arg = other, "unknown argument ignored");
                i += 1;
                continue;
            }
        }
        i += 2;
    }
    Some(parsed)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

fn load_config(args: &Args) -> Result<SyncConfig, arena_net::ConfigError> {
    let mut config = match &args.config {
        Some(path) => SyncConfig::from_file(path)?,
        None => SyncConfig::default(),
    };
    if let Some(address) = &args.address {
        config.endpoint.address.clone_from(address);
    }
    if let Some(port) = args.port {
        config.endpoint.port = port;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    init_tracing();

    let Some(args) = parse_args() else {
        return ExitCode::SUCCESS;
    };

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "bad configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        address = %config.endpoint.address,
        port = config.endpoint.port,
        tick_rate = args.tick_rate,
        "starting arena client"
    );

    let mut sync = SyncCoordinator::new(config, UdpTransport::new());
    let start = Instant::now();
    if let Err(e) = sync.connect(0.0) {
        error!(error = %e, "connect failed");
        return ExitCode::FAILURE;
    }

    let tick_duration = Duration::from_secs_f64(1.0 / f64::from(args.tick_rate));
    let mut next_tick = Instant::now();
    let mut room_pending = args.room;
    let mut tick = 0u64;

    while args.ticks.map_or(true, |limit| tick < limit) {
        let now = start.elapsed().as_secs_f64();
        let report = sync.tick(now, &NoInput);

        for event in &report.events {
            match event {
                SyncEvent::PeerUnreachable { kind, sequence } => {
                    warn!(?kind, sequence, "server not answering");
                }
                SyncEvent::LobbyUpdated => {
                    if let Some(room) = room_pending.take() {
                        if let Err(e) = sync.request_room(room, now) {
                            warn!(room, error = %e, "room request rejected");
                        }
                    }
                }
                other => info!(event = ?other, "sync event"),
            }
        }

        tick += 1;
        next_tick += tick_duration;
        let now = Instant::now();
        if next_tick > now {
            std::thread::sleep(next_tick - now);
        } else {
            // Running behind; don't try to catch up
            next_tick = now;
        }
    }

    let stats = *sync.stats();
    let reliability = *sync.reliability().stats();
    info!(
        ticks = tick,
        received = stats.datagrams_received,
        malformed = stats.malformed,
        duplicates = stats.duplicates,
        acks_sent = stats.acks_sent,
        resends = reliability.resends,
        abandoned = reliability.abandoned,
        remotes = sync.remotes().count(),
        "client finished"
    );
    sync.disconnect();
    ExitCode::SUCCESS
}
