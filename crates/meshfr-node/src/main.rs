//! meshfr node binary.
//!
//! # Usage
//!
//! ```bash
//! meshfr-node --role sensor --mac 02:00:00:00:00:01 --channel 6 \
//!     --state-path /var/lib/meshfr/node.cbor
//! ```
//!
//! This wires a [`meshfr_core::Core`] to a [`radio::LoopbackRadio`], a
//! [`system_env::SystemEnv`], a [`persistence::FilePersistence`], and a
//! [`adapter::LoggingAdapter`], then drives a short cooperative tick loop.
//! It owns no protocol logic of its own — everything it does is call into
//! `meshfr-core` with the collaborators it expects (spec.md §5, §6).

mod adapter;
mod persistence;
mod radio;
mod system_env;

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use meshfr_core::{Core, DeploymentSecrets, DeviceRole, Persistence, PersistedState, TracingEventSink};
use meshfr_crypto::DeploymentVerifier;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use adapter::LoggingAdapter;
use persistence::FilePersistence;
use radio::LoopbackRadio;
use system_env::SystemEnv;

/// Spawn a thread reading hex-encoded frames from stdin, one per line, so
/// this otherwise-isolated binary has a way to exercise `Core::on_frame`
/// without real radio hardware. Lines that don't decode are logged and
/// skipped rather than killing the reader.
fn spawn_stdin_frame_reader() -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        loop {
            line.clear();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => match hex::decode(line.trim()) {
                    Ok(bytes) if !bytes.is_empty() => {
                        if tx.send(bytes).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(%err, "stdin: not a valid hex frame, skipping"),
                },
                Err(err) => {
                    tracing::warn!(%err, "stdin: read error");
                    break;
                }
            }
        }
    });
    rx
}

/// Role this node runs as, mirroring [`DeviceRole`] for CLI parsing.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    /// The single coordinator node.
    Controller,
    /// The power-management node.
    PowerManager,
    /// A production relay node.
    Relay,
    /// A production sensor node.
    Sensor,
    /// An emulator hosting many virtual relay endpoints.
    RelayEmulator,
    /// An emulator hosting many virtual sensor endpoints.
    SensorEmulator,
}

impl From<RoleArg> for DeviceRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Controller => Self::Controller,
            RoleArg::PowerManager => Self::PowerManager,
            RoleArg::Relay => Self::Relay,
            RoleArg::Sensor => Self::Sensor,
            RoleArg::RelayEmulator => Self::RelayEmulator,
            RoleArg::SensorEmulator => Self::SensorEmulator,
        }
    }
}

fn parse_mac(s: &str) -> Result<[u8; 6], String> {
    let mut mac = [0u8; 6];
    let mut parts = s.split(':');
    for byte in &mut mac {
        let part = parts.next().ok_or("mac address needs 6 colon-separated octets")?;
        *byte = u8::from_str_radix(part, 16).map_err(|e| e.to_string())?;
    }
    if parts.next().is_some() {
        return Err("mac address has more than 6 octets".to_string());
    }
    Ok(mac)
}

fn parse_key(s: &str) -> Result<[u8; 16], String> {
    let bytes = hex::decode(s).map_err(|e| e.to_string())?;
    bytes.try_into().map_err(|_| "key must be exactly 32 hex characters (16 bytes)".to_string())
}


/// meshfr node runtime: wires a `Core` to its host collaborators
#[derive(Parser, Debug)]
#[command(name = "meshfr-node")]
#[command(about = "meshfr hardened v2H node runtime")]
#[command(version)]
struct Args {
    /// This node's role
    #[arg(long, value_enum)]
    role: RoleArg,

    /// This node's hardware address, as six colon-separated hex octets
    #[arg(long, value_parser = parse_mac)]
    mac: [u8; 6],

    /// Starting radio channel, used only if no state was loaded
    #[arg(long, default_value = "1")]
    channel: u8,

    /// Path to the durable state file
    #[arg(long, default_value = "meshfr-node.cbor")]
    state_path: PathBuf,

    /// Fleet-wide pre-shared key, as 32 hex characters
    #[arg(long, value_parser = parse_key, default_value = "00000000000000000000000000000000")]
    pre_shared_key: [u8; 16],

    /// Per-link key, as 32 hex characters
    #[arg(long, value_parser = parse_key, default_value = "00000000000000000000000000000000")]
    per_link_key: [u8; 16],

    /// Deployment salt, as 32 hex characters
    #[arg(long, value_parser = parse_key, default_value = "00000000000000000000000000000000")]
    salt: [u8; 16],

    /// Number of cooperative ticks to run before exiting
    #[arg(long, default_value = "20")]
    ticks: u32,

    /// Milliseconds to sleep between ticks
    #[arg(long, default_value = "50")]
    tick_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!(role = ?args.role, mac = ?args.mac, "meshfr node starting");

    let mut store = FilePersistence::new(args.state_path.clone());
    let state = match store.load() {
        Ok(Some(state)) => {
            tracing::info!("loaded persisted state from {:?}", args.state_path);
            state
        }
        Ok(None) => {
            tracing::info!("no persisted state found, starting unpaired");
            let mut fresh = PersistedState::unpaired(args.role.into());
            fresh.channel = args.channel;
            fresh
        }
        Err(err) => {
            tracing::warn!(?err, "failed to load persisted state, starting unpaired");
            let mut fresh = PersistedState::unpaired(args.role.into());
            fresh.channel = args.channel;
            fresh
        }
    };

    let secrets = DeploymentSecrets {
        pre_shared_key: args.pre_shared_key,
        per_link_key: args.per_link_key,
        salt: args.salt,
    };
    let mut core = Core::from_persisted(state, secrets, args.mac);
    let mut env = SystemEnv::new();
    let mut radio = LoopbackRadio;
    let mut adapter = LoggingAdapter;
    let mut events = TracingEventSink;
    let verifier = DeploymentVerifier::empty();
    let inbound = spawn_stdin_frame_reader();

    for tick in 0..args.ticks {
        for frame in inbound.try_iter() {
            match core.on_frame(&frame, &mut env, &verifier, &mut adapter, &mut events) {
                Ok(()) => {}
                Err(err) => tracing::warn!(?err, "dropped inbound frame"),
            }
        }
        core.tick(&mut env, &mut radio, &mut events);
        tracing::debug!(tick, paired = core.is_paired(), outbound_len = core.outbound_len(), "tick");
        std::thread::sleep(Duration::from_millis(args.tick_interval_ms));
    }

    if let Err(err) = store.save(&core.to_persisted()) {
        tracing::warn!(?err, "failed to persist state on exit");
    }
}
