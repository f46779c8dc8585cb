use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use redbridge_server::{ConfigFile, ServerConfig};

#[derive(Parser)]
#[command(name = "redbridge-server", about = "Game Boy session coordination service")]
struct Args {
    /// Address to listen on
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Path to the Pokémon Red ROM (checksum-verified at startup)
    #[arg(long)]
    rom: Option<PathBuf>,

    /// Optional TOML config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for recorded replays
    #[arg(long)]
    replay_dir: Option<PathBuf>,

    /// Maximum number of concurrent sessions
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Default frames an input is held per step
    #[arg(long)]
    wait_frames: Option<u32>,

    /// Skip embedding PNG frames in replays
    #[arg(long)]
    no_frames: bool,

    /// Mount the bus poke endpoint (harness setups only)
    #[arg(long)]
    debug_endpoints: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut cfg = ServerConfig::default();
    if let Some(path) = &args.config {
        ConfigFile::load(path)?.apply(&mut cfg);
    }
    if let Some(bind) = args.bind {
        cfg.bind_addr = bind;
    }
    if let Some(rom) = args.rom {
        cfg.rom_path = Some(rom);
    }
    if let Some(dir) = args.replay_dir {
        cfg.replay_dir = dir;
    }
    if let Some(max) = args.max_sessions {
        cfg.max_sessions = max;
    }
    if let Some(wait) = args.wait_frames {
        cfg.default_wait_frames = wait;
    }
    if args.no_frames {
        cfg.record_frames = false;
    }
    if args.debug_endpoints {
        cfg.debug_endpoints = true;
    }

    let handle = redbridge_server::start(cfg).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}
