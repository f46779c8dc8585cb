mod client;
mod play;
mod replay_view;
mod watch;

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};

use redbridge_core::agent::AgentKind;
use redbridge_core::rom;

#[derive(Parser)]
#[command(name = "redbridge", about = "Client for the Game Boy session service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a ROM file against the known Pokémon Red checksum
    ValidateRom {
        /// Path to the ROM file
        rom: PathBuf,
    },

    /// Create a session and drive it interactively from the terminal
    Play {
        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:8350")]
        server: String,

        /// Controller kind reported to the server
        #[arg(long, default_value = "human")]
        agent_kind: AgentKind,

        /// Frames an input is held per step
        #[arg(long)]
        wait_frames: Option<u32>,
    },

    /// Spectate a live session
    Watch {
        #[arg(long, default_value = "http://127.0.0.1:8350")]
        server: String,

        /// Session id to follow
        #[arg(long)]
        session: String,

        /// Write a PNG per step into this directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 250)]
        interval_ms: u64,
    },

    /// Print a recorded replay; optionally dump its frames
    Replay {
        /// Replay file on disk
        #[arg(long, conflicts_with_all = ["server", "session"])]
        file: Option<PathBuf>,

        #[arg(long, requires = "session")]
        server: Option<String>,

        /// Session id of the replay on the server
        #[arg(long, requires = "server")]
        session: Option<String>,

        /// Write embedded frames as PNGs into this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::ValidateRom { rom } => validate_rom(&rom),
        Command::Play {
            server,
            agent_kind,
            wait_frames,
        } => play::run(&server, agent_kind, wait_frames),
        Command::Watch {
            server,
            session,
            out,
            interval_ms,
        } => watch::run(&server, &session, out, interval_ms),
        Command::Replay {
            file,
            server,
            session,
            out,
        } => {
            let source = match (file, server, session) {
                (Some(path), _, _) => replay_view::Source::File(path),
                (None, Some(server), Some(session_id)) => replay_view::Source::Server {
                    server,
                    session_id,
                },
                _ => bail!("pass either --file or --server with --session"),
            };
            replay_view::run(source, out)
        }
    }
}

fn validate_rom(path: &PathBuf) -> anyhow::Result<()> {
    let sha = rom::compute_sha256(path)?;
    println!("sha256 {sha}");
    if sha == rom::POKEMON_RED_SHA256 {
        println!("OK: Pokémon Red");
        Ok(())
    } else {
        bail!("checksum does not match Pokémon Red");
    }
}
