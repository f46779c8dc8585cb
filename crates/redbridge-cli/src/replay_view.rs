//! Inspect recorded replays, from a server or straight off disk.

use std::path::{Path, PathBuf};

use anyhow::Context;

use redbridge_core::replay::{self, Replay};

use crate::client::ApiClient;

pub enum Source {
    File(PathBuf),
    Server { server: String, session_id: String },
}

pub fn run(source: Source, out_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let replay = match source {
        Source::File(path) => load_file(&path)?,
        Source::Server { server, session_id } => {
            ApiClient::new(&server).replay(&session_id)?
        }
    };

    let meta = &replay.session;
    println!(
        "replay {} \u{2022} agent {} \u{2022} {} steps",
        meta.session_id,
        meta.agent_kind,
        replay.entries.len()
    );
    if let Some(ended) = meta.ended_at {
        println!("recorded {} .. {} (unix)", meta.started_at, ended);
    }

    for entry in &replay.entries {
        let snap = &entry.snapshot;
        println!(
            "step {:>5}  {:<12}  map {:>3} pos ({:>3},{:>3})  ${}",
            entry.step,
            entry.action.label(),
            snap.map_id,
            snap.x,
            snap.y,
            snap.money
        );
    }

    if let Some(dir) = out_dir {
        dump_frames(&replay, &dir)?;
    }
    Ok(())
}

fn load_file(path: &Path) -> anyhow::Result<Replay> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let replay: Replay = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(replay)
}

pub(crate) fn dump_frames(replay: &Replay, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut written = 0usize;
    for entry in &replay.entries {
        if let Some(png) = replay::decode_frame(entry) {
            let path = dir.join(format!(
                "{}-{:06}.png",
                replay.session.session_id, entry.step
            ));
            std::fs::write(path, png)?;
            written += 1;
        }
    }
    if written == 0 {
        println!("no frames embedded in this replay");
    } else {
        println!("wrote {written} frames to {}", dir.display());
    }
    Ok(())
}
