//! Spectate a live session by polling state and frames.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::ApiClient;

pub fn run(
    server: &str,
    session_id: &str,
    out_dir: Option<PathBuf>,
    interval_ms: u64,
) -> anyhow::Result<()> {
    let client = ApiClient::new(server);
    if let Some(dir) = &out_dir {
        std::fs::create_dir_all(dir)?;
    }

    let interval = Duration::from_millis(interval_ms.max(10));
    let mut last_step: Option<u64> = None;

    println!("watching session {session_id} (ctrl-c to stop)");
    loop {
        let detail = match client.detail(session_id) {
            Ok(detail) => detail,
            Err(e) => {
                // Sessions vanish when their controller closes them.
                println!("session unavailable: {e:#}");
                return Ok(());
            }
        };

        if last_step != Some(detail.step) {
            last_step = Some(detail.step);
            let snap = &detail.snapshot;
            println!(
                "step {:>5}  map {:>3} pos ({:>3},{:>3})  ${:<6} party {}",
                detail.step,
                snap.map_id,
                snap.x,
                snap.y,
                snap.money,
                snap.party.len()
            );

            if let Some(dir) = &out_dir {
                if let Err(e) = save_frame(&client, session_id, dir, detail.step) {
                    log::warn!("frame not saved: {e:#}");
                }
            }
        }

        std::thread::sleep(interval);
    }
}

fn save_frame(
    client: &ApiClient,
    session_id: &str,
    dir: &Path,
    step: u64,
) -> anyhow::Result<()> {
    let png = client.frame(session_id)?;
    let path = dir.join(format!("{session_id}-{step:06}.png"));
    std::fs::write(&path, png)?;
    log::debug!("wrote {}", path.display());
    Ok(())
}
