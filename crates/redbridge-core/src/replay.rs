//! Replay files and the on-disk store.
//!
//! A replay is the observable timeline of a session: the action taken at
//! each step and the game snapshot after it, with optional PNG frames for
//! spectator playback. Raw core state is deliberately not recorded; it is
//! backend-specific and replays outlive backends.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::Action;
use crate::core::{CoreError, FrameBuffer};
use crate::game::GameSnapshot;
use crate::session::SessionMeta;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("no replay for session {id:?}")]
    NotFound { id: String },
    #[error("unsupported replay version {found} (expected {FORMAT_VERSION})")]
    Version { found: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Frame(#[from] CoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub step: u64,
    pub action: Action,
    pub snapshot: GameSnapshot,
    /// Base64 PNG of the frame after the action, when frames are recorded.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub frame_png: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    pub version: u32,
    pub session: SessionMeta,
    pub entries: Vec<ReplayEntry>,
}

/// Accumulates entries while a session runs.
pub struct ReplayRecorder {
    session: SessionMeta,
    entries: Vec<ReplayEntry>,
    record_frames: bool,
}

impl ReplayRecorder {
    pub fn new(session: SessionMeta, record_frames: bool) -> Self {
        Self {
            session,
            entries: Vec::new(),
            record_frames,
        }
    }

    pub fn push(
        &mut self,
        step: u64,
        action: Action,
        snapshot: GameSnapshot,
        frame: &FrameBuffer,
    ) -> Result<(), ReplayError> {
        let frame_png = if self.record_frames {
            Some(BASE64.encode(frame.to_png()?))
        } else {
            None
        };
        self.entries.push(ReplayEntry {
            step,
            action,
            snapshot,
            frame_png,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn session(&self) -> &SessionMeta {
        &self.session
    }

    /// Record a controller change so the replay names the final driver.
    pub fn set_agent_kind(&mut self, kind: crate::agent::AgentKind) {
        self.session.agent_kind = kind;
    }

    pub fn finish(mut self, ended_at: u64) -> Replay {
        self.session.ended_at = Some(ended_at);
        self.session.replay_available = true;
        Replay {
            version: FORMAT_VERSION,
            session: self.session,
            entries: self.entries,
        }
    }
}

/// Decode an entry's frame back into PNG bytes.
pub fn decode_frame(entry: &ReplayEntry) -> Option<Vec<u8>> {
    entry
        .frame_png
        .as_deref()
        .and_then(|b64| BASE64.decode(b64).ok())
}

/// Directory of replay files, one `<session_id>.replay.json` per session.
pub struct ReplayStore {
    root: PathBuf,
}

const SUFFIX: &str = ".replay.json";

impl ReplayStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save(&self, replay: &Replay) -> Result<PathBuf, ReplayError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(&replay.session.session_id);
        fs::write(&path, serde_json::to_vec_pretty(replay)?)?;
        log::debug!(
            "wrote replay {} ({} entries)",
            path.display(),
            replay.entries.len()
        );
        Ok(path)
    }

    pub fn load(&self, session_id: &str) -> Result<Replay, ReplayError> {
        let path = self.path_for(session_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReplayError::NotFound {
                    id: session_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let replay: Replay = serde_json::from_slice(&bytes)?;
        if replay.version != FORMAT_VERSION {
            return Err(ReplayError::Version {
                found: replay.version,
            });
        }
        Ok(replay)
    }

    /// Session ids with a stored replay, sorted.
    pub fn list(&self) -> Result<Vec<String>, ReplayError> {
        let mut ids = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_suffix(SUFFIX) {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.root.join(format!("{session_id}{SUFFIX}"))
    }
}
