//! Per-session driver threads.
//!
//! An emulator core is single-threaded state; each live session gets one
//! OS thread that owns its core, its game reader, and its replay recorder.
//! The async side talks to it over a crossbeam command channel and gets
//! answers back on oneshot channels. The latest frame and snapshot are
//! published on a watch channel that any number of spectators can follow
//! without touching the driver.

use std::path::PathBuf;
use std::thread;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;
use tokio::sync::{oneshot, watch};

use redbridge_core::actions::{self, Action};
use redbridge_core::agent::AgentKind;
use redbridge_core::core::EmulatorCore;
use redbridge_core::game::{GameReader, GameSnapshot};
use redbridge_core::replay::{ReplayRecorder, ReplayStore};
use redbridge_core::session::{self, SessionMeta};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("session driver is gone")]
    Disconnected,
    #[error("frame encode failed: {0}")]
    Frame(String),
    #[error("replay write failed: {0}")]
    Replay(String),
}

/// Latest published state of a session.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub step: u64,
    pub snapshot: GameSnapshot,
    pub frame_png: Vec<u8>,
}

impl SessionUpdate {
    pub fn frame_base64(&self) -> String {
        BASE64.encode(&self.frame_png)
    }
}

pub struct StepOutcome {
    pub step: u64,
    pub snapshot: GameSnapshot,
}

pub enum Command {
    Step {
        action: Action,
        wait_frames: u32,
        reply: oneshot::Sender<Result<StepOutcome, DriverError>>,
    },
    SwitchAgent {
        kind: AgentKind,
        reply: oneshot::Sender<()>,
    },
    Poke {
        addr: u16,
        value: u8,
        reply: oneshot::Sender<()>,
    },
    Close {
        reply: oneshot::Sender<Result<Option<PathBuf>, DriverError>>,
    },
}

/// Async-side handle to a driver thread.
#[derive(Clone)]
pub struct DriverHandle {
    cmd_tx: Sender<Command>,
    updates: watch::Receiver<SessionUpdate>,
}

impl DriverHandle {
    /// Spawn a driver thread owning `core`. The replay is written to
    /// `store` when the session closes, and also when the handle side of
    /// the command channel goes away.
    pub fn spawn(
        core: Box<dyn EmulatorCore>,
        meta: SessionMeta,
        store: ReplayStore,
        record_frames: bool,
    ) -> Result<Self, DriverError> {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();

        let initial = publish(&*core, 0).map_err(DriverError::Frame)?;
        let (update_tx, updates) = watch::channel(initial);

        let session_id = meta.session_id.clone();
        let recorder = ReplayRecorder::new(meta, record_frames);
        thread::Builder::new()
            .name(format!("session-{session_id}"))
            .spawn(move || run(core, recorder, store, update_tx, cmd_rx))
            .expect("spawn session driver thread");

        Ok(Self { cmd_tx, updates })
    }

    pub async fn step(
        &self,
        action: Action,
        wait_frames: u32,
    ) -> Result<StepOutcome, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Step {
            action,
            wait_frames,
            reply,
        })?;
        rx.await.map_err(|_| DriverError::Disconnected)?
    }

    pub async fn switch_agent(&self, kind: AgentKind) -> Result<(), DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SwitchAgent { kind, reply })?;
        rx.await.map_err(|_| DriverError::Disconnected)
    }

    pub async fn poke(&self, addr: u16, value: u8) -> Result<(), DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Poke { addr, value, reply })?;
        rx.await.map_err(|_| DriverError::Disconnected)
    }

    pub async fn close(&self) -> Result<Option<PathBuf>, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Close { reply })?;
        rx.await.map_err(|_| DriverError::Disconnected)?
    }

    /// Current published state.
    pub fn latest(&self) -> SessionUpdate {
        self.updates.borrow().clone()
    }

    /// A fresh receiver for following updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionUpdate> {
        self.updates.clone()
    }

    fn send(&self, cmd: Command) -> Result<(), DriverError> {
        self.cmd_tx.send(cmd).map_err(|_| DriverError::Disconnected)
    }
}

fn run(
    mut core: Box<dyn EmulatorCore>,
    recorder: ReplayRecorder,
    store: ReplayStore,
    update_tx: watch::Sender<SessionUpdate>,
    cmd_rx: Receiver<Command>,
) {
    let session_id = recorder.session().session_id.clone();
    let mut step: u64 = 0;
    let mut recorder = Some(recorder);

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            Command::Step {
                action,
                wait_frames,
                reply,
            } => {
                actions::apply(&mut *core, action, wait_frames);
                step += 1;
                tracing::debug!(%session_id, step, ?action, "stepped");
                let outcome = match publish(&*core, step) {
                    Ok(update) => {
                        if let Some(rec) = recorder.as_mut() {
                            if let Err(e) =
                                rec.push(step, action, update.snapshot.clone(), core.frame())
                            {
                                tracing::warn!(%session_id, "replay entry dropped: {e}");
                            }
                        }
                        let snapshot = update.snapshot.clone();
                        update_tx.send_replace(update);
                        Ok(StepOutcome { step, snapshot })
                    }
                    Err(e) => Err(DriverError::Frame(e)),
                };
                let _ = reply.send(outcome);
            }
            Command::SwitchAgent { kind, reply } => {
                if let Some(rec) = recorder.as_mut() {
                    rec.set_agent_kind(kind);
                }
                let _ = reply.send(());
            }
            Command::Poke { addr, value, reply } => {
                core.write_byte(addr, value);
                let _ = reply.send(());
            }
            Command::Close { reply } => {
                let result = finalize(recorder.take(), &store);
                let _ = reply.send(result);
                return;
            }
        }
    }

    // Command side vanished without a close. Flush the replay anyway so a
    // dropped server does not lose the session.
    if let Err(e) = finalize(recorder.take(), &store) {
        tracing::warn!(%session_id, "replay flush on disconnect failed: {e}");
    }
}

fn finalize(
    recorder: Option<ReplayRecorder>,
    store: &ReplayStore,
) -> Result<Option<PathBuf>, DriverError> {
    let Some(recorder) = recorder else {
        return Ok(None);
    };
    if recorder.is_empty() {
        // Nothing happened; an empty replay helps nobody.
        return Ok(None);
    }
    let replay = recorder.finish(session::unix_now());
    store
        .save(&replay)
        .map(Some)
        .map_err(|e| DriverError::Replay(e.to_string()))
}

fn publish(core: &dyn EmulatorCore, step: u64) -> Result<SessionUpdate, String> {
    let snapshot = GameReader::new(core).snapshot();
    let frame_png = core.frame().to_png().map_err(|e| e.to_string())?;
    Ok(SessionUpdate {
        step,
        snapshot,
        frame_png,
    })
}
