//! The session table: ids, control tokens, and driver handles.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::RwLock;

use redbridge_core::actions::Action;
use redbridge_core::agent::AgentKind;
use redbridge_core::core::{EmulatorCore, FlatCore};
use redbridge_core::replay::ReplayStore;
use redbridge_core::rom::RomImage;
use redbridge_core::session::SessionMeta;

use crate::config::ServerConfig;
use crate::driver::{DriverError, DriverHandle, SessionUpdate, StepOutcome};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no session with id {id:?}")]
    NotFound { id: String },
    #[error("control token rejected")]
    BadToken,
    #[error("session limit reached ({limit})")]
    Full { limit: usize },
    #[error(transparent)]
    Driver(#[from] DriverError),
}

struct Slot {
    meta: SessionMeta,
    control_token: String,
    wait_frames: u32,
    driver: DriverHandle,
}

/// Live sessions, keyed by id. One controller per session, any number of
/// spectators.
pub struct Registry {
    cfg: Arc<ServerConfig>,
    rom: Option<Arc<RomImage>>,
    sessions: RwLock<HashMap<String, Slot>>,
    next_id: AtomicU64,
}

pub struct CreatedSession {
    pub meta: SessionMeta,
    pub control_token: String,
}

impl Registry {
    pub fn new(cfg: Arc<ServerConfig>, rom: Option<Arc<RomImage>>) -> Self {
        Self {
            cfg,
            rom,
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn create_session(
        &self,
        agent_kind: AgentKind,
        wait_frames: Option<u32>,
    ) -> Result<CreatedSession, RegistryError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.cfg.max_sessions {
            return Err(RegistryError::Full {
                limit: self.cfg.max_sessions,
            });
        }

        let id = self.fresh_id();
        let meta = SessionMeta::new(id.clone(), agent_kind);
        let driver = DriverHandle::spawn(
            self.build_core(),
            meta.clone(),
            ReplayStore::new(&self.cfg.replay_dir),
            self.cfg.record_frames,
        )?;

        let control_token = fresh_token();
        let wait_frames = wait_frames.unwrap_or(self.cfg.default_wait_frames).max(1);
        sessions.insert(
            id.clone(),
            Slot {
                meta: meta.clone(),
                control_token: control_token.clone(),
                wait_frames,
                driver,
            },
        );
        tracing::info!(session_id = %id, agent = %agent_kind, "session created");
        Ok(CreatedSession {
            meta,
            control_token,
        })
    }

    pub async fn list(&self) -> Vec<SessionMeta> {
        let sessions = self.sessions.read().await;
        let mut metas: Vec<SessionMeta> = sessions.values().map(|s| s.meta.clone()).collect();
        metas.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        metas
    }

    pub async fn meta(&self, id: &str) -> Result<SessionMeta, RegistryError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|s| s.meta.clone())
            .ok_or_else(|| not_found(id))
    }

    pub async fn latest(&self, id: &str) -> Result<SessionUpdate, RegistryError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|s| s.driver.latest())
            .ok_or_else(|| not_found(id))
    }

    pub async fn subscribe(
        &self,
        id: &str,
    ) -> Result<tokio::sync::watch::Receiver<SessionUpdate>, RegistryError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|s| s.driver.subscribe())
            .ok_or_else(|| not_found(id))
    }

    pub async fn step(
        &self,
        id: &str,
        token: &str,
        action: Action,
        wait_frames: Option<u32>,
    ) -> Result<StepOutcome, RegistryError> {
        let (driver, wait) = {
            let sessions = self.sessions.read().await;
            let slot = sessions.get(id).ok_or_else(|| not_found(id))?;
            check_token(slot, token)?;
            (slot.driver.clone(), wait_frames.unwrap_or(slot.wait_frames))
        };
        Ok(driver.step(action, wait.max(1)).await?)
    }

    /// Hand the session to a new controller. The old token stops working
    /// immediately; the new one is returned to the caller.
    pub async fn switch_agent(
        &self,
        id: &str,
        token: &str,
        agent_kind: AgentKind,
    ) -> Result<String, RegistryError> {
        let (driver, new_token) = {
            let mut sessions = self.sessions.write().await;
            let slot = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
            check_token(slot, token)?;
            let new_token = fresh_token();
            slot.control_token = new_token.clone();
            slot.meta.agent_kind = agent_kind;
            (slot.driver.clone(), new_token)
        };
        driver.switch_agent(agent_kind).await?;
        tracing::info!(session_id = %id, agent = %agent_kind, "controller switched");
        Ok(new_token)
    }

    pub async fn poke(
        &self,
        id: &str,
        addr: u16,
        value: u8,
    ) -> Result<(), RegistryError> {
        let driver = {
            let sessions = self.sessions.read().await;
            sessions
                .get(id)
                .map(|s| s.driver.clone())
                .ok_or_else(|| not_found(id))?
        };
        Ok(driver.poke(addr, value).await?)
    }

    pub async fn close(
        &self,
        id: &str,
        token: &str,
    ) -> Result<Option<PathBuf>, RegistryError> {
        let slot = {
            let mut sessions = self.sessions.write().await;
            let slot = sessions.get(id).ok_or_else(|| not_found(id))?;
            check_token(slot, token)?;
            sessions.remove(id).expect("slot present under write lock")
        };
        let path = slot.driver.close().await?;
        tracing::info!(session_id = %id, "session closed");
        Ok(path)
    }

    /// Close every live session, flushing replays. Used at shutdown.
    pub async fn close_all(&self) {
        let slots: Vec<(String, Slot)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };
        for (id, slot) in slots {
            if let Err(e) = slot.driver.close().await {
                tracing::warn!(session_id = %id, "close at shutdown failed: {e}");
            }
        }
    }

    fn build_core(&self) -> Box<dyn EmulatorCore> {
        match &self.rom {
            Some(rom) => Box::new(FlatCore::with_rom(rom.bytes())),
            None => Box::new(FlatCore::new()),
        }
    }

    fn fresh_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let suffix: u16 = rand::random();
        format!("sess-{n:04}-{suffix:04x}")
    }
}

fn not_found(id: &str) -> RegistryError {
    RegistryError::NotFound { id: id.to_string() }
}

fn check_token(slot: &Slot, token: &str) -> Result<(), RegistryError> {
    if slot.control_token != token {
        return Err(RegistryError::BadToken);
    }
    Ok(())
}

fn fresh_token() -> String {
    let bytes: [u8; 16] = rand::random();
    let mut out = String::with_capacity(32);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
