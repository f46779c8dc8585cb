use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::Action;
use crate::agent::{Agent, AgentKind};
use crate::obs::Observation;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session with id {id:?}")]
    NotFound { id: String },
    #[error("session {id:?} already exists")]
    AlreadyExists { id: String },
}

/// Session metadata, as reported to clients and stored with replays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub session_id: String,
    pub agent_kind: AgentKind,
    /// Unix seconds.
    pub started_at: u64,
    pub ended_at: Option<u64>,
    pub replay_available: bool,
}

impl SessionMeta {
    pub fn new(session_id: impl Into<String>, agent_kind: AgentKind) -> Self {
        Self {
            session_id: session_id.into(),
            agent_kind,
            started_at: unix_now(),
            ended_at: None,
            replay_available: false,
        }
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One recorded agent decision.
pub struct HistoryEntry {
    pub observation: Observation,
    pub action: Action,
}

struct Session {
    agent: Box<dyn Agent>,
    history: Vec<HistoryEntry>,
    meta: SessionMeta,
}

/// Orchestrates agent play: sessions by id, agent switching, history.
#[derive(Default)]
pub struct SessionManager {
    sessions: HashMap<String, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(
        &mut self,
        id: impl Into<String>,
        agent: Box<dyn Agent>,
    ) -> Result<(), SessionError> {
        let id = id.into();
        if self.sessions.contains_key(&id) {
            return Err(SessionError::AlreadyExists { id });
        }
        let meta = SessionMeta::new(id.clone(), agent.kind());
        self.sessions.insert(
            id,
            Session {
                agent,
                history: Vec::new(),
                meta,
            },
        );
        Ok(())
    }

    /// Ask the session's agent for an action and record the decision.
    pub fn step(
        &mut self,
        id: &str,
        observation: Observation,
    ) -> Result<Action, SessionError> {
        let session = self.get_mut(id)?;
        let action = session.agent.choose_action(&observation);
        session.history.push(HistoryEntry {
            observation,
            action,
        });
        Ok(action)
    }

    /// Hand control of a live session to a different agent. History is
    /// kept; the metadata reflects the new controller.
    pub fn switch_agent(
        &mut self,
        id: &str,
        agent: Box<dyn Agent>,
    ) -> Result<(), SessionError> {
        let session = self.get_mut(id)?;
        session.meta.agent_kind = agent.kind();
        session.agent = agent;
        Ok(())
    }

    pub fn history(&self, id: &str) -> Result<&[HistoryEntry], SessionError> {
        self.sessions
            .get(id)
            .map(|s| s.history.as_slice())
            .ok_or_else(|| SessionError::NotFound { id: id.to_string() })
    }

    pub fn meta(&self, id: &str) -> Result<&SessionMeta, SessionError> {
        self.sessions
            .get(id)
            .map(|s| &s.meta)
            .ok_or_else(|| SessionError::NotFound { id: id.to_string() })
    }

    pub fn end_session(&mut self, id: &str) -> Result<SessionMeta, SessionError> {
        let mut session = self
            .sessions
            .remove(id)
            .ok_or_else(|| SessionError::NotFound { id: id.to_string() })?;
        session.meta.ended_at = Some(unix_now());
        Ok(session.meta)
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Session, SessionError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound { id: id.to_string() })
    }
}
