//! Blocking HTTP client for the coordination service.

use anyhow::{Context, bail};
use serde::Deserialize;

use redbridge_core::actions::Action;
use redbridge_core::agent::AgentKind;
use redbridge_core::game::GameSnapshot;
use redbridge_core::replay::Replay;
use redbridge_core::session::SessionMeta;

const CONTROL_TOKEN_HEADER: &str = "x-control-token";

#[derive(Debug, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
    pub control_token: String,
    pub meta: SessionMeta,
}

#[derive(Debug, Deserialize)]
pub struct StepOutcome {
    pub step: u64,
    pub snapshot: GameSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct SessionDetail {
    pub meta: SessionMeta,
    pub step: u64,
    pub snapshot: GameSnapshot,
}

#[derive(Debug, Deserialize)]
struct ReplayList {
    replays: Vec<String>,
}

pub struct ApiClient {
    http: reqwest::blocking::Client,
    base: String,
}

impl ApiClient {
    pub fn new(server: &str) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base: server.trim_end_matches('/').to_string(),
        }
    }

    pub fn create_session(
        &self,
        agent_kind: AgentKind,
        wait_frames: Option<u32>,
    ) -> anyhow::Result<SessionCreated> {
        let resp = self
            .http
            .post(format!("{}/v1/sessions", self.base))
            .json(&serde_json::json!({
                "agent_kind": agent_kind,
                "wait_frames": wait_frames,
            }))
            .send()
            .context("create session")?;
        read_json(resp)
    }

    pub fn step(
        &self,
        session_id: &str,
        token: &str,
        action: Action,
    ) -> anyhow::Result<StepOutcome> {
        let resp = self
            .http
            .post(format!("{}/v1/sessions/{session_id}/step", self.base))
            .header(CONTROL_TOKEN_HEADER, token)
            .json(&serde_json::json!({ "action": action }))
            .send()
            .context("step session")?;
        read_json(resp)
    }

    pub fn detail(&self, session_id: &str) -> anyhow::Result<SessionDetail> {
        let resp = self
            .http
            .get(format!("{}/v1/sessions/{session_id}", self.base))
            .send()
            .context("fetch session")?;
        read_json(resp)
    }

    pub fn frame(&self, session_id: &str) -> anyhow::Result<Vec<u8>> {
        let resp = self
            .http
            .get(format!("{}/v1/sessions/{session_id}/frame", self.base))
            .send()
            .context("fetch frame")?;
        if !resp.status().is_success() {
            bail!("frame request failed: {}", resp.status());
        }
        Ok(resp.bytes().context("frame body")?.to_vec())
    }

    pub fn close(&self, session_id: &str, token: &str) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(format!("{}/v1/sessions/{session_id}/close", self.base))
            .header(CONTROL_TOKEN_HEADER, token)
            .send()
            .context("close session")?;
        if !resp.status().is_success() {
            bail!("close failed: {}", resp.status());
        }
        Ok(())
    }

    pub fn replays(&self) -> anyhow::Result<Vec<String>> {
        let resp = self
            .http
            .get(format!("{}/v1/replays", self.base))
            .send()
            .context("list replays")?;
        let list: ReplayList = read_json(resp)?;
        Ok(list.replays)
    }

    pub fn replay(&self, session_id: &str) -> anyhow::Result<Replay> {
        let resp = self
            .http
            .get(format!("{}/v1/replays/{session_id}", self.base))
            .send()
            .context("fetch replay")?;
        read_json(resp)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::blocking::Response) -> anyhow::Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        bail!("server returned {status}: {body}");
    }
    resp.json().context("decode response body")
}
