use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::obs::Observation;

/// What kind of controller is driving a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    Rl,
    Llm,
    Human,
    Scripted,
}

impl AgentKind {
    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Rl => "rl",
            AgentKind::Llm => "llm",
            AgentKind::Human => "human",
            AgentKind::Scripted => "scripted",
        }
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rl" => Ok(AgentKind::Rl),
            "llm" => Ok(AgentKind::Llm),
            "human" => Ok(AgentKind::Human),
            "scripted" => Ok(AgentKind::Scripted),
            other => Err(format!("unknown agent kind {other:?}")),
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A controller: observation in, action out.
///
/// RL policies, language-model drivers, and human frontends all sit behind
/// this trait; the session layer does not care which is attached.
pub trait Agent: Send {
    fn kind(&self) -> AgentKind;

    fn choose_action(&mut self, observation: &Observation) -> Action;
}

/// Replays a fixed action sequence, cycling when it runs out.
pub struct ScriptedAgent {
    script: Vec<Action>,
    next: usize,
}

impl ScriptedAgent {
    pub fn new(script: Vec<Action>) -> Self {
        Self { script, next: 0 }
    }
}

impl Agent for ScriptedAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Scripted
    }

    fn choose_action(&mut self, _observation: &Observation) -> Action {
        if self.script.is_empty() {
            return Action::Wait;
        }
        let action = self.script[self.next % self.script.len()];
        self.next += 1;
        action
    }
}
