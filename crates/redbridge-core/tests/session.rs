use redbridge_core::actions::Action;
use redbridge_core::agent::{Agent, AgentKind, ScriptedAgent};
use redbridge_core::core::Button;
use redbridge_core::obs::{Observation, RgbFrame};
use redbridge_core::session::{SessionError, SessionManager};

fn dummy_observation() -> Observation {
    Observation::Rgb(RgbFrame {
        width: 2,
        height: 2,
        data: vec![0; 12],
    })
}

/// Always presses A, like the Python DummyAgent.
struct PressA;

impl Agent for PressA {
    fn kind(&self) -> AgentKind {
        AgentKind::Scripted
    }

    fn choose_action(&mut self, _observation: &Observation) -> Action {
        Action::Press(Button::A)
    }
}

#[test]
fn create_step_and_history() {
    let mut manager = SessionManager::new();
    manager.create_session("sess1", Box::new(PressA)).unwrap();

    let action = manager.step("sess1", dummy_observation()).unwrap();
    assert_eq!(action, Action::Press(Button::A));

    let history = manager.history("sess1").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, Action::Press(Button::A));
    assert_eq!(history[0].observation, dummy_observation());
}

#[test]
fn switch_agent_keeps_session_running() {
    let mut manager = SessionManager::new();
    manager.create_session("sess2", Box::new(PressA)).unwrap();
    manager.step("sess2", dummy_observation()).unwrap();

    manager
        .switch_agent("sess2", Box::new(ScriptedAgent::new(vec![Action::Wait])))
        .unwrap();
    let action = manager.step("sess2", dummy_observation()).unwrap();
    assert_eq!(action, Action::Wait);

    // History spans both controllers.
    assert_eq!(manager.history("sess2").unwrap().len(), 2);
}

#[test]
fn missing_session_is_an_error() {
    let mut manager = SessionManager::new();
    let err = manager.step("nope", dummy_observation()).unwrap_err();
    assert!(matches!(err, SessionError::NotFound { .. }), "got {err}");
    assert!(manager.history("nope").is_err());
}

#[test]
fn duplicate_session_id_rejected() {
    let mut manager = SessionManager::new();
    manager.create_session("sess3", Box::new(PressA)).unwrap();
    let err = manager
        .create_session("sess3", Box::new(PressA))
        .unwrap_err();
    assert!(matches!(err, SessionError::AlreadyExists { .. }), "got {err}");
}

#[test]
fn end_session_stamps_metadata() {
    let mut manager = SessionManager::new();
    manager.create_session("sess4", Box::new(PressA)).unwrap();
    assert_eq!(manager.meta("sess4").unwrap().agent_kind, AgentKind::Scripted);

    let meta = manager.end_session("sess4").unwrap();
    assert!(meta.ended_at.is_some());
    assert!(manager.meta("sess4").is_err());
}
