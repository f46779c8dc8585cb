use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{Button, EmulatorCore};

/// Frames an input is held by default before release.
pub const DEFAULT_WAIT_FRAMES: u32 = 8;

#[derive(Debug, Error)]
#[error("action index {0} is not in the canonical action table")]
pub struct ActionIndexError(pub usize);

/// One step of agent input: hold a button, or just let time pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "kebab-case")]
pub enum Action {
    Press(Button),
    Wait,
}

impl Action {
    /// The canonical discrete action set: one press per button, then wait.
    pub const ALL: [Action; 9] = [
        Action::Press(Button::A),
        Action::Press(Button::B),
        Action::Press(Button::Up),
        Action::Press(Button::Down),
        Action::Press(Button::Left),
        Action::Press(Button::Right),
        Action::Press(Button::Start),
        Action::Press(Button::Select),
        Action::Wait,
    ];

    pub fn from_index(idx: usize) -> Result<Action, ActionIndexError> {
        Action::ALL.get(idx).copied().ok_or(ActionIndexError(idx))
    }

    pub fn index(self) -> usize {
        Action::ALL
            .iter()
            .position(|a| *a == self)
            .expect("action is in the canonical table")
    }

    pub fn label(self) -> String {
        match self {
            Action::Press(b) => format!("press {b}"),
            Action::Wait => "wait".to_string(),
        }
    }
}

/// Apply an action to a core: press, hold for `wait_frames`, release.
///
/// `Wait` advances the same number of frames with nothing held.
pub fn apply(core: &mut dyn EmulatorCore, action: Action, wait_frames: u32) {
    match action {
        Action::Press(button) => {
            core.set_button(button, true);
            for _ in 0..wait_frames {
                core.tick();
            }
            core.set_button(button, false);
        }
        Action::Wait => {
            for _ in 0..wait_frames {
                core.tick();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FlatCore;

    #[test]
    fn canonical_table_has_nine_entries() {
        assert_eq!(Action::ALL.len(), 9);
        assert_eq!(Action::ALL[8], Action::Wait);
    }

    #[test]
    fn index_round_trip() {
        for (i, action) in Action::ALL.iter().enumerate() {
            assert_eq!(Action::from_index(i).unwrap(), *action);
            assert_eq!(action.index(), i);
        }
        assert!(Action::from_index(9).is_err());
    }

    #[test]
    fn serde_round_trip() {
        let json = serde_json::to_string(&Action::Press(Button::Start)).unwrap();
        assert_eq!(json, r#"{"type":"press","key":"start"}"#);
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Action::Press(Button::Start));

        let wait: Action = serde_json::from_str(r#"{"type":"wait"}"#).unwrap();
        assert_eq!(wait, Action::Wait);
    }

    #[test]
    fn apply_presses_and_releases() {
        let mut core = FlatCore::new();
        apply(&mut core, Action::Press(Button::A), 3);
        assert_eq!(core.frames_elapsed(), 3);
        assert!(!core.is_pressed(Button::A));

        apply(&mut core, Action::Wait, 5);
        assert_eq!(core.frames_elapsed(), 8);
        assert_eq!(core.pressed_mask(), 0);
    }
}
