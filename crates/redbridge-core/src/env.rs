//! Step()-style environment over any emulator core.

use std::path::Path;

use thiserror::Error;

use crate::actions::{self, Action, ActionIndexError, DEFAULT_WAIT_FRAMES};
use crate::core::{Button, CoreError, EmulatorCore};
use crate::game::{GameReader, GameSnapshot};
use crate::obs::{Observation, ObservationMode, ObservationPipeline, PipelineConfig, RgbFrame};

#[derive(Debug, Error)]
pub enum EnvError {
    #[error(transparent)]
    Action(#[from] ActionIndexError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of one environment step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: GameSnapshot,
}

/// An episode-style wrapper around a core: reset, step, render.
///
/// Reward and termination are fixed at 0.0/false; reward shaping and
/// episode boundaries belong to the training stack driving the
/// environment, not to the coordination layer.
pub struct RedEnv<C: EmulatorCore> {
    core: C,
    pipeline: ObservationPipeline,
    wait_frames: u32,
    steps: u64,
}

impl<C: EmulatorCore> RedEnv<C> {
    pub fn new(core: C, mode: ObservationMode) -> Self {
        Self::with_pipeline(core, ObservationPipeline::new(PipelineConfig::for_mode(mode)))
    }

    pub fn with_pipeline(core: C, pipeline: ObservationPipeline) -> Self {
        Self {
            core,
            pipeline,
            wait_frames: DEFAULT_WAIT_FRAMES,
            steps: 0,
        }
    }

    pub fn set_wait_frames(&mut self, wait_frames: u32) {
        self.wait_frames = wait_frames.max(1);
    }

    /// Reset the core and return the first observation.
    pub fn reset(&mut self) -> (Observation, GameSnapshot) {
        self.core.reset();
        self.pipeline.reset();
        self.steps = 0;
        let observation = self.pipeline.process(self.core.frame());
        (observation, self.snapshot())
    }

    pub fn step(&mut self, action: Action) -> StepResult {
        self.step_with_wait(action, self.wait_frames)
    }

    pub fn step_with_wait(&mut self, action: Action, wait_frames: u32) -> StepResult {
        actions::apply(&mut self.core, action, wait_frames);
        self.steps += 1;
        StepResult {
            observation: self.pipeline.process(self.core.frame()),
            reward: 0.0,
            terminated: false,
            truncated: false,
            info: self.snapshot(),
        }
    }

    /// Drive by index into [`Action::ALL`].
    pub fn step_index(&mut self, idx: usize) -> Result<StepResult, EnvError> {
        let action = Action::from_index(idx)?;
        Ok(self.step(action))
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameReader::new(&self.core).snapshot()
    }

    /// Native-resolution RGB render, regardless of observation mode.
    pub fn render_rgb(&self) -> RgbFrame {
        let frame = self.core.frame();
        RgbFrame {
            width: frame.width,
            height: frame.height,
            data: frame.to_rgb(),
        }
    }

    pub fn save_state(&self, path: &Path) -> Result<(), EnvError> {
        std::fs::write(path, self.core.save_state())?;
        Ok(())
    }

    pub fn load_state(&mut self, path: &Path) -> Result<(), EnvError> {
        let blob = std::fs::read(path)?;
        self.core.load_state(&blob)?;
        Ok(())
    }

    /// Scripted menu skip from the title screen: a few Start and A presses
    /// with generous waits in between.
    pub fn start_new_game(&mut self) {
        log::debug!("running scripted new-game sequence");
        for button in [Button::Start, Button::Start, Button::A, Button::A, Button::A] {
            actions::apply(&mut self.core, Action::Press(button), 30);
        }
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut C {
        &mut self.core
    }

    pub fn into_core(self) -> C {
        self.core
    }
}
