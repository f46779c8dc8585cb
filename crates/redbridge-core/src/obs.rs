//! Observation pipelines.
//!
//! Raw frames are 160x144 RGBA. Agents rarely want that: RL policies train
//! on small stacked grayscale frames, vision-language agents on a resized
//! color image, humans on the native picture. The pipeline applies the
//! standard preprocessing for each consumer.

use std::collections::VecDeque;

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::core::FrameBuffer;

pub const DEFAULT_SHAPE: (u32, u32) = (84, 84);
pub const DEFAULT_STACK: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ObservationMode {
    /// Resize, grayscale, stack the most recent frames.
    #[default]
    Rl,
    /// Resize, keep color, no stacking.
    Llm,
    /// Native resolution RGB.
    Human,
}

/// A color frame, row-major RGB8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// A single-channel frame, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// What an agent sees after preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Rgb(RgbFrame),
    /// Oldest first; always exactly `num_stack` frames.
    Stacked(Vec<GrayFrame>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub mode: ObservationMode,
    /// Target (height, width) for the resizing modes.
    pub shape: (u32, u32),
    /// Frames per stacked observation in `rl` mode.
    pub num_stack: usize,
}

impl PipelineConfig {
    pub fn for_mode(mode: ObservationMode) -> Self {
        Self {
            mode,
            shape: DEFAULT_SHAPE,
            num_stack: DEFAULT_STACK,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_mode(ObservationMode::Rl)
    }
}

/// Stateful preprocessing: the `rl` mode keeps a rolling frame stack.
#[derive(Debug, Clone)]
pub struct ObservationPipeline {
    cfg: PipelineConfig,
    stack: VecDeque<GrayFrame>,
}

impl ObservationPipeline {
    pub fn new(cfg: PipelineConfig) -> Self {
        Self {
            cfg,
            stack: VecDeque::with_capacity(cfg.num_stack),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Drop accumulated stack state. Called on environment reset.
    pub fn reset(&mut self) {
        self.stack.clear();
    }

    pub fn process(&mut self, frame: &FrameBuffer) -> Observation {
        match self.cfg.mode {
            ObservationMode::Human => Observation::Rgb(native_rgb(frame)),
            ObservationMode::Llm => Observation::Rgb(resized_rgb(frame, self.cfg.shape)),
            ObservationMode::Rl => {
                let gray = resized_gray(frame, self.cfg.shape);
                if self.stack.is_empty() {
                    // First frame after reset: pad the stack with copies so
                    // observations always have num_stack frames.
                    for _ in 0..self.cfg.num_stack {
                        self.stack.push_back(gray.clone());
                    }
                } else {
                    if self.stack.len() == self.cfg.num_stack {
                        self.stack.pop_front();
                    }
                    self.stack.push_back(gray);
                }
                Observation::Stacked(self.stack.iter().cloned().collect())
            }
        }
    }
}

fn native_rgb(frame: &FrameBuffer) -> RgbFrame {
    RgbFrame {
        width: frame.width,
        height: frame.height,
        data: frame.to_rgb(),
    }
}

fn resized_rgb(frame: &FrameBuffer, shape: (u32, u32)) -> RgbFrame {
    let (h, w) = shape;
    let img = rgb_image(frame);
    let resized = imageops::resize(&img, w, h, FilterType::Triangle);
    RgbFrame {
        width: w,
        height: h,
        data: resized.into_raw(),
    }
}

fn resized_gray(frame: &FrameBuffer, shape: (u32, u32)) -> GrayFrame {
    let (h, w) = shape;
    let img = rgb_image(frame);
    let resized = imageops::resize(&img, w, h, FilterType::Triangle);
    let gray: GrayImage = imageops::grayscale(&resized);
    GrayFrame {
        width: w,
        height: h,
        data: gray.into_raw(),
    }
}

fn rgb_image(frame: &FrameBuffer) -> RgbImage {
    RgbImage::from_raw(frame.width, frame.height, frame.to_rgb())
        .expect("framebuffer dimensions match its data")
}
