use std::io::Cursor;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Screen width in pixels.
pub const SCREEN_WIDTH: u32 = 160;
/// Screen height in pixels.
pub const SCREEN_HEIGHT: u32 = 144;

/// The eight joypad buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Button {
    A,
    B,
    Up,
    Down,
    Left,
    Right,
    Start,
    Select,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::Start,
        Button::Select,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Button::A => "a",
            Button::B => "b",
            Button::Up => "up",
            Button::Down => "down",
            Button::Left => "left",
            Button::Right => "right",
            Button::Start => "start",
            Button::Select => "select",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Button::A => 0x01,
            Button::B => 0x02,
            Button::Up => 0x04,
            Button::Down => 0x08,
            Button::Left => 0x10,
            Button::Right => 0x20,
            Button::Start => 0x40,
            Button::Select => 0x80,
        }
    }
}

impl FromStr for Button {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Button::ALL
            .into_iter()
            .find(|b| b.name() == s)
            .ok_or_else(|| CoreError::UnknownButton(s.to_string()))
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown button {0:?}")]
    UnknownButton(String),
    #[error("state blob rejected: {0}")]
    BadState(&'static str),
    #[error("frame encode failed: {0}")]
    FrameEncode(String),
}

/// One video frame, RGBA8, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            rgba: vec![0; (SCREEN_WIDTH * SCREEN_HEIGHT * 4) as usize],
        }
    }

    /// RGB copy with the alpha channel dropped.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.width * self.height * 3) as usize);
        for px in self.rgba.chunks_exact(4) {
            out.extend_from_slice(&px[..3]);
        }
        out
    }

    /// Encode the frame as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, CoreError> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .ok_or(CoreError::BadState("framebuffer size"))?;
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .map_err(|e| CoreError::FrameEncode(e.to_string()))?;
        Ok(out)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// The seam between the coordination layer and an emulator implementation.
///
/// Everything above this trait treats the emulator the way the rest of the
/// repository treats it: an opaque machine with a joypad, a screen, and a
/// byte-addressable bus. Real backends live out of tree; [`FlatCore`] is
/// the bundled harness core.
pub trait EmulatorCore: Send {
    /// Press or release a joypad button. The state persists across ticks
    /// until changed.
    fn set_button(&mut self, button: Button, pressed: bool);

    /// Advance emulation by one video frame.
    fn tick(&mut self);

    /// The most recently completed frame.
    fn frame(&self) -> &FrameBuffer;

    /// Read one byte from the bus.
    fn read_byte(&self, addr: u16) -> u8;

    /// Write one byte to the bus. Writes into ROM are ignored.
    fn write_byte(&mut self, addr: u16, value: u8);

    /// Serialize the full machine state.
    fn save_state(&self) -> Vec<u8>;

    /// Restore a state produced by [`EmulatorCore::save_state`].
    fn load_state(&mut self, blob: &[u8]) -> Result<(), CoreError>;

    /// Return to the power-on state, keeping the loaded cartridge.
    fn reset(&mut self);

    /// Frames elapsed since power-on or the last reset.
    fn frames_elapsed(&self) -> u64;
}

const FLAT_STATE_MAGIC: &[u8; 4] = b"RBST";
const FLAT_STATE_VERSION: u8 = 1;
const BUS_SIZE: usize = 0x1_0000;
const ROM_END: usize = 0x8000;

/// A CPU-less core: a flat 64 KiB bus, a host-writable framebuffer, and a
/// frame counter. ROM bytes are mapped read-only at 0x0000..0x8000.
///
/// This is the core the harness, the service smoke path, and the test
/// suite run against. It does not execute anything; state only changes
/// when the host writes it, which is exactly what memory-map tests need.
pub struct FlatCore {
    mem: Box<[u8; BUS_SIZE]>,
    rom_len: usize,
    frame: FrameBuffer,
    frames: u64,
    buttons: u8,
}

impl FlatCore {
    pub fn new() -> Self {
        Self {
            mem: Box::new([0; BUS_SIZE]),
            rom_len: 0,
            frame: FrameBuffer::new(),
            frames: 0,
            buttons: 0,
        }
    }

    /// A core with cartridge bytes mapped at the bottom of the bus.
    pub fn with_rom(rom: &[u8]) -> Self {
        let mut core = Self::new();
        let n = rom.len().min(ROM_END);
        core.mem[..n].copy_from_slice(&rom[..n]);
        core.rom_len = n;
        core
    }

    /// Currently pressed buttons, one bit per button.
    pub fn pressed_mask(&self) -> u8 {
        self.buttons
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons & button.bit() != 0
    }

    /// Host-side framebuffer access, for harnesses that paint frames.
    pub fn frame_mut(&mut self) -> &mut FrameBuffer {
        &mut self.frame
    }

    // Vertical gradient keyed to the frame counter, so spectators see a
    // moving picture even without an emulator attached.
    fn paint_test_pattern(&mut self) {
        let phase = (self.frames & 0xFF) as u8;
        for y in 0..SCREEN_HEIGHT {
            let shade = (y as u8).wrapping_add(phase);
            let row = (y * SCREEN_WIDTH * 4) as usize;
            for x in 0..SCREEN_WIDTH as usize {
                let px = row + x * 4;
                self.frame.rgba[px] = shade;
                self.frame.rgba[px + 1] = shade;
                self.frame.rgba[px + 2] = shade.wrapping_add(self.buttons);
                self.frame.rgba[px + 3] = 0xFF;
            }
        }
    }
}

impl Default for FlatCore {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatorCore for FlatCore {
    fn set_button(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.buttons |= button.bit();
        } else {
            self.buttons &= !button.bit();
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        self.paint_test_pattern();
    }

    fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    fn read_byte(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        let addr = addr as usize;
        if addr < self.rom_len {
            return;
        }
        self.mem[addr] = value;
    }

    fn save_state(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 1 + 8 + 1 + BUS_SIZE + self.frame.rgba.len());
        out.extend_from_slice(FLAT_STATE_MAGIC);
        out.push(FLAT_STATE_VERSION);
        out.extend_from_slice(&self.frames.to_le_bytes());
        out.push(self.buttons);
        out.extend_from_slice(&self.mem[..]);
        out.extend_from_slice(&self.frame.rgba);
        out
    }

    fn load_state(&mut self, blob: &[u8]) -> Result<(), CoreError> {
        let expected = 4 + 1 + 8 + 1 + BUS_SIZE + self.frame.rgba.len();
        if blob.len() != expected {
            return Err(CoreError::BadState("length"));
        }
        if &blob[..4] != FLAT_STATE_MAGIC {
            return Err(CoreError::BadState("magic"));
        }
        if blob[4] != FLAT_STATE_VERSION {
            return Err(CoreError::BadState("version"));
        }
        let mut frames = [0u8; 8];
        frames.copy_from_slice(&blob[5..13]);
        self.frames = u64::from_le_bytes(frames);
        self.buttons = blob[13];
        self.mem.copy_from_slice(&blob[14..14 + BUS_SIZE]);
        self.frame.rgba.copy_from_slice(&blob[14 + BUS_SIZE..]);
        Ok(())
    }

    fn reset(&mut self) {
        // Keep the cartridge mapping, clear everything else.
        self.mem[self.rom_len..].fill(0);
        self.frames = 0;
        self.buttons = 0;
        self.frame = FrameBuffer::new();
    }

    fn frames_elapsed(&self) -> u64 {
        self.frames
    }
}
