//! Session coordination for a Game Boy emulator running Pokémon Red.
//!
//! This crate contains the platform-agnostic coordination logic: ROM
//! validation, the emulator seam, game-state mirroring, the step()-style
//! environment, agents/sessions, and replay recording. Frontends (the HTTP
//! service, the CLI client) live in separate crates and drive sessions via
//! these types. The emulator itself is an external dependency behind the
//! [`core::EmulatorCore`] trait.

/// Canonical action set and input application.
pub mod actions;

/// Agent trait and the scripted reference agent.
pub mod agent;

/// Emulator seam: buttons, framebuffer, the core trait, and the flat
/// harness core.
pub mod core;

/// Step()-style environment over any core.
pub mod env;

/// Pokémon Red memory map mirror.
pub mod game;

/// Observation pipelines (rl / llm / human).
pub mod obs;

/// Replay files and the on-disk store.
pub mod replay;

/// ROM loading and SHA-256 validation.
pub mod rom;

/// In-process session bookkeeping.
pub mod session;

/// Generation-1 text decoding.
pub mod text;
