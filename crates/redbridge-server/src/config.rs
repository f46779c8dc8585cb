use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8350";
pub const DEFAULT_MAX_SESSIONS: usize = 8;

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Cartridge image; checksum-verified at startup when set.
    pub rom_path: Option<PathBuf>,
    pub replay_dir: PathBuf,
    pub max_sessions: usize,
    pub default_wait_frames: u32,
    /// Embed PNG frames in recorded replays.
    pub record_frames: bool,
    /// Mount the bus poke endpoint. Off outside harness setups.
    pub debug_endpoints: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.parse().expect("valid default address"),
            rom_path: None,
            replay_dir: PathBuf::from("replays"),
            max_sessions: DEFAULT_MAX_SESSIONS,
            default_wait_frames: redbridge_core::actions::DEFAULT_WAIT_FRAMES,
            record_frames: true,
            debug_endpoints: false,
        }
    }
}

/// On-disk configuration; every key optional, flags win over the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConfigFile {
    pub bind_addr: Option<SocketAddr>,
    pub rom_path: Option<PathBuf>,
    pub replay_dir: Option<PathBuf>,
    pub max_sessions: Option<usize>,
    pub default_wait_frames: Option<u32>,
    pub record_frames: Option<bool>,
    pub debug_endpoints: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &PathBuf) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn apply(self, cfg: &mut ServerConfig) {
        if let Some(v) = self.bind_addr {
            cfg.bind_addr = v;
        }
        if let Some(v) = self.rom_path {
            cfg.rom_path = Some(v);
        }
        if let Some(v) = self.replay_dir {
            cfg.replay_dir = v;
        }
        if let Some(v) = self.max_sessions {
            cfg.max_sessions = v;
        }
        if let Some(v) = self.default_wait_frames {
            cfg.default_wait_frames = v;
        }
        if let Some(v) = self.record_frames {
            cfg.record_frames = v;
        }
        if let Some(v) = self.debug_endpoints {
            cfg.debug_endpoints = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_overrides_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            bind-addr = "0.0.0.0:9000"
            max-sessions = 2
            debug-endpoints = true
            "#,
        )
        .unwrap();

        let mut cfg = ServerConfig::default();
        file.apply(&mut cfg);
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(cfg.max_sessions, 2);
        assert!(cfg.debug_endpoints);
        // Untouched keys keep their defaults.
        assert!(cfg.record_frames);
    }
}
