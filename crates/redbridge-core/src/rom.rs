use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// SHA-256 of the Pokémon Red (UE) cartridge image.
pub const POKEMON_RED_SHA256: &str =
    "5ca7ba01642a3b27b0cc0b5349b52792795b62d3ed977e98a09390659af96b7b";

const HASH_CHUNK: usize = 8192;

#[derive(Debug, Error)]
pub enum RomError {
    #[error("ROM not found at {path}")]
    NotFound { path: PathBuf },
    #[error("invalid ROM: SHA-256 {found} does not match Pokémon Red")]
    ChecksumMismatch { found: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Compute the SHA-256 checksum of a file, hex-encoded.
pub fn compute_sha256(path: &Path) -> Result<String, RomError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_hex(&hasher.finalize()))
}

/// Whether the file at `path` matches the known Pokémon Red checksum.
pub fn is_valid_pokemon_red_rom(path: &Path) -> Result<bool, RomError> {
    Ok(compute_sha256(path)? == POKEMON_RED_SHA256)
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// A loaded cartridge image together with its digest.
#[derive(Debug, Clone)]
pub struct RomImage {
    bytes: Vec<u8>,
    sha256: String,
    path: PathBuf,
}

impl RomImage {
    /// Load a ROM from disk without verifying its checksum.
    ///
    /// A missing file is reported as [`RomError::NotFound`] rather than a
    /// bare I/O error so callers can tell "place the ROM here" apart from
    /// a corrupt download.
    pub fn open(path: &Path) -> Result<Self, RomError> {
        if !path.exists() {
            return Err(RomError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(Self {
            sha256: to_hex(&hasher.finalize()),
            bytes,
            path: path.to_path_buf(),
        })
    }

    /// Load a ROM and require it to be Pokémon Red.
    ///
    /// This is the gate every session goes through before a core is
    /// constructed.
    pub fn open_verified(path: &Path) -> Result<Self, RomError> {
        let rom = Self::open(path)?;
        if !rom.is_pokemon_red() {
            return Err(RomError::ChecksumMismatch {
                found: rom.sha256.clone(),
            });
        }
        log::debug!("verified ROM {} ({} bytes)", path.display(), rom.bytes.len());
        Ok(rom)
    }

    pub fn is_pokemon_red(&self) -> bool {
        self.sha256 == POKEMON_RED_SHA256
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
