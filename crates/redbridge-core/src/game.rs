//! Pokémon Red memory map mirror.
//!
//! Reads game state straight off the bus of any [`EmulatorCore`]. The
//! addresses are the well-known Red/Blue WRAM locations; every decoding
//! here is covered by tests that plant bytes and read them back.

use serde::{Deserialize, Serialize};

use crate::core::EmulatorCore;
use crate::text;

pub const PLAYER_X_ADDR: u16 = 0xD361;
pub const PLAYER_Y_ADDR: u16 = 0xD362;
pub const MAP_ID_ADDR: u16 = 0xD35E;
pub const MONEY_ADDR: u16 = 0xD347;
pub const PLAYER_NAME_ADDR: u16 = 0xD158;
pub const RIVAL_NAME_ADDR: u16 = 0xD34A;
pub const BADGES_ADDR: u16 = 0xD356;
pub const POKEDEX_OWNED_ADDR: u16 = 0xD2F7;
pub const POKEDEX_SEEN_ADDR: u16 = 0xD30A;
pub const TIME_PLAYED_ADDR: u16 = 0xDA40;
pub const PARTY_COUNT_ADDR: u16 = 0xD163;
pub const PARTY_SPECIES_LIST_ADDR: u16 = 0xD164;
pub const PARTY_DATA_ADDR: u16 = 0xD16B;
pub const PARTY_NICKNAMES_ADDR: u16 = 0xD2B5;

/// Player and rival names are at most 7 visible characters.
pub const NAME_LENGTH: usize = 7;
/// Nickname slots are 11 bytes (10 characters plus terminator).
pub const NICKNAME_LENGTH: usize = 11;
/// Party records are 44 bytes each.
pub const PARTY_MON_SIZE: u16 = 0x2C;
pub const MAX_PARTY: usize = 6;

const SPECIES_LIST_TERMINATOR: u8 = 0xFF;

/// Hours/minutes/seconds/frames of play time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePlayed {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokedexCounts {
    pub owned: u16,
    pub seen: u16,
}

/// One value per Gen-1 stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSet {
    pub hp: u16,
    pub attack: u16,
    pub defense: u16,
    pub speed: u16,
    pub special: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonStats {
    pub max_hp: u16,
    pub attack: u16,
    pub defense: u16,
    pub speed: u16,
    pub special: u16,
}

/// Battle-relevant data for one party member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMon {
    pub species_id: u8,
    pub nickname: String,
    pub level: u8,
    pub current_hp: u16,
    pub status: u8,
    pub types: [u8; 2],
    pub moves: [u8; 4],
    pub pp: [u8; 4],
    pub trainer_id: u16,
    pub exp: u32,
    pub evs: StatSet,
    pub ivs: StatSet,
    pub stats: MonStats,
}

/// Everything a step result reports about the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub player_name: String,
    pub rival_name: String,
    pub x: u8,
    pub y: u8,
    pub map_id: u8,
    pub money: u32,
    pub badges: u8,
    pub pokedex: PokedexCounts,
    pub time_played: TimePlayed,
    pub party: Vec<PartyMon>,
}

/// Read-only view of the game state behind a core.
pub struct GameReader<'a> {
    core: &'a dyn EmulatorCore,
}

impl<'a> GameReader<'a> {
    pub fn new(core: &'a dyn EmulatorCore) -> Self {
        Self { core }
    }

    pub fn memory_value(&self, addr: u16) -> u8 {
        self.core.read_byte(addr)
    }

    pub fn player_x(&self) -> u8 {
        self.core.read_byte(PLAYER_X_ADDR)
    }

    pub fn player_y(&self) -> u8 {
        self.core.read_byte(PLAYER_Y_ADDR)
    }

    pub fn player_coords(&self) -> (u8, u8) {
        (self.player_x(), self.player_y())
    }

    pub fn current_map_id(&self) -> u8 {
        self.core.read_byte(MAP_ID_ADDR)
    }

    /// Money is stored as three BCD bytes, most significant digit pair
    /// first: 0x12 0x34 0x56 is 123456.
    pub fn player_money(&self) -> u32 {
        let mut value = 0u32;
        for i in 0..3 {
            let b = self.core.read_byte(MONEY_ADDR + i);
            value = value * 100 + bcd_pair(b);
        }
        value
    }

    pub fn player_name(&self) -> String {
        self.text_field(PLAYER_NAME_ADDR, NAME_LENGTH)
    }

    pub fn rival_name(&self) -> String {
        self.text_field(RIVAL_NAME_ADDR, NAME_LENGTH)
    }

    /// The badge bitfield, one bit per gym in order.
    pub fn badges(&self) -> u8 {
        self.core.read_byte(BADGES_ADDR)
    }

    pub fn pokedex_owned_count(&self) -> u16 {
        self.read_u16_le(POKEDEX_OWNED_ADDR)
    }

    pub fn pokedex_seen_count(&self) -> u16 {
        self.read_u16_le(POKEDEX_SEEN_ADDR)
    }

    /// Play time as BCD hours/minutes/seconds/frames.
    pub fn time_played(&self) -> TimePlayed {
        TimePlayed {
            hours: bcd_pair(self.core.read_byte(TIME_PLAYED_ADDR)) as u8,
            minutes: bcd_pair(self.core.read_byte(TIME_PLAYED_ADDR + 1)) as u8,
            seconds: bcd_pair(self.core.read_byte(TIME_PLAYED_ADDR + 2)) as u8,
            frames: bcd_pair(self.core.read_byte(TIME_PLAYED_ADDR + 3)) as u8,
        }
    }

    pub fn party_count(&self) -> u8 {
        self.core.read_byte(PARTY_COUNT_ADDR)
    }

    /// Species ids of the party, in order.
    ///
    /// The list is bounded both by the count byte and the 0xFF terminator;
    /// a stale count cannot read past the end of the list.
    pub fn party_species(&self) -> Vec<u8> {
        let count = (self.party_count() as usize).min(MAX_PARTY);
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let b = self.core.read_byte(PARTY_SPECIES_LIST_ADDR + i as u16);
            if b == SPECIES_LIST_TERMINATOR {
                break;
            }
            out.push(b);
        }
        out
    }

    pub fn party_nicknames(&self) -> Vec<String> {
        let count = (self.party_count() as usize).min(MAX_PARTY);
        (0..count)
            .map(|i| {
                self.text_field(
                    PARTY_NICKNAMES_ADDR + (i * NICKNAME_LENGTH) as u16,
                    NICKNAME_LENGTH,
                )
            })
            .collect()
    }

    /// Full 44-byte records for every party member.
    pub fn party_mons(&self) -> Vec<PartyMon> {
        let nicknames = self.party_nicknames();
        let count = (self.party_count() as usize).min(MAX_PARTY);
        (0..count)
            .map(|i| {
                let base = PARTY_DATA_ADDR + i as u16 * PARTY_MON_SIZE;
                let nickname = nicknames.get(i).cloned().unwrap_or_default();
                self.read_party_mon(base, nickname)
            })
            .collect()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            player_name: self.player_name(),
            rival_name: self.rival_name(),
            x: self.player_x(),
            y: self.player_y(),
            map_id: self.current_map_id(),
            money: self.player_money(),
            badges: self.badges(),
            pokedex: PokedexCounts {
                owned: self.pokedex_owned_count(),
                seen: self.pokedex_seen_count(),
            },
            time_played: self.time_played(),
            party: self.party_mons(),
        }
    }

    fn read_party_mon(&self, base: u16, nickname: String) -> PartyMon {
        // Offsets follow the in-RAM party structure. IVs pack four stats
        // into two nibble pairs; the HP IV is the four low bits in
        // attack/defense/speed/special order.
        let iv1 = self.core.read_byte(base + 0x1B);
        let iv2 = self.core.read_byte(base + 0x1C);
        let attack_iv = (iv1 >> 4) as u16;
        let defense_iv = (iv1 & 0x0F) as u16;
        let speed_iv = (iv2 >> 4) as u16;
        let special_iv = (iv2 & 0x0F) as u16;
        let hp_iv = ((attack_iv & 1) << 3) | ((defense_iv & 1) << 2) | ((speed_iv & 1) << 1)
            | (special_iv & 1);

        PartyMon {
            species_id: self.core.read_byte(base),
            nickname,
            level: self.core.read_byte(base + 0x21),
            current_hp: self.read_u16_le(base + 0x01),
            status: self.core.read_byte(base + 0x04),
            types: [self.core.read_byte(base + 0x05), self.core.read_byte(base + 0x06)],
            moves: [
                self.core.read_byte(base + 0x08),
                self.core.read_byte(base + 0x09),
                self.core.read_byte(base + 0x0A),
                self.core.read_byte(base + 0x0B),
            ],
            pp: [
                self.core.read_byte(base + 0x1D),
                self.core.read_byte(base + 0x1E),
                self.core.read_byte(base + 0x1F),
                self.core.read_byte(base + 0x20),
            ],
            trainer_id: self.read_u16_le(base + 0x0C),
            exp: self.read_u24_le(base + 0x0E),
            evs: StatSet {
                hp: self.read_u16_le(base + 0x11),
                attack: self.read_u16_le(base + 0x13),
                defense: self.read_u16_le(base + 0x15),
                speed: self.read_u16_le(base + 0x17),
                special: self.read_u16_le(base + 0x19),
            },
            ivs: StatSet {
                hp: hp_iv,
                attack: attack_iv,
                defense: defense_iv,
                speed: speed_iv,
                special: special_iv,
            },
            stats: MonStats {
                max_hp: self.read_u16_le(base + 0x22),
                attack: self.read_u16_le(base + 0x24),
                defense: self.read_u16_le(base + 0x26),
                speed: self.read_u16_le(base + 0x28),
                special: self.read_u16_le(base + 0x2A),
            },
        }
    }

    fn text_field(&self, addr: u16, len: usize) -> String {
        let bytes: Vec<u8> = (0..len)
            .map(|i| self.core.read_byte(addr + i as u16))
            .collect();
        text::decode(&bytes)
    }

    fn read_u16_le(&self, addr: u16) -> u16 {
        let lo = self.core.read_byte(addr) as u16;
        let hi = self.core.read_byte(addr + 1) as u16;
        (hi << 8) | lo
    }

    fn read_u24_le(&self, addr: u16) -> u32 {
        let b0 = self.core.read_byte(addr) as u32;
        let b1 = self.core.read_byte(addr + 1) as u32;
        let b2 = self.core.read_byte(addr + 2) as u32;
        (b2 << 16) | (b1 << 8) | b0
    }
}

fn bcd_pair(b: u8) -> u32 {
    ((b >> 4) as u32) * 10 + (b & 0x0F) as u32
}
