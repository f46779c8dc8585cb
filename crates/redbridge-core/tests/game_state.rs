use redbridge_core::core::{EmulatorCore, FlatCore};
use redbridge_core::game::{
    self, GameReader, BADGES_ADDR, MAP_ID_ADDR, MONEY_ADDR, NICKNAME_LENGTH, PARTY_COUNT_ADDR,
    PARTY_DATA_ADDR, PARTY_NICKNAMES_ADDR, PARTY_SPECIES_LIST_ADDR, PLAYER_NAME_ADDR,
    PLAYER_X_ADDR, PLAYER_Y_ADDR, POKEDEX_OWNED_ADDR, POKEDEX_SEEN_ADDR, RIVAL_NAME_ADDR,
    TIME_PLAYED_ADDR,
};

fn write_le(core: &mut FlatCore, addr: u16, value: u32, num_bytes: u16) {
    for i in 0..num_bytes {
        core.write_byte(addr + i, ((value >> (8 * i)) & 0xFF) as u8);
    }
}

fn write_text(core: &mut FlatCore, addr: u16, bytes: &[u8], slot: usize) {
    for (i, &b) in bytes.iter().enumerate().take(slot) {
        core.write_byte(addr + i as u16, b);
    }
    for i in bytes.len()..slot {
        core.write_byte(addr + i as u16, 0x00);
    }
}

#[test]
fn memory_value_reads_single_byte() {
    let mut core = FlatCore::new();
    core.write_byte(0xC100, 0xAB);
    assert_eq!(GameReader::new(&core).memory_value(0xC100), 0xAB);
}

#[test]
fn player_coords() {
    let mut core = FlatCore::new();
    core.write_byte(PLAYER_X_ADDR, 10);
    core.write_byte(PLAYER_Y_ADDR, 20);
    let reader = GameReader::new(&core);
    assert_eq!(reader.player_x(), 10);
    assert_eq!(reader.player_y(), 20);
    assert_eq!(reader.player_coords(), (10, 20));
}

#[test]
fn current_map_id() {
    let mut core = FlatCore::new();
    core.write_byte(MAP_ID_ADDR, 12);
    assert_eq!(GameReader::new(&core).current_map_id(), 12);
}

#[test]
fn party_count() {
    let mut core = FlatCore::new();
    core.write_byte(PARTY_COUNT_ADDR, 3);
    assert_eq!(GameReader::new(&core).party_count(), 3);
}

#[test]
fn money_decodes_bcd() {
    let mut core = FlatCore::new();

    core.write_byte(MONEY_ADDR, 0x12);
    core.write_byte(MONEY_ADDR + 1, 0x34);
    core.write_byte(MONEY_ADDR + 2, 0x56);
    assert_eq!(GameReader::new(&core).player_money(), 123_456);

    for i in 0..3 {
        core.write_byte(MONEY_ADDR + i, 0x00);
    }
    assert_eq!(GameReader::new(&core).player_money(), 0);

    for i in 0..3 {
        core.write_byte(MONEY_ADDR + i, 0x99);
    }
    assert_eq!(GameReader::new(&core).player_money(), 999_999);
}

#[test]
fn rival_name_decodes() {
    let mut core = FlatCore::new();

    // B, L, U, E, terminator
    write_text(&mut core, RIVAL_NAME_ADDR, &[0x81, 0x8B, 0x94, 0x84, 0x50], 7);
    assert_eq!(GameReader::new(&core).rival_name(), "BLUE");

    // Shorter name overwrites a longer one cleanly.
    write_text(&mut core, RIVAL_NAME_ADDR, &[0x91, 0x84, 0x83, 0x50], 7);
    assert_eq!(GameReader::new(&core).rival_name(), "RED");

    // Seven characters fill the field; the terminator never lands in it.
    write_text(
        &mut core,
        RIVAL_NAME_ADDR,
        &[0x86, 0x8E, 0x8B, 0x83, 0x81, 0x8B, 0x94],
        7,
    );
    assert_eq!(GameReader::new(&core).rival_name(), "GOLDBLU");
}

#[test]
fn player_name_decodes() {
    let mut core = FlatCore::new();

    write_text(&mut core, PLAYER_NAME_ADDR, &[0x80, 0x92, 0x87, 0x50], 7);
    assert_eq!(GameReader::new(&core).player_name(), "ASH");

    write_text(
        &mut core,
        PLAYER_NAME_ADDR,
        &[0x93, 0x91, 0x80, 0x88, 0x8D, 0x84, 0x91],
        7,
    );
    assert_eq!(GameReader::new(&core).player_name(), "TRAINER");
}

#[test]
fn badges_bitfield() {
    let mut core = FlatCore::new();

    core.write_byte(BADGES_ADDR, 0b0000_0000);
    assert_eq!(GameReader::new(&core).badges(), 0);

    core.write_byte(BADGES_ADDR, 0b0000_0001);
    assert_eq!(GameReader::new(&core).badges(), 1);

    core.write_byte(BADGES_ADDR, 0b0000_0011);
    assert_eq!(GameReader::new(&core).badges(), 3);

    core.write_byte(BADGES_ADDR, 0b1111_1111);
    assert_eq!(GameReader::new(&core).badges(), 255);
}

#[test]
fn pokedex_owned_count_little_endian() {
    let mut core = FlatCore::new();
    let cases: [(u8, u8, u16); 6] = [
        (0, 0, 0),
        (10, 0, 10),
        (255, 0, 255),
        (0, 1, 256),
        (0x2C, 0x01, 300),
        (255, 255, 65535),
    ];
    for (lsb, msb, expected) in cases {
        core.write_byte(POKEDEX_OWNED_ADDR, lsb);
        core.write_byte(POKEDEX_OWNED_ADDR + 1, msb);
        assert_eq!(GameReader::new(&core).pokedex_owned_count(), expected);
    }
}

#[test]
fn pokedex_seen_count_little_endian() {
    let mut core = FlatCore::new();
    let cases: [(u8, u8, u16); 6] = [
        (0, 0, 0),
        (15, 0, 15),
        (255, 0, 255),
        (0, 1, 256),
        (0x90, 0x01, 400),
        (255, 255, 65535),
    ];
    for (lsb, msb, expected) in cases {
        core.write_byte(POKEDEX_SEEN_ADDR, lsb);
        core.write_byte(POKEDEX_SEEN_ADDR + 1, msb);
        assert_eq!(GameReader::new(&core).pokedex_seen_count(), expected);
    }
}

#[test]
fn time_played_bcd() {
    let mut core = FlatCore::new();
    let cases: [([u8; 4], (u8, u8, u8, u8)); 4] = [
        ([0x00, 0x00, 0x00, 0x00], (0, 0, 0, 0)),
        ([0x01, 0x23, 0x45, 0x59], (1, 23, 45, 59)),
        ([0x99, 0x59, 0x59, 0x01], (99, 59, 59, 1)),
        ([0x10, 0x05, 0x08, 0x30], (10, 5, 8, 30)),
    ];
    for (bytes, (h, m, s, f)) in cases {
        for (i, b) in bytes.iter().enumerate() {
            core.write_byte(TIME_PLAYED_ADDR + i as u16, *b);
        }
        let t = GameReader::new(&core).time_played();
        assert_eq!((t.hours, t.minutes, t.seconds, t.frames), (h, m, s, f));
    }
}

#[test]
fn party_species_list() {
    let mut core = FlatCore::new();
    let bulbasaur = 0x99;
    let charmander = 0xB3;
    let squirtle = 0xB1;
    let terminator = 0xFF;

    core.write_byte(PARTY_COUNT_ADDR, 0);
    core.write_byte(PARTY_SPECIES_LIST_ADDR, terminator);
    assert!(GameReader::new(&core).party_species().is_empty());

    core.write_byte(PARTY_COUNT_ADDR, 1);
    core.write_byte(PARTY_SPECIES_LIST_ADDR, bulbasaur);
    core.write_byte(PARTY_SPECIES_LIST_ADDR + 1, terminator);
    assert_eq!(GameReader::new(&core).party_species(), vec![bulbasaur]);

    core.write_byte(PARTY_COUNT_ADDR, 3);
    core.write_byte(PARTY_SPECIES_LIST_ADDR + 1, charmander);
    core.write_byte(PARTY_SPECIES_LIST_ADDR + 2, squirtle);
    core.write_byte(PARTY_SPECIES_LIST_ADDR + 3, terminator);
    assert_eq!(
        GameReader::new(&core).party_species(),
        vec![bulbasaur, charmander, squirtle]
    );

    let full = [0x99, 0xB3, 0xB1, 0x96, 0xA5, 0x54];
    core.write_byte(PARTY_COUNT_ADDR, 6);
    for (i, species) in full.iter().enumerate() {
        core.write_byte(PARTY_SPECIES_LIST_ADDR + i as u16, *species);
    }
    core.write_byte(PARTY_SPECIES_LIST_ADDR + 6, terminator);
    assert_eq!(GameReader::new(&core).party_species(), full.to_vec());
}

#[test]
fn party_nicknames() {
    let mut core = FlatCore::new();
    core.write_byte(PARTY_COUNT_ADDR, 1);
    core.write_byte(PARTY_SPECIES_LIST_ADDR, 0x01);

    // BULBASAUR + terminator in the first 11-byte slot.
    write_text(
        &mut core,
        PARTY_NICKNAMES_ADDR,
        &[0x81, 0x94, 0x8B, 0x81, 0x80, 0x92, 0x80, 0x94, 0x91, 0x50],
        NICKNAME_LENGTH,
    );

    let nicknames = GameReader::new(&core).party_nicknames();
    assert_eq!(nicknames.len(), 1);
    assert_eq!(nicknames[0], "BULBASAUR");
}

#[test]
fn party_mon_record_decodes() {
    let mut core = FlatCore::new();

    core.write_byte(PARTY_COUNT_ADDR, 0);
    assert!(GameReader::new(&core).party_mons().is_empty());

    core.write_byte(PARTY_COUNT_ADDR, 1);
    let base = PARTY_DATA_ADDR;

    let species = 0x99;
    core.write_byte(base, species);
    write_le(&mut core, base + 0x01, 20, 2); // current hp
    core.write_byte(base + 0x04, 0); // status
    core.write_byte(base + 0x05, 22); // grass
    core.write_byte(base + 0x06, 3); // poison
    core.write_byte(base + 0x08, 33); // tackle
    core.write_byte(base + 0x09, 45); // growl
    core.write_byte(base + 0x0A, 0);
    core.write_byte(base + 0x0B, 0);
    write_le(&mut core, base + 0x0C, 12345, 2); // trainer id
    write_le(&mut core, base + 0x0E, 125, 3); // exp
    write_le(&mut core, base + 0x11, 1000, 2); // hp ev
    write_le(&mut core, base + 0x13, 1100, 2);
    write_le(&mut core, base + 0x15, 1200, 2);
    write_le(&mut core, base + 0x17, 1300, 2);
    write_le(&mut core, base + 0x19, 1400, 2);
    core.write_byte(base + 0x1B, 0xAB); // attack/defense IVs
    core.write_byte(base + 0x1C, 0xCD); // speed/special IVs
    core.write_byte(base + 0x1D, 35);
    core.write_byte(base + 0x1E, 40);
    core.write_byte(base + 0x1F, 0);
    core.write_byte(base + 0x20, 0);
    core.write_byte(base + 0x21, 5); // level
    write_le(&mut core, base + 0x22, 20, 2); // max hp
    write_le(&mut core, base + 0x24, 12, 2);
    write_le(&mut core, base + 0x26, 13, 2);
    write_le(&mut core, base + 0x28, 11, 2);
    write_le(&mut core, base + 0x2A, 14, 2);

    let party = GameReader::new(&core).party_mons();
    assert_eq!(party.len(), 1);
    let mon = &party[0];

    assert_eq!(mon.species_id, species);
    assert_eq!(mon.current_hp, 20);
    assert_eq!(mon.level, 5);
    assert_eq!(mon.status, 0);
    assert_eq!(mon.types, [22, 3]);
    assert_eq!(mon.moves, [33, 45, 0, 0]);
    assert_eq!(mon.pp, [35, 40, 0, 0]);
    assert_eq!(mon.trainer_id, 12345);
    assert_eq!(mon.exp, 125);
    assert_eq!(
        (mon.evs.hp, mon.evs.attack, mon.evs.defense, mon.evs.speed, mon.evs.special),
        (1000, 1100, 1200, 1300, 1400)
    );
    // 0xAB/0xCD unpack to attack 10, defense 11, speed 12, special 13;
    // the HP IV collects the four low bits.
    assert_eq!(
        (mon.ivs.hp, mon.ivs.attack, mon.ivs.defense, mon.ivs.speed, mon.ivs.special),
        (5, 10, 11, 12, 13)
    );
    assert_eq!(
        (
            mon.stats.max_hp,
            mon.stats.attack,
            mon.stats.defense,
            mon.stats.speed,
            mon.stats.special
        ),
        (20, 12, 13, 11, 14)
    );
}

#[test]
fn snapshot_collects_everything() {
    let mut core = FlatCore::new();
    core.write_byte(PLAYER_X_ADDR, 4);
    core.write_byte(PLAYER_Y_ADDR, 9);
    core.write_byte(MAP_ID_ADDR, 1);
    core.write_byte(MONEY_ADDR + 2, 0x50);
    core.write_byte(BADGES_ADDR, 0b101);
    write_text(&mut core, PLAYER_NAME_ADDR, &[0x91, 0x84, 0x83, 0x50], 7);
    core.write_byte(PARTY_COUNT_ADDR, 1);
    core.write_byte(PARTY_SPECIES_LIST_ADDR, 0x99);
    core.write_byte(PARTY_SPECIES_LIST_ADDR + 1, 0xFF);

    let snap = GameReader::new(&core).snapshot();
    assert_eq!((snap.x, snap.y), (4, 9));
    assert_eq!(snap.map_id, 1);
    assert_eq!(snap.money, 50);
    assert_eq!(snap.badges, 0b101);
    assert_eq!(snap.player_name, "RED");
    assert_eq!(snap.party.len(), 1);
    assert_eq!(snap.party[0].species_id, 0x99);

    // Snapshots travel over the wire; the JSON form must round-trip.
    let json = serde_json::to_string(&snap).unwrap();
    let back: game::GameSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
}
