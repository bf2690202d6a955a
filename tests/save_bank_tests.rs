use std::fs;

use savefile_core::{
    DirBackend, FormatSpec, SaveBank, SaveDate, SaveError, SaveHeader, SaveTime, SlotNaming, Tag,
    Thumbnail, AUTOSAVE_SLOT,
};

const STATE: Tag = Tag(*b"STAT");
const INVENTORY: Tag = Tag(*b"INVT");

fn bank(dir: &tempfile::TempDir, compress: bool) -> SaveBank {
    let mut spec = FormatSpec::new(*b"AVAF");
    spec.compress = compress;
    SaveBank::new(Box::new(DirBackend::new(dir.path(), compress)), spec)
}

fn header(description: &str) -> SaveHeader {
    SaveHeader {
        description: description.to_string(),
        date: SaveDate {
            year: 1998,
            month: 4,
            day: 17,
        },
        time: SaveTime {
            hour: 13,
            minute: 37,
        },
        play_time_ms: 90_000,
        thumbnail: None,
    }
}

fn write_slot(bank: &SaveBank, slot: u32, description: &str) {
    bank.save_game("indy", slot, &header(description), |sections| {
        sections.begin_section(STATE);
        sections.write_u32(slot * 100);
        sections.write_string(description)?;
        sections.end_section()?;
        sections.begin_section(INVENTORY);
        sections.write_u8(3);
        sections.write_bytes(&[10, 20, 30]);
        sections.end_section()?;
        Ok(())
    })
    .expect("save should succeed");
}

#[test]
fn record_roundtrip_through_the_bank() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, true);
    write_slot(&bank, 1, "grail diary");

    let mut game = bank.load_game("indy", 1).expect("load should succeed");
    assert_eq!(game.header.description, "grail diary");
    assert_eq!(game.header.play_time_ms, 90_000);

    // Request the later section first: the framer skips what it does not
    // need, the earlier section stays reachable on a fresh load.
    let size = game
        .sections
        .begin_section(INVENTORY)
        .expect("inventory section");
    assert_eq!(size, 4);
    assert_eq!(game.sections.read_u8().expect("count"), 3);
    assert_eq!(game.sections.read_bytes(3).expect("items"), vec![10, 20, 30]);
    game.sections.end_section();
    game.finish().expect("checksum should verify");

    let mut game = bank.load_game("indy", 1).expect("reload");
    game.sections.begin_section(STATE).expect("state section");
    assert_eq!(game.sections.read_u32().expect("value"), 100);
    assert_eq!(game.sections.read_string().expect("label"), "grail diary");
    game.sections.end_section();
    game.finish().expect("checksum");
}

#[test]
fn thumbnails_survive_metadata_queries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, true);

    let mut with_thumb = header("at the docks");
    with_thumb.thumbnail =
        Some(Thumbnail::new(2, 1, vec![0xf800, 0x07e0]).expect("thumbnail"));
    bank.save_game("indy", 2, &with_thumb, |sections| {
        sections.begin_section(STATE);
        sections.write_u8(0);
        sections.end_section()?;
        Ok(())
    })
    .expect("save");

    // Listing skips the thumbnail...
    let listing = bank.list_saves("indy").expect("list");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].description, "at the docks");
    assert!(listing[0].thumbnail.is_none());

    // ...the single-slot query decodes it.
    let info = bank
        .query_save_meta("indy", 2)
        .expect("query")
        .expect("slot should exist");
    let thumbnail = info.thumbnail.expect("thumbnail should decode");
    assert_eq!(thumbnail.width(), 2);
    assert_eq!(thumbnail.pixels(), &[0xf800, 0x07e0]);

    assert!(bank
        .query_save_meta("indy", 9)
        .expect("query of empty slot")
        .is_none());
}

#[test]
fn listing_is_sorted_and_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, true);
    write_slot(&bank, 3, "three");
    write_slot(&bank, 1, "one");
    write_slot(&bank, 2, "two");

    let first = bank.list_saves("indy").expect("list");
    let slots: Vec<u32> = first.iter().map(|info| info.slot).collect();
    assert_eq!(slots, vec![1, 2, 3]);

    let second = bank.list_saves("indy").expect("second list");
    assert_eq!(first, second);
}

#[test]
fn corrupt_saves_are_dropped_from_listings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, false);
    write_slot(&bank, 1, "good");

    // Garbage where a save should be, and a foreign-engine save.
    fs::write(dir.path().join("indy.002"), [7u8, 7, 7]).expect("garbage");
    let mut foreign = Vec::new();
    foreign.extend_from_slice(b"SCVM");
    foreign.extend_from_slice(&1u32.to_le_bytes());
    foreign.extend_from_slice(&[0u8; 16]);
    fs::write(dir.path().join("indy.003"), foreign).expect("foreign");

    let listing = bank.list_saves("indy").expect("list");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].slot, 1);
}

#[test]
fn corrupt_gzip_entry_is_dropped_from_listing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, true);
    write_slot(&bank, 1, "good");

    // Garbage that sniffs as gzip but fails to decompress.
    let mut blob = vec![0x1f, 0x8b];
    blob.extend_from_slice(&[7u8; 16]);
    fs::write(dir.path().join("indy.002"), blob).expect("garbage");

    let listing = bank.list_saves("indy").expect("listing must not fail");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].slot, 1);

    assert!(bank
        .query_save_meta("indy", 2)
        .expect("query must not fail")
        .is_none());
}

#[test]
fn future_version_is_rejected_on_load_and_dropped_from_listing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, false);
    write_slot(&bank, 1, "from the future");

    let path = dir.path().join("indy.001");
    let mut bytes = fs::read(&path).expect("read");
    bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
    fs::write(&path, bytes).expect("write");

    match bank.load_game("indy", 1) {
        Err(SaveError::UnsupportedVersion { found: 99, .. }) => {}
        Err(other) => panic!("expected UnsupportedVersion, got {other:?}"),
        Ok(_) => panic!("expected UnsupportedVersion, got a loaded game"),
    }
    assert!(bank.list_saves("indy").expect("list").is_empty());
}

#[test]
fn tampered_body_fails_the_full_load_but_still_lists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, false);
    bank.save_game("indy", 1, &header(""), |sections| {
        sections.begin_section(STATE);
        sections.write_u64(0x1122_3344_5566_7788);
        sections.end_section()?;
        Ok(())
    })
    .expect("save");

    let path = dir.path().join("indy.001");
    let mut bytes = fs::read(&path).expect("read");
    // Header is 20 bytes here (empty description, no thumbnail); flip a
    // byte inside the section payload.
    bytes[30] ^= 0xff;
    fs::write(&path, bytes).expect("write");

    let listing = bank.list_saves("indy").expect("list");
    assert_eq!(listing.len(), 1, "header-only listing is unaffected");

    let mut game = bank.load_game("indy", 1).expect("header still loads");
    game.sections.begin_section(STATE).expect("section opens");
    game.sections.end_section();
    assert!(matches!(
        game.finish(),
        Err(SaveError::ChecksumMismatch { .. })
    ));
}

#[test]
fn deletion_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, true);
    write_slot(&bank, 1, "one");
    write_slot(&bank, 4, "four");

    assert!(bank.delete_slot("indy", 4).expect("delete"));
    let slots: Vec<u32> = bank
        .list_saves("indy")
        .expect("list")
        .iter()
        .map(|info| info.slot)
        .collect();
    assert_eq!(slots, vec![1]);

    assert!(!bank.delete_slot("indy", 4).expect("second delete"));
}

#[test]
fn rename_moves_a_record_between_slots() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, true);
    write_slot(&bank, 1, "movable");

    assert!(bank.rename_slot("indy", 1, 5).expect("rename"));
    let listing = bank.list_saves("indy").expect("list");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].slot, 5);
    assert_eq!(listing[0].description, "movable");
}

#[test]
fn reserved_slot_protection_and_autosave() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut spec = FormatSpec::new(*b"AVAF");
    spec.protect_reserved_slot = true;
    let mut bank = SaveBank::new(Box::new(DirBackend::new(dir.path(), true)), spec);

    let result = bank.save_game("indy", AUTOSAVE_SLOT, &header("manual"), |_| Ok(()));
    assert!(matches!(result, Err(SaveError::SlotProtected { slot: 0 })));

    bank.request_autosave();
    assert!(bank.autosave_pending());
    bank.autosave("indy", &header("autosave"), |sections| {
        sections.begin_section(STATE);
        sections.write_u8(1);
        sections.end_section()?;
        Ok(())
    })
    .expect("autosave bypasses protection");
    assert!(!bank.autosave_pending());

    let listing = bank.list_saves("indy").expect("list");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].slot, AUTOSAVE_SLOT);
    assert_eq!(listing[0].description, "autosave");
}

#[test]
fn out_of_range_slots_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, true);

    assert!(matches!(
        bank.save_game("indy", 100, &header("too far"), |_| Ok(())),
        Err(SaveError::SlotOutOfRange { slot: 100, max: 99 })
    ));
    assert!(matches!(
        bank.load_game("indy", 100),
        Err(SaveError::SlotOutOfRange { .. })
    ));
}

#[test]
fn missing_slot_fails_with_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, true);
    assert!(matches!(
        bank.load_game("indy", 1),
        Err(SaveError::NotFound { .. })
    ));
}

#[test]
fn listing_renders_to_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bank = bank(&dir, true);
    write_slot(&bank, 1, "jungle temple");

    let json = bank.list_saves_json("indy").expect("json");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(parsed[0]["slot"], 1);
    assert_eq!(parsed[0]["description"], "jungle temple");
    assert_eq!(parsed[0]["date"]["year"], 1998);
}
