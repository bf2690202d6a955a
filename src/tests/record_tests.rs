use super::*;
use crate::format::{Endian, FormatSpec};

use std::io::Cursor;

fn spec() -> FormatSpec {
    FormatSpec::new(*b"AVAF")
}

fn sample_header() -> SaveHeader {
    SaveHeader {
        description: "test".to_string(),
        date: SaveDate {
            year: 1997,
            month: 11,
            day: 3,
        },
        time: SaveTime {
            hour: 21,
            minute: 15,
        },
        play_time_ms: 123_456,
        thumbnail: None,
    }
}

fn encode(spec: &FormatSpec, header: &SaveHeader) -> Vec<u8> {
    let mut bytes = Vec::new();
    write_header(&mut bytes, spec, header).expect("header should encode");
    bytes
}

#[test]
fn header_roundtrip() {
    let spec = spec();
    let header = sample_header();
    let bytes = encode(&spec, &header);

    let decoded =
        read_header(&mut Cursor::new(bytes), &spec, true).expect("header should decode");
    assert_eq!(decoded, header);
    assert_eq!(decoded.description, "test");
}

#[test]
fn wrong_magic_is_rejected() {
    let spec = spec();
    let bytes = encode(&spec, &sample_header());

    let mut foreign = spec.clone();
    foreign.magic = *b"SCVM";
    match read_header(&mut Cursor::new(bytes), &foreign, true) {
        Err(SaveError::BadSignature { expected, found }) => {
            assert_eq!(expected, *b"SCVM");
            assert_eq!(found, *b"AVAF");
        }
        other => panic!("expected BadSignature, got {other:?}"),
    }
}

#[test]
fn future_version_is_rejected() {
    let spec = spec();
    let mut bytes = encode(&spec, &sample_header());
    bytes[4..8].copy_from_slice(&99u32.to_le_bytes());

    match read_header(&mut Cursor::new(bytes), &spec, true) {
        Err(SaveError::UnsupportedVersion { found, newest, .. }) => {
            assert_eq!(found, 99);
            assert_eq!(newest, SAVE_FORMAT_VERSION);
        }
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
}

#[test]
fn version_zero_is_rejected() {
    let spec = spec();
    let mut bytes = encode(&spec, &sample_header());
    bytes[4..8].copy_from_slice(&0u32.to_le_bytes());

    assert!(matches!(
        read_header(&mut Cursor::new(bytes), &spec, true),
        Err(SaveError::UnsupportedVersion { found: 0, .. })
    ));
}

#[test]
fn older_version_fills_defaults() {
    let spec = spec();
    // Hand-built v1 record header: no thumbnail flag, no play time.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&spec.magic);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.push(3);
    bytes.extend_from_slice(b"old");
    let date = SaveDate {
        year: 1995,
        month: 6,
        day: 20,
    };
    bytes.extend_from_slice(&date.pack().to_le_bytes());
    bytes.extend_from_slice(&SaveTime { hour: 9, minute: 5 }.pack().to_le_bytes());

    let decoded =
        read_header(&mut Cursor::new(bytes), &spec, true).expect("old header should decode");
    assert_eq!(decoded.description, "old");
    assert_eq!(decoded.date, date);
    assert_eq!(decoded.play_time_ms, 0);
    assert!(decoded.thumbnail.is_none());
}

#[test]
fn thumbnail_is_skipped_for_metadata_queries() {
    let spec = spec();
    let mut header = sample_header();
    header.thumbnail = Some(
        Thumbnail::new(2, 2, vec![0x1111, 0x2222, 0x3333, 0x4444]).expect("thumbnail"),
    );
    let bytes = encode(&spec, &header);

    let skipped = read_header(&mut Cursor::new(bytes.clone()), &spec, false)
        .expect("skipping decode should succeed");
    assert!(skipped.thumbnail.is_none());
    // The fields after the skipped block must still line up.
    assert_eq!(skipped.date, header.date);
    assert_eq!(skipped.time, header.time);
    assert_eq!(skipped.play_time_ms, header.play_time_ms);

    let full = read_header(&mut Cursor::new(bytes), &spec, true).expect("full decode");
    assert_eq!(full.thumbnail, header.thumbnail);
}

#[test]
fn big_endian_layout() {
    let mut spec = spec();
    spec.endian = Endian::Big;
    let bytes = encode(&spec, &sample_header());
    assert_eq!(&bytes[0..4], b"AVAF");
    assert_eq!(&bytes[4..8], &SAVE_FORMAT_VERSION.to_be_bytes());

    let decoded =
        read_header(&mut Cursor::new(bytes), &spec, true).expect("big-endian decode");
    assert_eq!(decoded.description, "test");
}

#[test]
fn long_description_is_truncated_on_char_boundary() {
    let spec = spec();
    let mut header = sample_header();
    header.description = "é".repeat(100);
    let bytes = encode(&spec, &header);

    let decoded = read_header(&mut Cursor::new(bytes), &spec, true).expect("decode");
    assert!(decoded.description.len() <= MAX_DESCRIPTION_LEN);
    assert_eq!(decoded.description, "é".repeat(63));
}

#[test]
fn empty_description_is_legal() {
    let spec = spec();
    let mut header = sample_header();
    header.description.clear();
    let bytes = encode(&spec, &header);

    let decoded = read_header(&mut Cursor::new(bytes), &spec, true).expect("decode");
    assert_eq!(decoded.description, "");
}

#[test]
fn truncated_header_is_reported() {
    let spec = spec();
    let mut bytes = encode(&spec, &sample_header());
    bytes.truncate(6);

    assert!(matches!(
        read_header(&mut Cursor::new(bytes), &spec, true),
        Err(SaveError::TruncatedRecord { .. })
    ));
}

#[test]
fn date_and_time_packing() {
    let date = SaveDate {
        year: 2004,
        month: 2,
        day: 29,
    };
    assert_eq!(SaveDate::unpack(date.pack()), date);
    assert_eq!(date.pack(), (29 << 24) | (2 << 16) | 2004);

    let time = SaveTime {
        hour: 23,
        minute: 59,
    };
    assert_eq!(SaveTime::unpack(time.pack()), time);
    assert_eq!(time.pack(), (23 << 8) | 59);
}
