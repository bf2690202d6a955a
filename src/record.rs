//! Save record codec: writes the versioned record header and validates it
//! on the way back in, cheaply when only the descriptive metadata is wanted.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{SaveError, SaveResult};
use crate::format::FormatSpec;
use crate::section::read_exact_or_truncated;
use crate::thumbnail::Thumbnail;
use crate::version::{
    MAX_DESCRIPTION_LEN, OLDEST_READABLE_VERSION, SAVE_FORMAT_VERSION, VERSION_WITH_PLAY_TIME,
    VERSION_WITH_THUMBNAIL,
};

/// Calendar date stored in a record header, packed as
/// `(day << 24) | (month << 16) | year` on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl SaveDate {
    pub(crate) fn pack(self) -> u32 {
        (self.day as u32) << 24 | (self.month as u32) << 16 | self.year as u32
    }

    pub(crate) fn unpack(packed: u32) -> Self {
        SaveDate {
            year: (packed & 0xffff) as u16,
            month: ((packed >> 16) & 0xff) as u8,
            day: ((packed >> 24) & 0xff) as u8,
        }
    }
}

/// Wall-clock time stored in a record header, packed as
/// `(hour << 8) | minute` on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveTime {
    pub hour: u8,
    pub minute: u8,
}

impl SaveTime {
    pub(crate) fn pack(self) -> u16 {
        (self.hour as u16) << 8 | self.minute as u16
    }

    pub(crate) fn unpack(packed: u16) -> Self {
        SaveTime {
            hour: (packed >> 8) as u8,
            minute: (packed & 0xff) as u8,
        }
    }
}

/// Descriptive header preceding the section stream of a record.
///
/// Captured once when the record is written and read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SaveHeader {
    /// User-supplied label, truncated to [`MAX_DESCRIPTION_LEN`] bytes.
    pub description: String,
    pub date: SaveDate,
    pub time: SaveTime,
    /// Accumulated play time in milliseconds; 0 when unknown (pre-v3 saves).
    pub play_time_ms: u32,
    pub thumbnail: Option<Thumbnail>,
}

/// Writes the record header: signature, version, length-prefixed
/// description, optional thumbnail block, then the fixed metadata tail.
pub fn write_header<W: Write>(
    sink: &mut W,
    spec: &FormatSpec,
    header: &SaveHeader,
) -> SaveResult<()> {
    let endian = spec.endian;
    let description = truncate_description(&header.description);

    sink.write_all(&spec.magic)?;
    sink.write_all(&endian.bytes_u32(SAVE_FORMAT_VERSION))?;
    sink.write_all(&[description.len() as u8])?;
    sink.write_all(description.as_bytes())?;
    match &header.thumbnail {
        Some(thumbnail) => {
            sink.write_all(&[1])?;
            thumbnail.write(sink, endian)?;
        }
        None => sink.write_all(&[0])?,
    }
    sink.write_all(&endian.bytes_u32(header.date.pack()))?;
    sink.write_all(&endian.bytes_u16(header.time.pack()))?;
    sink.write_all(&endian.bytes_u32(header.play_time_ms))?;
    Ok(())
}

/// Reads and validates a record header.
///
/// With `want_thumbnail` unset, a present thumbnail block is skipped by its
/// self-describing length instead of decoded, keeping metadata-only queries
/// cheap. Versions newer than [`SAVE_FORMAT_VERSION`] are rejected; older
/// readable versions are accepted with a warning and default-filled fields.
pub fn read_header<R: Read>(
    reader: &mut R,
    spec: &FormatSpec,
    want_thumbnail: bool,
) -> SaveResult<SaveHeader> {
    let endian = spec.endian;

    let mut magic = [0u8; 4];
    read_exact_or_truncated(reader, &mut magic, "record magic")?;
    if magic != spec.magic {
        return Err(SaveError::BadSignature {
            expected: spec.magic,
            found: magic,
        });
    }

    let version = read_u32(reader, spec, "record version")?;
    if !(OLDEST_READABLE_VERSION..=SAVE_FORMAT_VERSION).contains(&version) {
        return Err(SaveError::UnsupportedVersion {
            found: version,
            oldest: OLDEST_READABLE_VERSION,
            newest: SAVE_FORMAT_VERSION,
        });
    }
    if version < SAVE_FORMAT_VERSION {
        log::warn!(
            "save record version {version} predates current {SAVE_FORMAT_VERSION}; \
             missing fields default"
        );
    }

    let mut desc_len = [0u8; 1];
    read_exact_or_truncated(reader, &mut desc_len, "description length")?;
    let mut description = vec![0u8; desc_len[0] as usize];
    read_exact_or_truncated(reader, &mut description, "description")?;
    // Legacy descriptions predate UTF-8; decode them leniently.
    let description = String::from_utf8_lossy(&description).into_owned();

    let thumbnail = if version >= VERSION_WITH_THUMBNAIL {
        let mut flag = [0u8; 1];
        read_exact_or_truncated(reader, &mut flag, "thumbnail flag")?;
        if flag[0] != 0 {
            if want_thumbnail {
                Some(Thumbnail::read(reader, endian)?)
            } else {
                Thumbnail::skip(reader, endian)?;
                None
            }
        } else {
            None
        }
    } else {
        None
    };

    let date = SaveDate::unpack(read_u32(reader, spec, "record date")?);
    let mut time = [0u8; 2];
    read_exact_or_truncated(reader, &mut time, "record time")?;
    let time = SaveTime::unpack(endian.u16_from(time));

    let play_time_ms = if version >= VERSION_WITH_PLAY_TIME {
        read_u32(reader, spec, "play time")?
    } else {
        0
    };

    Ok(SaveHeader {
        description,
        date,
        time,
        play_time_ms,
        thumbnail,
    })
}

fn read_u32<R: Read>(reader: &mut R, spec: &FormatSpec, context: &'static str) -> SaveResult<u32> {
    let mut bytes = [0u8; 4];
    read_exact_or_truncated(reader, &mut bytes, context)?;
    Ok(spec.endian.u32_from(bytes))
}

fn truncate_description(description: &str) -> &str {
    if description.len() <= MAX_DESCRIPTION_LEN {
        return description;
    }
    let mut end = MAX_DESCRIPTION_LEN;
    while !description.is_char_boundary(end) {
        end -= 1;
    }
    &description[..end]
}

#[cfg(test)]
#[path = "tests/record_tests.rs"]
mod tests;
