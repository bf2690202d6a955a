//! Format versioning constants for save records.
//!
//! The record layout has grown over time; readers accept the whole readable
//! range and default-fill fields that postdate the stored version, while
//! versions newer than [`SAVE_FORMAT_VERSION`] are rejected outright.

use crate::format::Tag;

/// Current binary format version for save records.
/// Increment when the record layout changes.
pub const SAVE_FORMAT_VERSION: u32 = 3;

/// Oldest record version the reader still accepts.
pub const OLDEST_READABLE_VERSION: u32 = 1;

/// First version that carries a thumbnail flag (and optional block).
pub const VERSION_WITH_THUMBNAIL: u32 = 2;

/// First version that records accumulated play time.
pub const VERSION_WITH_PLAY_TIME: u32 = 3;

/// Terminator tag closing the section stream of a record.
pub const FOOTER_TAG: Tag = Tag(*b"ENDS");

/// Magic bytes opening an embedded thumbnail block.
pub const THUMBNAIL_MAGIC: [u8; 4] = *b"THMB";

/// Slot number reserved for automatic/restart saves.
pub const AUTOSAVE_SLOT: u32 = 0;

/// Upper bound for the length-prefixed record description, in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 127;

/// Leading bytes of a gzip-compressed stream.
pub(crate) const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
