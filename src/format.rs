//! Wire-format primitives and per-engine format configuration.

use std::fmt;

use crate::slots::SlotNaming;

/// Byte order for every multi-byte field of a save record.
///
/// Legacy formats are split between the two conventions, so the order is
/// carried in the [`FormatSpec`] rather than assumed globally. Signature
/// tags are raw byte sequences and are never swapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    pub fn bytes_u16(self, value: u16) -> [u8; 2] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    pub fn bytes_u32(self, value: u32) -> [u8; 4] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    pub fn bytes_u64(self, value: u64) -> [u8; 8] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    pub fn u16_from(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endian::Big => u16::from_be_bytes(bytes),
            Endian::Little => u16::from_le_bytes(bytes),
        }
    }

    pub fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endian::Big => u32::from_be_bytes(bytes),
            Endian::Little => u32::from_le_bytes(bytes),
        }
    }

    pub fn u64_from(self, bytes: [u8; 8]) -> u64 {
        match self {
            Endian::Big => u64::from_be_bytes(bytes),
            Endian::Little => u64::from_le_bytes(bytes),
        }
    }
}

/// Four-byte section or signature tag, conventionally printable ASCII.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Tag(bytes)
    }

    pub const fn bytes(self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|byte| byte.is_ascii_graphic()) {
            for byte in self.0 {
                write!(f, "{}", byte as char)?;
            }
            Ok(())
        } else {
            write!(
                f,
                "{:02x}{:02x}{:02x}{:02x}",
                self.0[0], self.0[1], self.0[2], self.0[3]
            )
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

/// Per-engine save format configuration.
///
/// Everything here is configuration, not computation: the signature tag, the
/// byte order, the blob naming pattern and the slot policy vary between the
/// supported games, while the record layout itself is shared.
#[derive(Clone, Debug)]
pub struct FormatSpec {
    /// Signature tag expected at the start of every record.
    pub magic: [u8; 4],
    /// Byte order of all multi-byte fields.
    pub endian: Endian,
    /// Blob naming pattern for the slot catalog.
    pub naming: SlotNaming,
    /// Highest addressable slot number.
    pub max_slot: u32,
    /// Compress newly written blobs. Reading sniffs the stream either way.
    pub compress: bool,
    /// Reject explicit saves to the reserved auto-save slot.
    pub protect_reserved_slot: bool,
}

impl FormatSpec {
    pub fn new(magic: [u8; 4]) -> Self {
        FormatSpec {
            magic,
            endian: Endian::Little,
            naming: SlotNaming::default(),
            max_slot: 99,
            compress: true,
            protect_reserved_slot: false,
        }
    }
}
