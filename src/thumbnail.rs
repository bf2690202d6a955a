//! Embedded thumbnail codec.
//!
//! A thumbnail is a nested, self-describing blob inside the record header:
//! `[b"THMB"][size u32][width u16][height u16][bpp u8][pixel data]`, with
//! `size` covering everything after the size field. The record codec only
//! relies on that length when skipping; the pixel layout (RGB565) is opaque
//! to it.

use std::io::{Read, Write};

use crate::error::{SaveError, SaveResult};
use crate::format::Endian;
use crate::section::read_exact_or_truncated;
use crate::version::THUMBNAIL_MAGIC;

const THUMBNAIL_BPP: u8 = 2;
const MAX_THUMBNAIL_SIZE: u32 = 8 << 20;

/// Small RGB565 raster embedded in a save header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thumbnail {
    width: u16,
    height: u16,
    pixels: Vec<u16>,
}

impl Thumbnail {
    /// Builds a thumbnail from row-major RGB565 pixels.
    pub fn new(width: u16, height: u16, pixels: Vec<u16>) -> SaveResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(SaveError::CorruptThumbnail(format!(
                "{}x{} thumbnail needs {expected} pixels, got {}",
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Thumbnail {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub(crate) fn write<W: Write>(&self, sink: &mut W, endian: Endian) -> SaveResult<()> {
        let payload_len = 2 + 2 + 1 + self.pixels.len() * 2;
        sink.write_all(&THUMBNAIL_MAGIC)?;
        sink.write_all(&endian.bytes_u32(payload_len as u32))?;
        sink.write_all(&endian.bytes_u16(self.width))?;
        sink.write_all(&endian.bytes_u16(self.height))?;
        sink.write_all(&[THUMBNAIL_BPP])?;
        for pixel in &self.pixels {
            sink.write_all(&endian.bytes_u16(*pixel))?;
        }
        Ok(())
    }

    pub(crate) fn read<R: Read>(reader: &mut R, endian: Endian) -> SaveResult<Self> {
        let size = read_block_size(reader, endian)?;
        if size < 5 {
            return Err(SaveError::CorruptThumbnail(format!(
                "block of {size} bytes is too small for the dimensions"
            )));
        }
        let mut fixed = [0u8; 5];
        read_exact_or_truncated(reader, &mut fixed, "thumbnail dimensions")?;
        let width = endian.u16_from([fixed[0], fixed[1]]);
        let height = endian.u16_from([fixed[2], fixed[3]]);
        let bpp = fixed[4];
        if bpp != THUMBNAIL_BPP {
            return Err(SaveError::CorruptThumbnail(format!(
                "unsupported pixel depth {bpp}"
            )));
        }
        let pixel_count = width as usize * height as usize;
        if size as usize != 5 + pixel_count * 2 {
            return Err(SaveError::CorruptThumbnail(format!(
                "block size {size} does not match {width}x{height} dimensions"
            )));
        }
        let mut raw = vec![0u8; pixel_count * 2];
        read_exact_or_truncated(reader, &mut raw, "thumbnail pixels")?;
        let pixels = raw
            .chunks_exact(2)
            .map(|pair| endian.u16_from([pair[0], pair[1]]))
            .collect();
        Ok(Thumbnail {
            width,
            height,
            pixels,
        })
    }

    /// Skips a thumbnail block without decoding the pixels.
    pub(crate) fn skip<R: Read>(reader: &mut R, endian: Endian) -> SaveResult<()> {
        let size = read_block_size(reader, endian)?;
        let mut remaining = size as u64;
        let mut chunk = [0u8; 4096];
        while remaining > 0 {
            let want = remaining.min(chunk.len() as u64) as usize;
            read_exact_or_truncated(reader, &mut chunk[..want], "skipped thumbnail")?;
            remaining -= want as u64;
        }
        Ok(())
    }
}

fn read_block_size<R: Read>(reader: &mut R, endian: Endian) -> SaveResult<u32> {
    let mut magic = [0u8; 4];
    read_exact_or_truncated(reader, &mut magic, "thumbnail magic")?;
    if magic != THUMBNAIL_MAGIC {
        return Err(SaveError::CorruptThumbnail(format!(
            "bad block magic {magic:02x?}"
        )));
    }
    let mut size = [0u8; 4];
    read_exact_or_truncated(reader, &mut size, "thumbnail size")?;
    let size = endian.u32_from(size);
    if size > MAX_THUMBNAIL_SIZE {
        return Err(SaveError::CorruptThumbnail(format!(
            "implausible block size {size}"
        )));
    }
    Ok(size)
}

#[cfg(test)]
#[path = "tests/thumbnail_tests.rs"]
mod tests;
