//! Section framer: self-describing `[tag][size][payload]` chunks between the
//! record header and the footer tag, so readers can skip sections they do
//! not recognize.
//!
//! Only one section may be open at a time. Opening a section while another
//! is open, closing while idle, or touching fields outside a section is a
//! contract violation by the calling engine code and panics; I/O and framing
//! problems are reported as [`SaveError`] values.

use std::io::{self, Read, Write};

use crate::error::{SaveError, SaveResult};
use crate::format::{Endian, Tag};
use crate::version::FOOTER_TAG;

/// Sanity bound on a single section payload.
const MAX_SECTION_SIZE: u32 = 64 << 20;

/// Frames sections into an underlying sink.
///
/// Field writes accumulate into a growable buffer; [`end_section`] frames
/// and flushes the buffer in one piece, so the declared size always matches
/// the payload. [`finish`] appends the footer tag and a crc32 of every
/// framed byte.
///
/// [`end_section`]: SectionWriter::end_section
/// [`finish`]: SectionWriter::finish
pub struct SectionWriter<W: Write> {
    sink: W,
    endian: Endian,
    open: Option<Tag>,
    buffer: Vec<u8>,
    crc: crc32fast::Hasher,
}

impl<W: Write> SectionWriter<W> {
    pub fn new(sink: W, endian: Endian) -> Self {
        SectionWriter {
            sink,
            endian,
            open: None,
            buffer: Vec::new(),
            crc: crc32fast::Hasher::new(),
        }
    }

    pub fn begin_section(&mut self, tag: Tag) {
        if let Some(open) = self.open {
            panic!("begin_section('{tag}') while section '{open}' is still open");
        }
        if tag == FOOTER_TAG {
            panic!("'{tag}' is the reserved footer tag");
        }
        self.buffer.clear();
        self.open = Some(tag);
    }

    pub fn end_section(&mut self) -> SaveResult<()> {
        let tag = match self.open.take() {
            Some(tag) => tag,
            None => panic!("end_section without a matching begin_section"),
        };
        if self.buffer.len() as u64 > MAX_SECTION_SIZE as u64 {
            return Err(SaveError::CorruptRecord(format!(
                "section '{tag}' payload of {} bytes exceeds the framing limit",
                self.buffer.len()
            )));
        }
        let frame_size = self.buffer.len() as u32;
        self.emit(&tag.bytes())?;
        self.emit(&self.endian.bytes_u32(frame_size))?;
        let payload = std::mem::take(&mut self.buffer);
        self.emit(&payload)?;
        self.buffer = payload;
        self.buffer.clear();
        Ok(())
    }

    /// Writes the footer tag and the body checksum, returning the sink.
    pub fn finish(mut self) -> SaveResult<W> {
        if let Some(open) = self.open {
            panic!("finish with section '{open}' still open");
        }
        self.emit(&FOOTER_TAG.bytes())?;
        self.emit(&self.endian.bytes_u32(0))?;
        let checksum = self.crc.clone().finalize();
        self.sink.write_all(&self.endian.bytes_u32(checksum))?;
        Ok(self.sink)
    }

    fn emit(&mut self, bytes: &[u8]) -> SaveResult<()> {
        self.crc.update(bytes);
        self.sink.write_all(bytes)?;
        Ok(())
    }

    fn field_buffer(&mut self) -> &mut Vec<u8> {
        if self.open.is_none() {
            panic!("field write outside of a section");
        }
        &mut self.buffer
    }

    pub fn write_u8(&mut self, value: u8) {
        self.field_buffer().push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        let bytes = self.endian.bytes_u16(value);
        self.field_buffer().extend_from_slice(&bytes);
    }

    pub fn write_u32(&mut self, value: u32) {
        let bytes = self.endian.bytes_u32(value);
        self.field_buffer().extend_from_slice(&bytes);
    }

    pub fn write_u64(&mut self, value: u64) {
        let bytes = self.endian.bytes_u64(value);
        self.field_buffer().extend_from_slice(&bytes);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.field_buffer().extend_from_slice(bytes);
    }

    /// Length-prefixed (u16) UTF-8 string. Strings longer than the prefix
    /// can express are rejected before anything reaches the buffer.
    pub fn write_string(&mut self, value: &str) -> SaveResult<()> {
        let bytes = value.as_bytes();
        if bytes.len() > u16::MAX as usize {
            return Err(SaveError::Serialization(format!(
                "string field of {} bytes exceeds the u16 length prefix",
                bytes.len()
            )));
        }
        self.write_u16(bytes.len() as u16);
        self.field_buffer().extend_from_slice(bytes);
        Ok(())
    }
}

struct OpenSection {
    tag: Tag,
    payload: Vec<u8>,
    cursor: usize,
}

/// Scans sections out of an underlying stream.
///
/// [`begin_section`] walks the frame headers forward, skipping sections with
/// unrequested tags by their declared size; the matching payload is buffered
/// and consumed by the field readers, which bounds-check every access.
///
/// [`begin_section`]: SectionReader::begin_section
pub struct SectionReader<R: Read> {
    reader: R,
    endian: Endian,
    open: Option<OpenSection>,
    crc: crc32fast::Hasher,
    footer_seen: bool,
}

impl<R: Read> SectionReader<R> {
    pub fn new(reader: R, endian: Endian) -> Self {
        SectionReader {
            reader,
            endian,
            open: None,
            crc: crc32fast::Hasher::new(),
            footer_seen: false,
        }
    }

    /// Scans forward for `tag`, returning its payload size.
    ///
    /// Sections with other tags are skipped without interpreting their
    /// payload. Reaching the footer first yields
    /// [`SaveError::SectionNotFound`].
    pub fn begin_section(&mut self, tag: Tag) -> SaveResult<u32> {
        if let Some(open) = &self.open {
            panic!(
                "begin_section('{tag}') while section '{}' is still open",
                open.tag
            );
        }
        if self.footer_seen {
            return Err(SaveError::SectionNotFound {
                tag: tag.to_string(),
            });
        }
        loop {
            let found = self.read_frame_tag()?;
            let size = self.read_frame_u32()?;
            if found == FOOTER_TAG {
                if size != 0 {
                    return Err(SaveError::CorruptRecord(format!(
                        "footer tag declares a payload of {size} bytes"
                    )));
                }
                self.footer_seen = true;
                return Err(SaveError::SectionNotFound {
                    tag: tag.to_string(),
                });
            }
            if size > MAX_SECTION_SIZE {
                return Err(SaveError::CorruptRecord(format!(
                    "section '{found}' declares an implausible size of {size} bytes"
                )));
            }
            if found == tag {
                let mut payload = vec![0u8; size as usize];
                self.fill(&mut payload, "section payload")?;
                self.open = Some(OpenSection {
                    tag,
                    payload,
                    cursor: 0,
                });
                return Ok(size);
            }
            self.skip(size as u64)?;
        }
    }

    /// Closes the open section. Trailing unread payload bytes are permitted
    /// so that older readers keep working when a section grows.
    pub fn end_section(&mut self) {
        let open = match self.open.take() {
            Some(open) => open,
            None => panic!("end_section without a matching begin_section"),
        };
        let remaining = open.payload.len() - open.cursor;
        if remaining > 0 {
            log::debug!(
                "section '{}' closed with {remaining} unread payload bytes",
                open.tag
            );
        }
    }

    /// Consumes any remaining sections through the footer and verifies the
    /// body checksum.
    pub fn finish(mut self) -> SaveResult<()> {
        if self.open.take().is_some() {
            panic!("finish with a section still open");
        }
        while !self.footer_seen {
            let tag = self.read_frame_tag()?;
            let size = self.read_frame_u32()?;
            if tag == FOOTER_TAG {
                if size != 0 {
                    return Err(SaveError::CorruptRecord(format!(
                        "footer tag declares a payload of {size} bytes"
                    )));
                }
                self.footer_seen = true;
                break;
            }
            if size > MAX_SECTION_SIZE {
                return Err(SaveError::CorruptRecord(format!(
                    "section '{tag}' declares an implausible size of {size} bytes"
                )));
            }
            self.skip(size as u64)?;
        }
        let expected = self.crc.finalize();
        let mut stored = [0u8; 4];
        read_exact_or_truncated(&mut self.reader, &mut stored, "record checksum")?;
        let found = self.endian.u32_from(stored);
        if found != expected {
            return Err(SaveError::ChecksumMismatch { expected, found });
        }
        Ok(())
    }

    fn read_frame_tag(&mut self) -> SaveResult<Tag> {
        let mut bytes = [0u8; 4];
        self.fill(&mut bytes, "section tag")?;
        Ok(Tag(bytes))
    }

    fn read_frame_u32(&mut self) -> SaveResult<u32> {
        let mut bytes = [0u8; 4];
        self.fill(&mut bytes, "section size")?;
        Ok(self.endian.u32_from(bytes))
    }

    fn fill(&mut self, buf: &mut [u8], context: &'static str) -> SaveResult<()> {
        read_exact_or_truncated(&mut self.reader, buf, context)?;
        self.crc.update(buf);
        Ok(())
    }

    fn skip(&mut self, mut remaining: u64) -> SaveResult<()> {
        let mut chunk = [0u8; 4096];
        while remaining > 0 {
            let want = remaining.min(chunk.len() as u64) as usize;
            self.fill(&mut chunk[..want], "skipped section payload")?;
            remaining -= want as u64;
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> SaveResult<&[u8]> {
        let open = match self.open.as_mut() {
            Some(open) => open,
            None => panic!("field read outside of a section"),
        };
        let remaining = open.payload.len() - open.cursor;
        if len > remaining {
            return Err(SaveError::SectionOverrun {
                requested: len,
                remaining,
            });
        }
        let start = open.cursor;
        open.cursor += len;
        Ok(&open.payload[start..open.cursor])
    }

    pub fn read_u8(&mut self) -> SaveResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> SaveResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> SaveResult<u16> {
        let endian = self.endian;
        let bytes = self.take(2)?;
        Ok(endian.u16_from([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> SaveResult<u32> {
        let endian = self.endian;
        let bytes = self.take(4)?;
        Ok(endian.u32_from([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(&mut self) -> SaveResult<u64> {
        let endian = self.endian;
        let bytes = self.take(8)?;
        let mut fixed = [0u8; 8];
        fixed.copy_from_slice(bytes);
        Ok(endian.u64_from(fixed))
    }

    pub fn read_i32(&mut self) -> SaveResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_bytes(&mut self, len: usize) -> SaveResult<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }

    /// Length-prefixed (u16) UTF-8 string.
    pub fn read_string(&mut self) -> SaveResult<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| SaveError::CorruptRecord("string field is not valid UTF-8".into()))
    }
}

pub(crate) fn read_exact_or_truncated<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    context: &'static str,
) -> SaveResult<()> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => SaveError::TruncatedRecord { context },
        // Decompression reports corrupt input through these kinds; that is
        // record corruption, not an environment failure.
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => {
            SaveError::CorruptRecord(format!("{context}: {err}"))
        }
        _ => SaveError::Io(err),
    })
}

#[cfg(test)]
#[path = "tests/section_tests.rs"]
mod tests;
