//! Storage backend: named persistent byte streams with transparent
//! compression and atomic replacement on commit.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{SaveError, SaveResult};
use crate::version::GZIP_MAGIC;

/// Raw blob storage consumed by the catalog and the record codec.
///
/// Implementations are injected explicitly; there is no global singleton.
/// Every open is a fresh backend call, nothing is cached in memory.
pub trait SaveBackend {
    /// Opens a blob for reading. Gzip-compressed blobs are detected by their
    /// leading signature and decompressed transparently.
    fn open_for_loading(&self, name: &str) -> SaveResult<Box<dyn Read>>;

    /// Opens a blob for writing. Bytes land in a temporary sibling until
    /// [`SaveSink::commit`] renames it onto `name`; an uncommitted sink
    /// leaves the previous blob untouched.
    fn open_for_saving(&self, name: &str) -> SaveResult<SaveSink>;

    /// Removes a blob. Returns `false`, not an error, when it does not exist.
    fn remove(&self, name: &str) -> SaveResult<bool>;

    /// Renames a blob. Returns `false` when the source does not exist.
    fn rename(&self, old: &str, new: &str) -> SaveResult<bool>;

    /// Lists blob names matching a glob pattern (`*` and `?`), in
    /// unspecified order.
    fn list(&self, pattern: &str) -> SaveResult<Vec<String>>;
}

enum SinkInner {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

/// Write half of a blob, staged in a temporary file.
///
/// Dropping the sink without calling [`SaveSink::commit`] discards the
/// staged bytes and removes the temporary file.
pub struct SaveSink {
    inner: Option<SinkInner>,
    tmp_path: PathBuf,
    final_path: PathBuf,
}

impl SaveSink {
    /// Flushes, finishes compression, syncs and renames onto the final blob
    /// name. The previous blob survives every failure before the rename.
    pub fn commit(mut self) -> SaveResult<()> {
        match self.try_commit() {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&self.tmp_path);
                Err(SaveError::Io(err))
            }
        }
    }

    fn try_commit(&mut self) -> io::Result<()> {
        let inner = match self.inner.take() {
            Some(inner) => inner,
            None => return Ok(()),
        };
        let file = match inner {
            SinkInner::Plain(writer) => writer.into_inner().map_err(|err| err.into_error())?,
            SinkInner::Gzip(encoder) => encoder
                .finish()?
                .into_inner()
                .map_err(|err| err.into_error())?,
        };
        file.sync_all()?;
        fs::rename(&self.tmp_path, &self.final_path)
    }
}

impl Write for SaveSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            Some(SinkInner::Plain(writer)) => writer.write(buf),
            Some(SinkInner::Gzip(encoder)) => encoder.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "write after sink was committed",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(SinkInner::Plain(writer)) => writer.flush(),
            Some(SinkInner::Gzip(encoder)) => encoder.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for SaveSink {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Filesystem-backed [`SaveBackend`] rooted at a directory.
#[derive(Debug)]
pub struct DirBackend {
    root: PathBuf,
    compress: bool,
}

impl DirBackend {
    pub fn new(root: impl Into<PathBuf>, compress: bool) -> Self {
        DirBackend {
            root: root.into(),
            compress,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SaveBackend for DirBackend {
    fn open_for_loading(&self, name: &str) -> SaveResult<Box<dyn Read>> {
        let path = self.root.join(name);
        let file = File::open(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                SaveError::NotFound {
                    name: name.to_string(),
                }
            } else {
                SaveError::Io(err)
            }
        })?;
        wrap_compressed(BufReader::new(file))
    }

    fn open_for_saving(&self, name: &str) -> SaveResult<SaveSink> {
        fs::create_dir_all(&self.root)?;
        let final_path = self.root.join(name);
        let tmp_path = staging_path(&final_path);
        let writer = BufWriter::new(File::create(&tmp_path)?);
        let inner = if self.compress {
            SinkInner::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            SinkInner::Plain(writer)
        };
        Ok(SaveSink {
            inner: Some(inner),
            tmp_path,
            final_path,
        })
    }

    fn remove(&self, name: &str) -> SaveResult<bool> {
        match fs::remove_file(self.root.join(name)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(SaveError::Io(err)),
        }
    }

    fn rename(&self, old: &str, new: &str) -> SaveResult<bool> {
        match fs::rename(self.root.join(old), self.root.join(new)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(SaveError::Io(err)),
        }
    }

    fn list(&self, pattern: &str) -> SaveResult<Vec<String>> {
        let mut names = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(names),
            Err(err) => return Err(SaveError::Io(err)),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.ends_with(STAGING_SUFFIX) {
                continue;
            }
            if glob_match(pattern, name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

const STAGING_SUFFIX: &str = ".tmp";

fn staging_path(path: &Path) -> PathBuf {
    let mut output = path.as_os_str().to_os_string();
    output.push(STAGING_SUFFIX);
    PathBuf::from(output)
}

/// Sniffs the gzip signature on the first two bytes of `reader` and wraps a
/// decompressor when present; plain streams pass through unchanged.
pub(crate) fn wrap_compressed<R: Read + 'static>(mut reader: R) -> SaveResult<Box<dyn Read>> {
    let mut lead = [0u8; 2];
    let mut filled = 0;
    while filled < lead.len() {
        let read = reader.read(&mut lead[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    let head = io::Cursor::new(lead[..filled].to_vec());
    let chained = head.chain(reader);
    if filled == lead.len() && lead == GZIP_MAGIC {
        Ok(Box::new(GzDecoder::new(chained)))
    } else {
        Ok(Box::new(chained))
    }
}

/// Glob matcher supporting `*` (any run) and `?` (any single byte).
fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern = pattern.as_bytes();
    let name = name.as_bytes();
    let mut p = 0;
    let mut n = 0;
    let mut star: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
