use miette::Diagnostic;
use thiserror::Error;

pub type SaveResult<T> = Result<T, SaveError>;

#[derive(Debug, Error, Diagnostic)]
pub enum SaveError {
    #[error("save file not found: {name}")]
    #[diagnostic(code("save.not_found"))]
    NotFound { name: String },
    #[error("bad save signature: expected {expected:?}, found {found:?}")]
    #[diagnostic(code("save.bad_signature"))]
    BadSignature { expected: [u8; 4], found: [u8; 4] },
    #[error("unsupported save format version {found} (readable range {oldest}..={newest})")]
    #[diagnostic(code("save.unsupported_version"))]
    UnsupportedVersion { found: u32, oldest: u32, newest: u32 },
    #[error("save record truncated while reading {context}")]
    #[diagnostic(code("save.truncated"))]
    TruncatedRecord { context: &'static str },
    #[error("section '{tag}' not found before record footer")]
    #[diagnostic(code("save.section_not_found"))]
    SectionNotFound { tag: String },
    #[error("read of {requested} bytes overruns section payload ({remaining} left)")]
    #[diagnostic(code("save.section_overrun"))]
    SectionOverrun { requested: usize, remaining: usize },
    #[error("save record checksum mismatch: expected {expected:08x}, found {found:08x}")]
    #[diagnostic(code("save.checksum_mismatch"))]
    ChecksumMismatch { expected: u32, found: u32 },
    #[error("corrupt save record: {0}")]
    #[diagnostic(code("save.corrupt_record"))]
    CorruptRecord(String),
    #[error("corrupt thumbnail block: {0}")]
    #[diagnostic(code("save.corrupt_thumbnail"))]
    CorruptThumbnail(String),
    #[error("slot {slot} is outside the valid range 0..={max}")]
    #[diagnostic(code("save.slot_out_of_range"))]
    SlotOutOfRange { slot: u32, max: u32 },
    #[error("slot {slot} is reserved for automatic saves")]
    #[diagnostic(code("save.slot_protected"))]
    SlotProtected { slot: u32 },
    #[error("serialization error: {0}")]
    #[diagnostic(code("save.serialization"))]
    Serialization(String),
    #[error("io error: {0}")]
    #[diagnostic(code("save.io"))]
    Io(#[from] std::io::Error),
}

impl SaveError {
    /// Whether a listing may simply drop the affected entry instead of
    /// surfacing the failure to the caller.
    pub fn is_listing_skippable(&self) -> bool {
        match self {
            SaveError::NotFound { .. }
            | SaveError::BadSignature { .. }
            | SaveError::UnsupportedVersion { .. }
            | SaveError::TruncatedRecord { .. }
            | SaveError::CorruptRecord(_)
            | SaveError::CorruptThumbnail(_)
            | SaveError::ChecksumMismatch { .. } => true,
            SaveError::SectionNotFound { .. }
            | SaveError::SectionOverrun { .. }
            | SaveError::SlotOutOfRange { .. }
            | SaveError::SlotProtected { .. }
            | SaveError::Serialization(_)
            | SaveError::Io(_) => false,
        }
    }
}
