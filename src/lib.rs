mod backend;
mod error;
mod format;
mod manager;
mod meta;
mod record;
mod section;
mod slots;
mod thumbnail;
mod version;

pub use backend::{DirBackend, SaveBackend, SaveSink};
pub use error::{SaveError, SaveResult};
pub use format::{Endian, FormatSpec, Tag};
pub use manager::{LoadedGame, SaveBank};
pub use meta::SaveInfo;
pub use record::{read_header, write_header, SaveDate, SaveHeader, SaveTime};
pub use section::{SectionReader, SectionWriter};
pub use slots::{SaveCatalog, SlotNaming};
pub use thumbnail::Thumbnail;
pub use version::{
    AUTOSAVE_SLOT, FOOTER_TAG, MAX_DESCRIPTION_LEN, OLDEST_READABLE_VERSION, SAVE_FORMAT_VERSION,
};
