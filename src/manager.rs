//! `SaveBank`: the engine-facing facade tying backend, catalog, codec and
//! framer together. One bank per game configuration; all operations are
//! synchronous and expected to be serialized on the engine's main loop.

use std::io::Read;

use crate::backend::{SaveBackend, SaveSink};
use crate::error::{SaveError, SaveResult};
use crate::format::FormatSpec;
use crate::meta::{self, SaveInfo};
use crate::record::{self, SaveHeader};
use crate::section::{SectionReader, SectionWriter};
use crate::slots::SaveCatalog;
use crate::version::AUTOSAVE_SLOT;

/// A fully opened save: validated header plus the section stream behind it.
pub struct LoadedGame {
    pub header: SaveHeader,
    pub sections: SectionReader<Box<dyn Read>>,
}

impl LoadedGame {
    /// Drains any remaining sections and verifies the record checksum.
    pub fn finish(self) -> SaveResult<()> {
        self.sections.finish()
    }
}

pub struct SaveBank {
    backend: Box<dyn SaveBackend>,
    spec: FormatSpec,
    autosave_requested: bool,
}

impl SaveBank {
    pub fn new(backend: Box<dyn SaveBackend>, spec: FormatSpec) -> Self {
        SaveBank {
            backend,
            spec,
            autosave_requested: false,
        }
    }

    pub fn spec(&self) -> &FormatSpec {
        &self.spec
    }

    fn catalog(&self) -> SaveCatalog<'_> {
        SaveCatalog::new(self.backend.as_ref(), &self.spec.naming, self.spec.max_slot)
    }

    /// Writes a complete record to a slot: header, sections built by the
    /// caller, footer and checksum, committed atomically at the end.
    ///
    /// Slot 0 is reserved for automatic saves and rejected here when the
    /// format protects it; use [`SaveBank::autosave`] for that slot.
    pub fn save_game<F>(
        &self,
        target: &str,
        slot: u32,
        header: &SaveHeader,
        build: F,
    ) -> SaveResult<()>
    where
        F: FnOnce(&mut SectionWriter<SaveSink>) -> SaveResult<()>,
    {
        self.catalog().check_slot(slot)?;
        if slot == AUTOSAVE_SLOT && self.spec.protect_reserved_slot {
            return Err(SaveError::SlotProtected { slot });
        }
        self.write_record(target, slot, header, build)?;
        log::info!("saved '{target}' slot {slot}");
        Ok(())
    }

    /// Opens a slot and validates its header; the caller then pulls the
    /// sections it knows and calls [`LoadedGame::finish`].
    pub fn load_game(&self, target: &str, slot: u32) -> SaveResult<LoadedGame> {
        self.catalog().check_slot(slot)?;
        let name = self.spec.naming.blob_name(target, slot);
        let mut reader = self.backend.open_for_loading(&name)?;
        let header = record::read_header(&mut reader, &self.spec, true)?;
        Ok(LoadedGame {
            header,
            sections: SectionReader::new(reader, self.spec.endian),
        })
    }

    pub fn list_saves(&self, target: &str) -> SaveResult<Vec<SaveInfo>> {
        meta::list_saves(self.backend.as_ref(), &self.spec, target)
    }

    /// JSON rendering of [`SaveBank::list_saves`] for UI frontends.
    pub fn list_saves_json(&self, target: &str) -> SaveResult<String> {
        let saves = self.list_saves(target)?;
        serde_json::to_string(&saves).map_err(|err| SaveError::Serialization(err.to_string()))
    }

    pub fn query_save_meta(&self, target: &str, slot: u32) -> SaveResult<Option<SaveInfo>> {
        meta::query_save_meta(self.backend.as_ref(), &self.spec, target, slot)
    }

    pub fn delete_slot(&self, target: &str, slot: u32) -> SaveResult<bool> {
        let removed = self.catalog().delete_slot(target, slot)?;
        if removed {
            log::info!("deleted '{target}' slot {slot}");
        }
        Ok(removed)
    }

    pub fn rename_slot(&self, target: &str, from: u32, to: u32) -> SaveResult<bool> {
        self.catalog().rename_slot(target, from, to)
    }

    /// Flags that the next [`SaveBank::autosave`] poll should write. The
    /// surrounding engine polls this from its update tick.
    pub fn request_autosave(&mut self) {
        self.autosave_requested = true;
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave_requested
    }

    /// Writes the reserved auto-save slot, bypassing slot protection, and
    /// clears the pending flag.
    pub fn autosave<F>(&mut self, target: &str, header: &SaveHeader, build: F) -> SaveResult<()>
    where
        F: FnOnce(&mut SectionWriter<SaveSink>) -> SaveResult<()>,
    {
        self.write_record(target, AUTOSAVE_SLOT, header, build)?;
        self.autosave_requested = false;
        log::debug!("autosaved '{target}'");
        Ok(())
    }

    fn write_record<F>(
        &self,
        target: &str,
        slot: u32,
        header: &SaveHeader,
        build: F,
    ) -> SaveResult<()>
    where
        F: FnOnce(&mut SectionWriter<SaveSink>) -> SaveResult<()>,
    {
        let name = self.spec.naming.blob_name(target, slot);
        let mut sink = self.backend.open_for_saving(&name)?;
        record::write_header(&mut sink, &self.spec, header)?;
        let mut sections = SectionWriter::new(sink, self.spec.endian);
        build(&mut sections)?;
        let sink = sections.finish()?;
        sink.commit()
    }
}
